//! Database-backed document and aggregate stores

use caselink_citations::{
    AggregateStore, CitedTarget, Document, DocumentId, DocumentStore, TargetLookup,
};
use caselink_common::db::models::Opinion;
use caselink_common::db::CitedOpinion;
use caselink_common::errors::Result;
use caselink_common::queue::{IndexJobMessage, IndexKind, Queue};
use caselink_common::Repository;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Destination of search index requests
#[async_trait]
pub trait IndexSink: Send + Sync {
    async fn publish(&self, message: &IndexJobMessage) -> Result<()>;
}

#[async_trait]
impl IndexSink for Queue {
    async fn publish(&self, message: &IndexJobMessage) -> Result<()> {
        self.send(message).await.map(|_| ())
    }
}

/// Stores backed by the opinions database.
///
/// Index requests go to the index sink when one is configured. They follow a
/// committed write, so a failed publish is logged and dropped.
pub struct RepositoryStore {
    repository: Repository,
    index_sink: Option<Arc<dyn IndexSink>>,
}

impl RepositoryStore {
    pub fn new(repository: Repository, index_sink: Option<Arc<dyn IndexSink>>) -> Self {
        Self {
            repository,
            index_sink,
        }
    }

    async fn request_index(&self, kind: IndexKind, id: i64) {
        let Some(sink) = &self.index_sink else {
            debug!(?kind, id, "No index queue configured, skipping index request");
            return;
        };

        let message = IndexJobMessage {
            kind,
            ids: vec![id],
        };
        if let Err(e) = sink.publish(&message).await {
            warn!(?kind, id, error = %e, "Failed to request reindex");
        }
    }
}

#[async_trait]
impl DocumentStore for RepositoryStore {
    async fn load_documents(&self, ids: &[DocumentId]) -> Result<Vec<Document>> {
        let opinions = self.repository.find_opinions(ids).await?;
        Ok(opinions.into_iter().map(to_document).collect())
    }

    async fn lookup_target(&self, id: DocumentId) -> Result<TargetLookup> {
        let records = self.repository.find_cited_opinions(id).await?;
        Ok(TargetLookup::from_records(records.into_iter().map(to_target).collect()))
    }

    async fn cited_ids(&self, citing: DocumentId) -> Result<BTreeSet<DocumentId>> {
        let ids = self.repository.cited_opinion_ids(citing).await?;
        Ok(ids.into_iter().collect())
    }

    async fn replace_cited(&self, citing: DocumentId, cited: &BTreeSet<DocumentId>) -> Result<()> {
        let cited: Vec<DocumentId> = cited.iter().copied().collect();
        self.repository.replace_opinions_cited(citing, &cited).await
    }

    async fn save_document(&self, document: &Document, index: bool) -> Result<()> {
        if let Some(html) = &document.html_with_citations {
            if !self
                .repository
                .update_html_with_citations(document.id, html)
                .await?
            {
                warn!(document_id = document.id, "Opinion vanished before save");
                return Ok(());
            }
        }

        if index {
            self.request_index(IndexKind::Opinion, document.id).await;
        }
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for RepositoryStore {
    async fn increment_citation_count(&self, target: &CitedTarget, index: bool) -> Result<()> {
        if !self
            .repository
            .increment_citation_count(target.cluster_id)
            .await?
        {
            warn!(cluster_id = target.cluster_id, "Cited cluster not found");
            return Ok(());
        }

        if index {
            self.request_index(IndexKind::Cluster, target.cluster_id).await;
        }
        Ok(())
    }
}

fn to_document(opinion: Opinion) -> Document {
    Document {
        id: opinion.id,
        cluster_id: opinion.cluster_id,
        html_columbia: opinion.html_columbia,
        html_lawbox: opinion.html_lawbox,
        html: opinion.html,
        plain_text: non_empty(opinion.plain_text),
        html_with_citations: non_empty(opinion.html_with_citations),
    }
}

fn to_target(record: CitedOpinion) -> CitedTarget {
    CitedTarget {
        id: record.opinion_id,
        cluster_id: record.cluster_id,
        url: record.absolute_url,
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
