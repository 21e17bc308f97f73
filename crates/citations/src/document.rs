//! Citing documents and the stores the linker reads from and writes to

use async_trait::async_trait;
use caselink_common::Result;
use std::collections::BTreeSet;

/// Opinion primary key
pub type DocumentId = i64;

/// Cluster (aggregate record) primary key
pub type ClusterId = i64;

/// Markup of a document's source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Html,
    Plain,
}

impl TextFormat {
    pub fn is_html(&self) -> bool {
        matches!(self, TextFormat::Html)
    }
}

/// The authoritative text of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceText<'a> {
    pub body: &'a str,
    pub format: TextFormat,
}

/// A citing opinion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub cluster_id: ClusterId,
    pub html_columbia: Option<String>,
    pub html_lawbox: Option<String>,
    pub html: Option<String>,
    pub plain_text: Option<String>,
    /// Rendered text with inline citation markup
    pub html_with_citations: Option<String>,
}

impl Document {
    /// First non-empty text in priority order: Columbia HTML, Lawbox HTML,
    /// original HTML, plain text.
    pub fn source_text(&self) -> Option<SourceText<'_>> {
        [&self.html_columbia, &self.html_lawbox, &self.html]
            .into_iter()
            .find_map(present)
            .map(|body| SourceText {
                body,
                format: TextFormat::Html,
            })
            .or_else(|| {
                present(&self.plain_text).map(|body| SourceText {
                    body,
                    format: TextFormat::Plain,
                })
            })
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|text| !text.is_empty())
}

/// A resolved citation target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitedTarget {
    pub id: DocumentId,
    pub cluster_id: ClusterId,
    /// Canonical URL used in the inline citation link
    pub url: String,
}

/// Result of looking up a matched document by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLookup {
    Found(CitedTarget),
    Missing,
    /// More than one record carries the id
    Ambiguous(usize),
}

impl TargetLookup {
    pub fn from_records(mut records: Vec<CitedTarget>) -> Self {
        match records.len() {
            0 => TargetLookup::Missing,
            1 => TargetLookup::Found(records.remove(0)),
            n => TargetLookup::Ambiguous(n),
        }
    }
}

/// Access to citing documents and their outgoing citation edges
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents for the given ids; unknown ids are left out
    async fn load_documents(&self, ids: &[DocumentId]) -> Result<Vec<Document>>;

    /// Look up a matched document
    async fn lookup_target(&self, id: DocumentId) -> Result<TargetLookup>;

    /// Ids currently cited by `citing`
    async fn cited_ids(&self, citing: DocumentId) -> Result<BTreeSet<DocumentId>>;

    /// Replace the whole outgoing edge set of `citing` atomically
    async fn replace_cited(&self, citing: DocumentId, cited: &BTreeSet<DocumentId>) -> Result<()>;

    /// Persist the document's rendered text. `index` requests immediate
    /// propagation to the search index.
    async fn save_document(&self, document: &Document, index: bool) -> Result<()>;
}

/// Aggregate citation counters of cited targets
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Atomically add one to the target's citation count
    async fn increment_citation_count(&self, target: &CitedTarget, index: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columbia_html_wins() {
        let document = Document {
            html_columbia: Some("<p>columbia</p>".into()),
            html: Some("<p>original</p>".into()),
            plain_text: Some("plain".into()),
            ..Default::default()
        };
        let source = document.source_text().unwrap();
        assert_eq!(source.body, "<p>columbia</p>");
        assert_eq!(source.format, TextFormat::Html);
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let document = Document {
            html_columbia: Some(String::new()),
            html_lawbox: None,
            html: Some(String::new()),
            plain_text: Some("22 U.S. 44".into()),
            ..Default::default()
        };
        let source = document.source_text().unwrap();
        assert_eq!(source.body, "22 U.S. 44");
        assert!(!source.format.is_html());
    }

    #[test]
    fn test_no_text() {
        assert!(Document::default().source_text().is_none());
    }

    #[test]
    fn test_lookup_from_records() {
        let target = CitedTarget {
            id: 1,
            cluster_id: 10,
            url: "/opinion/10/a/".into(),
        };
        assert_eq!(TargetLookup::from_records(vec![]), TargetLookup::Missing);
        assert_eq!(
            TargetLookup::from_records(vec![target.clone()]),
            TargetLookup::Found(target.clone())
        );
        assert_eq!(
            TargetLookup::from_records(vec![target.clone(), target]),
            TargetLookup::Ambiguous(2)
        );
    }
}
