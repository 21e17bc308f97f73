//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An opinion together with the cluster fields needed to link to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedOpinion {
    pub opinion_id: i64,
    pub cluster_id: i64,
    pub absolute_url: String,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Opinion Operations
    // ========================================================================

    /// Load opinions by primary key, ordered by id
    pub async fn find_opinions(&self, ids: &[i64]) -> Result<Vec<Opinion>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        OpinionEntity::find()
            .filter(OpinionColumn::Id.is_in(ids.iter().copied()))
            .order_by_asc(OpinionColumn::Id)
            .all(self.primary_for_jobs())
            .await
            .map_err(Into::into)
    }

    /// All opinions stored under `id` joined with their cluster.
    ///
    /// Every row is returned; callers treat more than one as ambiguous.
    pub async fn find_cited_opinions(&self, id: i64) -> Result<Vec<CitedOpinion>> {
        let rows = OpinionEntity::find()
            .filter(OpinionColumn::Id.eq(id))
            .find_also_related(OpinionClusterEntity)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(opinion, cluster)| {
                cluster.map(|cluster| CitedOpinion {
                    opinion_id: opinion.id,
                    cluster_id: cluster.id,
                    absolute_url: cluster.absolute_url(),
                })
            })
            .collect())
    }

    /// Store the rendered HTML with citation links
    pub async fn update_html_with_citations(&self, opinion_id: i64, html: &str) -> Result<bool> {
        let result = OpinionEntity::update_many()
            .col_expr(OpinionColumn::HtmlWithCitations, Expr::value(html.to_string()))
            .col_expr(OpinionColumn::DateModified, Expr::current_timestamp().into())
            .filter(OpinionColumn::Id.eq(opinion_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Citation Graph Operations
    // ========================================================================

    /// Ids of opinions currently cited by `citing_opinion_id`
    pub async fn cited_opinion_ids(&self, citing_opinion_id: i64) -> Result<Vec<i64>> {
        OpinionsCitedEntity::find()
            .select_only()
            .column(OpinionsCitedColumn::CitedOpinionId)
            .filter(OpinionsCitedColumn::CitingOpinionId.eq(citing_opinion_id))
            .into_tuple::<i64>()
            .all(self.primary_for_jobs())
            .await
            .map_err(Into::into)
    }

    /// Replace every outgoing edge of `citing_opinion_id` with `cited_ids`.
    ///
    /// Delete and insert run in one transaction.
    pub async fn replace_opinions_cited(
        &self,
        citing_opinion_id: i64,
        cited_ids: &[i64],
    ) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let deleted = OpinionsCitedEntity::delete_many()
            .filter(OpinionsCitedColumn::CitingOpinionId.eq(citing_opinion_id))
            .exec(&txn)
            .await?;

        if !cited_ids.is_empty() {
            let edges = cited_ids.iter().map(|&cited| OpinionsCitedActiveModel {
                citing_opinion_id: Set(citing_opinion_id),
                cited_opinion_id: Set(cited),
                ..Default::default()
            });
            OpinionsCitedEntity::insert_many(edges).exec(&txn).await?;
        }

        txn.commit().await?;

        debug!(
            citing_opinion_id,
            removed = deleted.rows_affected,
            inserted = cited_ids.len(),
            "Replaced citation edges"
        );

        Ok(())
    }

    // ========================================================================
    // Cluster Operations
    // ========================================================================

    /// Atomically add one to a cluster's citation count.
    /// Returns false when the cluster does not exist.
    pub async fn increment_citation_count(&self, cluster_id: i64) -> Result<bool> {
        let result = OpinionClusterEntity::update_many()
            .col_expr(
                OpinionClusterColumn::CitationCount,
                Expr::col(OpinionClusterColumn::CitationCount).add(1),
            )
            .filter(OpinionClusterColumn::Id.eq(cluster_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Clusters carrying the reporter citation `volume reporter page`,
    /// excluding `exclude_cluster_id`
    pub async fn find_clusters_by_citation(
        &self,
        volume: i32,
        reporter: &str,
        page: &str,
        exclude_cluster_id: i64,
    ) -> Result<Vec<i64>> {
        let mut cluster_ids: Vec<i64> = CitationEntity::find()
            .select_only()
            .column(CitationColumn::ClusterId)
            .filter(CitationColumn::Volume.eq(volume))
            .filter(CitationColumn::Reporter.eq(reporter))
            .filter(CitationColumn::Page.eq(page))
            .filter(CitationColumn::ClusterId.ne(exclude_cluster_id))
            .into_tuple::<i64>()
            .all(self.read_conn())
            .await?;

        cluster_ids.sort_unstable();
        cluster_ids.dedup();
        Ok(cluster_ids)
    }

    /// Ids of the opinions belonging to the given clusters
    pub async fn opinion_ids_for_clusters(&self, cluster_ids: &[i64]) -> Result<Vec<i64>> {
        if cluster_ids.is_empty() {
            return Ok(Vec::new());
        }

        OpinionEntity::find()
            .select_only()
            .column(OpinionColumn::Id)
            .filter(OpinionColumn::ClusterId.is_in(cluster_ids.iter().copied()))
            .order_by_asc(OpinionColumn::Id)
            .into_tuple::<i64>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Reads that feed a write in the same job must see the primary.
    fn primary_for_jobs(&self) -> &DatabaseConnection {
        self.write_conn()
    }
}
