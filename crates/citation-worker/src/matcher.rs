//! Citation matcher backed by the citations table

use async_trait::async_trait;
use caselink_citations::{Citation, CitationMatcher, Document, MatchError, MatchOutcome};
use caselink_common::errors::AppError;
use caselink_common::Repository;
use tracing::debug;

/// Looks citations up among the reporter citations of stored clusters.
///
/// The citing opinion's own cluster is never a match.
pub struct RepositoryMatcher {
    repository: Repository,
}

impl RepositoryMatcher {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CitationMatcher for RepositoryMatcher {
    async fn match_citation(
        &self,
        citation: &Citation,
        citing: &Document,
    ) -> Result<MatchOutcome, MatchError> {
        // Volumes outside the column range cannot be stored.
        let Ok(volume) = i32::try_from(citation.volume) else {
            return Ok(MatchOutcome::NoMatch);
        };

        let clusters = self
            .repository
            .find_clusters_by_citation(volume, &citation.reporter, &citation.page, citing.cluster_id)
            .await
            .map_err(classify)?;
        if clusters.is_empty() {
            return Ok(MatchOutcome::NoMatch);
        }

        let opinions = self
            .repository
            .opinion_ids_for_clusters(&clusters)
            .await
            .map_err(classify)?;

        debug!(
            citation = %citation,
            clusters = clusters.len(),
            opinions = opinions.len(),
            "Citation lookup"
        );

        Ok(MatchOutcome::from_ids(opinions))
    }
}

fn classify(err: AppError) -> MatchError {
    if err.is_transient() {
        MatchError::Transient(err.to_string())
    } else {
        MatchError::Permanent(err.to_string())
    }
}
