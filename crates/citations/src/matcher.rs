//! Citation matching contract

use crate::citation::Citation;
use crate::document::{Document, DocumentId};
use crate::errors::MatchError;
use async_trait::async_trait;

/// Candidates a matcher found for one citation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    NoMatch,
    SingleMatch(DocumentId),
    /// Several candidates; the citation stays unlinked
    AmbiguousMatch(Vec<DocumentId>),
}

impl MatchOutcome {
    pub fn from_ids(mut ids: Vec<DocumentId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        match ids.len() {
            0 => MatchOutcome::NoMatch,
            1 => MatchOutcome::SingleMatch(ids[0]),
            _ => MatchOutcome::AmbiguousMatch(ids),
        }
    }
}

/// Resolves a citation against the corpus
#[async_trait]
pub trait CitationMatcher: Send + Sync {
    /// Find the documents `citation` may refer to. `citing` is the document
    /// the citation was found in and must never match itself.
    async fn match_citation(
        &self,
        citation: &Citation,
        citing: &Document,
    ) -> Result<MatchOutcome, MatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_ids() {
        assert_eq!(MatchOutcome::from_ids(vec![]), MatchOutcome::NoMatch);
        assert_eq!(MatchOutcome::from_ids(vec![4]), MatchOutcome::SingleMatch(4));
        assert_eq!(MatchOutcome::from_ids(vec![4, 4]), MatchOutcome::SingleMatch(4));
        assert_eq!(
            MatchOutcome::from_ids(vec![9, 4]),
            MatchOutcome::AmbiguousMatch(vec![4, 9])
        );
    }
}
