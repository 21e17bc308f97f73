//! Citation pipeline error types

use crate::document::DocumentId;
use caselink_common::errors::AppError;
use caselink_common::retry::RetryError;
use thiserror::Error;

/// Failure reported by a citation matcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The backend is temporarily unable to answer; the query may be retried
    #[error("Match backend not ready: {0}")]
    Transient(String),

    /// The query itself failed
    #[error("Match backend failed: {0}")]
    Permanent(String),
}

impl MatchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, MatchError::Transient(_))
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Store error: {0}")]
    Store(#[from] AppError),

    #[error("Invalid citation pattern: {0}")]
    Pattern(#[from] regex_lite::Error),

    #[error("Opinion {document_id}: gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        document_id: DocumentId,
        attempts: u32,
        source: MatchError,
    },
}

impl LinkError {
    /// Only an unavailable match backend is worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, LinkError::Match(MatchError::Transient(_)))
    }

    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            LinkError::Match(_) => "match_backend",
            LinkError::Store(_) => "store",
            LinkError::Pattern(_) => "pattern",
            LinkError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }

    pub(crate) fn from_retry(document_id: DocumentId, err: RetryError<LinkError>) -> Self {
        match err {
            RetryError::Exhausted {
                attempts,
                last: LinkError::Match(source),
            } => LinkError::RetriesExhausted {
                document_id,
                attempts,
                source,
            },
            other => other.into_inner(),
        }
    }
}
