//! Caselink citation pipeline
//!
//! Finds reporter citations in opinion text, groups parallel citations and
//! links citing opinions to the opinions they cite.

pub mod citation;
pub mod document;
pub mod errors;
pub mod extract;
pub mod html;
pub mod linker;
pub mod matcher;
pub mod parallel;

pub use citation::Citation;
pub use document::{
    AggregateStore, CitedTarget, ClusterId, Document, DocumentId, DocumentStore, SourceText,
    TargetLookup, TextFormat,
};
pub use errors::{LinkError, MatchError};
pub use extract::{CitationExtractor, ReporterExtractor};
pub use linker::{CitationLinker, DocumentReport, LinkReport};
pub use matcher::{CitationMatcher, MatchOutcome};
pub use parallel::{identify_parallel_citations, ParallelCitationGroup, PARALLEL_DISTANCE};
