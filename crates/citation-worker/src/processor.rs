//! Citation worker processor
//!
//! Runs citation jobs through the linker and decides what happens to each
//! queue message.

use caselink_citations::{CitationLinker, LinkError, LinkReport};
use caselink_common::queue::{CitationJobMessage, FailedCitationJob};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// What to do with a processed message
#[derive(Debug)]
pub enum JobOutcome {
    /// Every stored opinion of the job was linked; delete the message
    Completed {
        job_id: Uuid,
        linked: usize,
        missing: usize,
    },
    /// Some opinions failed for good; dead-letter them, then delete the message
    Failed(FailedCitationJob),
    /// The batch could not be loaded; leave the message for redelivery
    Retry { job_id: Uuid, error: String },
}

impl JobOutcome {
    pub fn from_report(job: &CitationJobMessage, report: LinkReport) -> Self {
        if report.is_success() {
            return JobOutcome::Completed {
                job_id: job.job_id,
                linked: report.linked.len(),
                missing: report.missing.len(),
            };
        }

        let error = report
            .failed
            .iter()
            .map(|(id, e)| format!("{}: {}", id, e))
            .collect::<Vec<_>>()
            .join("; ");

        JobOutcome::Failed(FailedCitationJob {
            job_id: job.job_id,
            opinion_ids: report.failed.iter().map(|(id, _)| *id).collect(),
            index: job.index,
            error,
            failed_at: Utc::now(),
        })
    }

    /// Whether the message should be removed from the queue
    pub fn settles_message(&self) -> bool {
        !matches!(self, JobOutcome::Retry { .. })
    }
}

/// Citation worker processor
pub struct CitationProcessor {
    linker: Arc<CitationLinker>,
    concurrency: usize,
}

impl CitationProcessor {
    pub fn new(linker: Arc<CitationLinker>, concurrency: usize) -> Self {
        Self {
            linker,
            concurrency: concurrency.max(1),
        }
    }

    /// Process a citation job
    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    pub async fn process_job(&self, job: &CitationJobMessage) -> JobOutcome {
        info!(
            opinion_count = job.opinion_ids.len(),
            index = job.index,
            "Processing citation job"
        );

        match self.linker.link_documents(&job.opinion_ids, job.index).await {
            Ok(report) => {
                let outcome = JobOutcome::from_report(job, report);
                match &outcome {
                    JobOutcome::Completed { linked, missing, .. } => {
                        info!(linked, missing, "Citation job completed");
                    }
                    JobOutcome::Failed(failed) => {
                        warn!(
                            failed = failed.opinion_ids.len(),
                            "Citation job finished with failures"
                        );
                    }
                    JobOutcome::Retry { .. } => {}
                }
                outcome
            }
            Err(e) => {
                error!(error = %e, "Could not load opinions for citation job");
                JobOutcome::Retry {
                    job_id: job.job_id,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Process jobs concurrently. Outcomes are paired with the tag of their
    /// job and come back in completion order.
    pub async fn process_batch<T>(&self, jobs: Vec<(CitationJobMessage, T)>) -> Vec<(JobOutcome, T)> {
        stream::iter(jobs)
            .map(|(job, tag)| async move { (self.process_job(&job).await, tag) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Link opinions outside the queue
    pub async fn link(&self, ids: &[i64], index: bool) -> Result<LinkReport, LinkError> {
        self.linker.link_documents(ids, index).await
    }
}
