//! Caselink Citation Worker
//!
//! Processes citation jobs from SQS queue:
//! 1. Receives batches of opinion ids from queue
//! 2. Extracts and matches the citations of each opinion
//! 3. Updates citation counts, rendered HTML and the citation graph
//! 4. Dead-letters opinions that cannot be linked
//!
//! `citation-worker link <id>... [--no-index]` links opinions directly and exits.

mod matcher;
mod processor;
mod store;

use crate::matcher::RepositoryMatcher;
use crate::processor::{CitationProcessor, JobOutcome};
use crate::store::{IndexSink, RepositoryStore};
use anyhow::{bail, Context};
use caselink_citations::{CitationLinker, ReporterExtractor};
use caselink_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    metrics::{record_queue_message, register_metrics, LINK_BUCKETS, METRICS_PREFIX},
    queue::{CitationJobMessage, MalformedMessage, Queue, QueueOptions},
    Repository, VERSION,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CITATION_QUEUE: &str = "citations";
const MAX_FAILURES: u32 = 5;
const CIRCUIT_BREAK_DURATION: Duration = Duration::from_secs(30);
const RECEIVE_ERROR_PAUSE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting Caselink Citation Worker v{}",
        VERSION
    );

    install_metrics(config.observability.metrics_port)?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Repository::new(db);
    repository.ping().await.context("Database health check failed")?;

    let index_queue = match &config.queue.index_queue_url {
        Some(url) => {
            info!(url = %url, "Connecting to index queue...");
            let options = QueueOptions::from_config(url.clone(), &config.queue);
            Some(Arc::new(Queue::new(options).await?) as Arc<dyn IndexSink>)
        }
        None => {
            warn!("No index queue configured, index requests will be dropped");
            None
        }
    };

    // Initialize processor
    let extractor = ReporterExtractor::with_reporters(&config.citations.extra_reporters);
    let store = Arc::new(RepositoryStore::new(repository.clone(), index_queue));
    let linker = CitationLinker::new(
        Arc::new(extractor),
        Arc::new(RepositoryMatcher::new(repository)),
        store.clone(),
        store,
    )
    .with_retry(config.citations.retry_policy())
    .with_parallel_distance(config.citations.parallel_distance);
    let processor = CitationProcessor::new(Arc::new(linker), config.citations.concurrency);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("link") {
        return link_once(&processor, &args[1..]).await;
    }

    // Service mode: poll SQS queue
    let Some(url) = config.queue.citation_queue_url.clone() else {
        warn!("No citation queue configured, waiting for shutdown signal...");
        tokio::signal::ctrl_c().await?;
        info!("Citation worker shutting down");
        return Ok(());
    };

    let queue = Queue::new(QueueOptions::from_config(url, &config.queue)).await?;

    info!(
        queue = %queue.url(),
        concurrency = config.citations.concurrency,
        "Citation worker ready, starting queue polling..."
    );

    // Circuit breaker state
    let mut consecutive_failures = 0;

    loop {
        if consecutive_failures >= MAX_FAILURES {
            warn!(
                failures = consecutive_failures,
                "Circuit breaker open, pausing..."
            );
            tokio::time::sleep(CIRCUIT_BREAK_DURATION).await;
            consecutive_failures = 0;
            info!("Circuit breaker reset, resuming...");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            result = queue.receive_jobs::<CitationJobMessage>() => {
                match result {
                    Ok(received) => {
                        for message in received.malformed {
                            dead_letter_malformed(&queue, message).await;
                        }

                        for (outcome, receipt_handle) in processor.process_batch(received.jobs).await {
                            if outcome.settles_message() {
                                consecutive_failures = 0;
                            } else {
                                consecutive_failures += 1;
                            }
                            settle(&queue, outcome, &receipt_handle).await;
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(error = %e, "Failed to receive messages from queue");
                        tokio::time::sleep(RECEIVE_ERROR_PAUSE).await;
                    }
                }
            }
        }
    }

    info!("Citation worker shutting down");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Start the Prometheus listener. Port 0 disables it.
fn install_metrics(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        info!("Metrics listener disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_link_duration_seconds", METRICS_PREFIX)),
            LINK_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    register_metrics();
    info!(port, "Metrics listener started");
    Ok(())
}

/// Act on a processed message.
///
/// A failed job is deleted only once its dead letter has been sent.
async fn settle(queue: &Queue, outcome: JobOutcome, receipt_handle: &str) {
    let success = matches!(outcome, JobOutcome::Completed { .. });

    if let JobOutcome::Failed(failed) = &outcome {
        if let Err(e) = queue.send_to_dlq(failed).await {
            error!(job_id = %failed.job_id, error = %e, "Failed to dead-letter citation job");
            record_queue_message(CITATION_QUEUE, false);
            return;
        }
    }

    if outcome.settles_message() {
        if let Err(e) = queue.delete(receipt_handle).await {
            error!(error = %e, "Failed to delete message");
        }
    }

    record_queue_message(CITATION_QUEUE, success);
}

async fn dead_letter_malformed(queue: &Queue, message: MalformedMessage) {
    match queue.send_to_dlq(&message).await {
        Ok(_) => {
            if let Err(e) = queue.delete(&message.receipt_handle).await {
                error!(error = %e, "Failed to delete malformed message");
            }
        }
        Err(e) => error!(error = %e, "Failed to dead-letter malformed message"),
    }
    record_queue_message(CITATION_QUEUE, false);
}

/// Link the opinions named on the command line
async fn link_once(processor: &CitationProcessor, args: &[String]) -> anyhow::Result<()> {
    let (ids, index) = parse_link_args(args)?;
    info!(count = ids.len(), index, "Linking opinions");

    let report = processor.link(&ids, index).await?;

    for linked in &report.linked {
        println!(
            "opinion {}: {} citations, {} resolved, {} cited, {} parallel groups",
            linked.document_id,
            linked.citations_found,
            linked.citations_resolved,
            linked.cited_ids.len(),
            linked.parallel_groups,
        );
    }
    for id in &report.missing {
        println!("opinion {}: not found", id);
    }
    for (id, e) in &report.failed {
        eprintln!("opinion {}: {}", id, e);
    }

    if !report.is_success() {
        bail!("{} opinion(s) could not be linked", report.failed.len());
    }
    Ok(())
}

fn parse_link_args(args: &[String]) -> anyhow::Result<(Vec<i64>, bool)> {
    let mut index = true;
    let mut ids = Vec::new();

    for arg in args {
        if arg == "--no-index" {
            index = false;
        } else {
            let id = arg
                .parse::<i64>()
                .with_context(|| format!("Invalid opinion id: {}", arg))?;
            ids.push(id);
        }
    }

    if ids.is_empty() {
        bail!("Usage: citation-worker link <opinion-id>... [--no-index]");
    }
    Ok((ids, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_link_args() {
        let (ids, index) = parse_link_args(&args(&["12", "40"])).unwrap();
        assert_eq!(ids, vec![12, 40]);
        assert!(index);

        let (ids, index) = parse_link_args(&args(&["--no-index", "7"])).unwrap();
        assert_eq!(ids, vec![7]);
        assert!(!index);
    }

    #[test]
    fn test_parse_link_args_rejects_bad_input() {
        tokio_test::assert_err!(parse_link_args(&args(&[])));
        tokio_test::assert_err!(parse_link_args(&args(&["--no-index"])));
        tokio_test::assert_err!(parse_link_args(&args(&["12x"])));
    }
}
