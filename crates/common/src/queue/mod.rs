//! SQS Queue integration for async job processing
//!
//! Provides:
//! - SQS client wrapper
//! - Message serialization/deserialization
//! - Dead letter queue forwarding

use crate::errors::{AppError, Result};
use aws_sdk_sqs::types::Message;
use aws_sdk_sqs::Client as SqsClient;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// SQS queue settings
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Queue URL
    pub url: String,
    /// Dead letter queue URL (optional)
    pub dlq_url: Option<String>,
    /// Visibility timeout in seconds
    pub visibility_timeout: i32,
    /// Wait time for long polling (seconds)
    pub wait_time_seconds: i32,
    /// Maximum number of messages per poll
    pub max_messages: i32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            dlq_url: None,
            visibility_timeout: 300,
            wait_time_seconds: 20,
            max_messages: 10,
        }
    }
}

impl QueueOptions {
    /// Build options for `url` from the service queue configuration
    pub fn from_config(url: String, config: &crate::config::QueueConfig) -> Self {
        // SQS caps long polling at 20s and a receive batch at 10 messages.
        Self {
            url,
            dlq_url: config.dlq_url.clone(),
            visibility_timeout: config.visibility_timeout_secs.min(43_200) as i32,
            wait_time_seconds: config.poll_timeout_secs.min(20) as i32,
            max_messages: config.batch_size.clamp(1, 10) as i32,
        }
    }
}

/// SQS Queue client wrapper
pub struct Queue {
    client: SqsClient,
    options: QueueOptions,
}

impl Queue {
    /// Create a new queue client
    pub async fn new(options: QueueOptions) -> Result<Self> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = SqsClient::new(&aws_config);

        Ok(Self { client, options })
    }

    pub fn url(&self) -> &str {
        &self.options.url
    }

    /// Send a message to the queue
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<String> {
        self.send_to(&self.options.url, message).await
    }

    /// Forward a message to the dead letter queue.
    /// Returns `Ok(None)` when no dead letter queue is configured.
    pub async fn send_to_dlq<T: Serialize>(&self, message: &T) -> Result<Option<String>> {
        match self.options.dlq_url.as_deref() {
            Some(dlq_url) => self.send_to(dlq_url, message).await.map(Some),
            None => {
                warn!(queue = %self.options.url, "No dead letter queue configured, dropping message");
                Ok(None)
            }
        }
    }

    async fn send_to<T: Serialize>(&self, url: &str, message: &T) -> Result<String> {
        let body = serde_json::to_string(message).map_err(|e| AppError::QueueError {
            message: format!("Failed to serialize message: {}", e),
        })?;

        let result = self
            .client
            .send_message()
            .queue_url(url)
            .message_body(&body)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to send message: {}", e),
            })?;

        let message_id = result.message_id().unwrap_or_default().to_string();
        debug!(message_id = %message_id, queue = %url, "Message sent to queue");

        Ok(message_id)
    }

    /// Receive raw messages from the queue
    pub async fn receive(&self) -> Result<Vec<Message>> {
        let result = self
            .client
            .receive_message()
            .queue_url(&self.options.url)
            .max_number_of_messages(self.options.max_messages)
            .visibility_timeout(self.options.visibility_timeout)
            .wait_time_seconds(self.options.wait_time_seconds)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to receive messages: {}", e),
            })?;

        let messages = result.messages.unwrap_or_default();
        debug!(count = messages.len(), "Received messages from queue");

        Ok(messages)
    }

    /// Receive messages decoded as `T`, paired with their receipt handles.
    ///
    /// Messages that fail to decode are returned separately so the caller
    /// can dead-letter them.
    pub async fn receive_jobs<T: DeserializeOwned>(&self) -> Result<Received<T>> {
        let mut received = Received {
            jobs: Vec::new(),
            malformed: Vec::new(),
        };

        for message in self.receive().await? {
            let Some(receipt_handle) = message.receipt_handle().map(str::to_string) else {
                warn!("Message without receipt handle, skipping");
                continue;
            };

            match Self::parse_message::<T>(&message) {
                Ok(job) => received.jobs.push((job, receipt_handle)),
                Err(e) => {
                    warn!(error = %e, "Malformed queue message");
                    received.malformed.push(MalformedMessage {
                        body: message.body().unwrap_or_default().to_string(),
                        receipt_handle,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(received)
    }

    /// Delete a message after processing
    pub async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.options.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to delete message: {}", e),
            })?;

        debug!("Message deleted from queue");
        Ok(())
    }

    /// Parse message body as JSON
    pub fn parse_message<T: DeserializeOwned>(message: &Message) -> Result<T> {
        let body = message.body().ok_or_else(|| AppError::QueueError {
            message: "Message has no body".to_string(),
        })?;

        parse_body(body)
    }
}

/// Decode a JSON message body
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| AppError::QueueError {
        message: format!("Failed to parse message: {}", e),
    })
}

/// Decoded messages from one poll
#[derive(Debug)]
pub struct Received<T> {
    pub jobs: Vec<(T, String)>,
    pub malformed: Vec<MalformedMessage>,
}

/// A message whose body could not be decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalformedMessage {
    pub body: String,
    #[serde(skip)]
    pub receipt_handle: String,
    pub error: String,
}

/// Citation linking job message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationJobMessage {
    pub job_id: Uuid,
    pub opinion_ids: Vec<i64>,
    /// Propagate changes to the search index immediately
    #[serde(default = "default_index")]
    pub index: bool,
    pub enqueued_at: DateTime<Utc>,
}

fn default_index() -> bool {
    true
}

impl CitationJobMessage {
    pub fn new(opinion_ids: Vec<i64>, index: bool) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            opinion_ids,
            index,
            enqueued_at: Utc::now(),
        }
    }
}

/// Kind of record an index request refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Opinion,
    Cluster,
}

/// Search index update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJobMessage {
    pub kind: IndexKind,
    pub ids: Vec<i64>,
}

/// Documents of a citation job that could not be linked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCitationJob {
    pub job_id: Uuid,
    pub opinion_ids: Vec<i64>,
    pub index: bool,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}
