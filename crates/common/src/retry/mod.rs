//! Bounded retry with a fixed delay
//!
//! Background jobs retry an operation when its backend reports that it is
//! temporarily unable to serve the request. The policy is a countdown, not
//! exponential backoff: every retry waits the same delay and the operation
//! is attempted at most `max_attempts` times in total.

use backoff::backoff::Backoff;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default number of attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy that performs a single attempt
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Fresh backoff state for one retried operation
    pub fn backoff(&self) -> FixedBackoff {
        FixedBackoff {
            max_attempts: self.max_attempts,
            delay: self.delay,
            failures: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Backoff yielding a constant delay until the attempt budget is spent
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    max_attempts: u32,
    delay: Duration,
    failures: u32,
}

impl Backoff for FixedBackoff {
    fn reset(&mut self) {
        self.failures = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        // Called once per failed attempt.
        self.failures += 1;
        if self.failures >= self.max_attempts {
            None
        } else {
            Some(self.delay)
        }
    }
}

/// Failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// A non-transient error stopped the retries
    #[error("failed on attempt {attempts}: {error}")]
    Permanent { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Permanent { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent { error, .. } => error,
        }
    }
}

/// Value produced by a retried operation, with the attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Run `operation` under `policy`, retrying errors for which `is_transient`
/// returns true.
pub async fn retry_transient<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    is_transient: C,
) -> Result<Retried<T>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = AtomicU32::new(0);
    let classify = &is_transient;
    let counter = &attempts;

    let result = backoff::future::retry_notify(
        policy.backoff(),
        || {
            counter.fetch_add(1, Ordering::Relaxed);
            let fut = operation();
            async move {
                fut.await.map_err(|err| {
                    if classify(&err) {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        },
        |err: E, wait: Duration| {
            crate::metrics::record_retry(label);
            warn!(
                operation = label,
                attempt = counter.load(Ordering::Relaxed),
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
        },
    )
    .await;

    let attempts = attempts.load(Ordering::Relaxed);
    match result {
        Ok(value) => Ok(Retried { value, attempts }),
        Err(err) if is_transient(&err) => Err(RetryError::Exhausted { attempts, last: err }),
        Err(err) => Err(RetryError::Permanent { attempts, error: err }),
    }
}
