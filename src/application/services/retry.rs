//! # Retry Policy
//!
//! Fixed-delay retries for transient failures.
//!
//! This module provides [`RetryPolicy`] for configuring retry behavior and
//! [`execute_with_retry`] for executing operations with automatic retries.
//!
//! # Features
//!
//! - Bounded or unbounded attempts (`max_retries: None` retries forever)
//! - Optional per-attempt timeout; a timed-out attempt counts as a retryable failure
//! - Support for distinguishing retryable vs non-retryable errors
//! - Every failed attempt is logged at `warn` with the operation label
//!
//! # Example
//!
//! ```
//! use pos_node::application::services::retry::{RetryPolicy, execute_with_retry, Retryable};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct RpcError(bool);
//!
//! impl std::fmt::Display for RpcError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("rpc error")
//!     }
//! }
//!
//! impl Retryable for RpcError {
//!     fn is_retryable(&self) -> bool {
//!         self.0
//!     }
//! }
//!
//! async fn connect() -> Result<u64, RpcError> {
//!     Ok(1)
//! }
//!
//! # async fn example() {
//! let policy = RetryPolicy::unbounded_fixed(Duration::from_secs(10), Some(Duration::from_secs(60)));
//! let chain_id = execute_with_retry(&policy, "connect", || connect()).await;
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Trait for errors that can indicate whether they are retryable.
pub trait Retryable {
    /// Returns true if the error is transient and the operation should be retried.
    fn is_retryable(&self) -> bool;
}

/// Fixed-delay retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts. `None` retries until success or a
    /// non-retryable error.
    pub max_retries: Option<u32>,
    /// Delay between attempts.
    pub delay: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Creates a bounded policy with a constant delay between attempts.
    #[must_use]
    pub const fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
            delay,
            attempt_timeout: None,
        }
    }

    /// Creates a policy that retries forever with a constant delay, racing
    /// every attempt against `attempt_timeout` when one is given.
    #[must_use]
    pub const fn unbounded_fixed(delay: Duration, attempt_timeout: Option<Duration>) -> Self {
        Self {
            max_retries: None,
            delay,
            attempt_timeout,
        }
    }

    /// Returns true if more retries are allowed for the given attempt count.
    #[must_use]
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        self.max_retries.is_none_or(|max| attempts_made < max)
    }

    /// Returns true when the policy never gives up on retryable errors.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max_retries.is_none()
    }
}

/// Error returned when retry execution fails.
#[derive(Debug)]
pub enum RetryError<E> {
    /// All retry attempts were exhausted.
    MaxRetriesExceeded {
        /// The last error encountered.
        last_error: E,
        /// Total number of attempts made.
        attempts: u32,
    },
    /// The error was marked as non-retryable.
    NonRetryable {
        /// The non-retryable error.
        error: E,
        /// Number of attempts made before encountering non-retryable error.
        attempts: u32,
    },
    /// The last allowed attempt exceeded the per-attempt timeout.
    TimedOut {
        /// The timeout that elapsed.
        after: Duration,
        /// Total number of attempts made.
        attempts: u32,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxRetriesExceeded {
                last_error,
                attempts,
            } => {
                write!(
                    f,
                    "max retries exceeded after {} attempts: {}",
                    attempts, last_error
                )
            }
            Self::NonRetryable { error, attempts } => {
                write!(
                    f,
                    "non-retryable error after {} attempts: {}",
                    attempts, error
                )
            }
            Self::TimedOut { after, attempts } => {
                write!(
                    f,
                    "attempt {} timed out after {}",
                    attempts,
                    humantime::format_duration(*after)
                )
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

impl<E> RetryError<E> {
    /// Returns the underlying error, if the last attempt produced one.
    #[must_use]
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::MaxRetriesExceeded { last_error, .. } => Some(last_error),
            Self::NonRetryable { error, .. } => Some(error),
            Self::TimedOut { .. } => None,
        }
    }

    /// Returns a reference to the underlying error, if any.
    #[must_use]
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::MaxRetriesExceeded { last_error, .. } => Some(last_error),
            Self::NonRetryable { error, .. } => Some(error),
            Self::TimedOut { .. } => None,
        }
    }

    /// Returns the number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::MaxRetriesExceeded { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// Returns true if this was a max retries exceeded error.
    #[must_use]
    pub fn is_max_retries_exceeded(&self) -> bool {
        matches!(self, Self::MaxRetriesExceeded { .. })
    }

    /// Returns true if this was a non-retryable error.
    #[must_use]
    pub fn is_non_retryable(&self) -> bool {
        matches!(self, Self::NonRetryable { .. })
    }

    /// Returns true if the last attempt timed out.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Executes an async operation with retry logic.
///
/// `label` names the operation in the warning logged for every failed
/// attempt. When the policy carries an attempt timeout, each attempt is
/// raced against it and a timeout is treated like a retryable error.
///
/// # Errors
///
/// Returns `RetryError::MaxRetriesExceeded` or `RetryError::TimedOut` if all
/// retry attempts are exhausted.
/// Returns `RetryError::NonRetryable` if a non-retryable error is encountered.
pub async fn execute_with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);

        let outcome = match policy.attempt_timeout {
            Some(limit) => timeout(limit, operation()).await.map_err(|_| limit),
            None => Ok(operation().await),
        };

        let failure = match outcome {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(error)) => {
                if !error.is_retryable() {
                    return Err(RetryError::NonRetryable { error, attempts });
                }
                if !policy.should_retry(attempts) {
                    return Err(RetryError::MaxRetriesExceeded {
                        last_error: error,
                        attempts,
                    });
                }
                error.to_string()
            }
            Err(after) => {
                if !policy.should_retry(attempts) {
                    return Err(RetryError::TimedOut { after, attempts });
                }
                format!("timed out after {}", humantime::format_duration(after))
            }
        };

        let delay = policy.delay;
        warn!(
            operation = label,
            attempt = attempts,
            error = %failure,
            "attempt failed, retrying in {}",
            humantime::format_duration(delay)
        );
        sleep(delay).await;
    }
}

/// Result type for retry operations.
pub type RetryResult<T, E> = Result<T, RetryError<E>>;
