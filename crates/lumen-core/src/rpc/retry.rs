//! Retry with exponential backoff for RPC calls.
//!
//! Every RPC call the indexer makes is wrapped by [`retry_with_backoff`].
//! Retryable failures (see [`RpcError::is_retryable`]) are repeated up to
//! `max_attempts` times with an exponentially growing, optionally jittered
//! sleep between attempts. Non-retryable failures and cancellation short-
//! circuit immediately.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::rpc::RpcError;

/// Backoff policy for retried RPC calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Sleep before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the sleep between attempts.
    pub max_backoff: Duration,
    /// Factor applied to the backoff after each wait.
    pub multiplier: f64,
    /// Adds uniform jitter in `[0, backoff / 4)` to each wait, spreading
    /// retries from chains that share an endpoint.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The operation failed with an error that retrying cannot fix.
    #[error("non-retryable error: {0}")]
    NonRetryable(#[source] RpcError),

    /// Cancellation fired while waiting between attempts.
    #[error("retry cancelled")]
    Cancelled,

    /// Every attempt failed with a retryable error.
    #[error("max retry attempts ({attempts}) exceeded: {source}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last error observed.
        source: RpcError,
    },
}

impl RetryError {
    /// Distinguishes cancellation from operational failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Runs `op` up to `config.max_attempts` times with exponential backoff.
///
/// Sleeps only between attempts; the final attempt never sleeps afterward.
/// The backoff grows by `multiplier` after each wait, capped at
/// `max_backoff`. If `cancel` fires during a sleep the call unblocks and
/// returns [`RetryError::Cancelled`].
pub async fn retry_with_backoff<T, F, Fut>(
    cancel: &CancellationToken,
    config: &RetryConfig,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut backoff = config.initial_backoff;
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(RetryError::NonRetryable(err)),
            Err(err) => err,
        };

        if attempt == max_attempts {
            return Err(RetryError::Exhausted { attempts: max_attempts, source: err });
        }

        let mut wait = backoff;
        if config.jitter {
            let quarter = backoff / 4;
            if !quarter.is_zero() {
                wait += quarter.mul_f64(rand::random::<f64>());
            }
        }

        warn!(
            attempt,
            max_attempts,
            backoff_ms = wait.as_millis() as u64,
            error = %err,
            "rpc call failed, retrying"
        );

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = cancel.cancelled() => return Err(RetryError::Cancelled),
        }

        backoff = backoff.mul_f64(config.multiplier).min(config.max_backoff);
    }

    // The loop always returns from its final iteration.
    Err(RetryError::Cancelled)
}
