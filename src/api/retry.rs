//! Retry manager for handling transient failures with exponential backoff
//!
//! This module provides a retry mechanism with a bounded attempt budget,
//! doubling backoff, and optional jitter for handling temporary failures
//! gracefully.

use crate::config::RetryConfig;
use crate::error::RetryableError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry manager with exponential backoff support
#[derive(Debug, Clone)]
pub struct RetryManager {
    config: RetryConfig,
}

impl RetryManager {
    /// Create a new RetryManager with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a RetryManager with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Execute an async operation with retry logic
    ///
    /// The operation runs at most `max_attempts` times in total. A retry
    /// happens only when the error reports itself as retryable; terminal
    /// errors are returned to the caller immediately. Each retry waits for
    /// a doubling backoff period with optional jitter.
    ///
    /// # Arguments
    ///
    /// * `operation` - A closure that returns a Future with Result<T, E>
    ///
    /// # Returns
    ///
    /// The result of the operation, or the last error once the attempt
    /// budget is spent
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + std::fmt::Display,
    {
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    if attempt >= self.config.max_attempts {
                        warn!(
                            attempts = attempt,
                            max_attempts = self.config.max_attempts,
                            "Retry budget exhausted"
                        );
                        return Err(err);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    debug!(
                        attempt = attempt,
                        max_attempts = self.config.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculate backoff duration after the given number of failed attempts
    ///
    /// Uses doubling backoff: base_delay * 2^(failed_attempts - 1),
    /// capped at max_delay_ms with optional jitter
    pub fn calculate_backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let base = self
            .config
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent));
        let capped = base.min(self.config.max_delay_ms);

        let delay_ms = if self.config.jitter {
            // Add jitter: 50-100% of the calculated backoff
            let jitter = rand::thread_rng().gen_range(0.5..1.0);
            (capped as f64 * jitter) as u64
        } else {
            capped
        };

        Duration::from_millis(delay_ms)
    }

    /// Get the retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
