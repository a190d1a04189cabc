//! Fixed-delay retry policies
//!
//! Monit needs two policies layered on top of each other: a short one
//! for transient request failures, and a long one that re-runs the
//! short one for as long as monit itself is still booting and refusing
//! connections. Policies are plain values so callers compose them,
//! outer-retries-inner.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::PluginError;

/// A bounded, fixed-delay retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted.
    pub async fn run<T, Op, Fut>(&self, op: Op) -> Result<T, PluginError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PluginError>>,
    {
        self.run_while(op, |_| true).await
    }

    /// Run `op` until it succeeds, the attempt budget is exhausted, or
    /// `retryable` rejects the error. A rejected error is returned
    /// immediately without consuming further attempts.
    pub async fn run_while<T, Op, Fut, P>(
        &self,
        mut op: Op,
        retryable: P,
    ) -> Result<T, PluginError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PluginError>>,
        P: Fn(&PluginError) -> bool,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts.max(1) || !retryable(&e) => {
                    return Err(e);
                }
                Err(e) => {
                    debug!(attempt, max_attempts = self.max_attempts, "retrying after error: {}", e);
                }
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}
