//! Bounded-attempt retry with exponential backoff
//!
//! A [`RetryProxy`] re-invokes an action while its failures belong to a
//! declared set of retryable [`ErrorKind`]s; any other failure aborts
//! immediately without consuming the remaining attempts. Context is threaded
//! through the action by value so the retried unit can hold exclusive
//! borrows (e.g. a mutable connection handle) across attempts.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use crate::error::{ErrorKind, Result};

/// Default delay before the second attempt; doubles every attempt after
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Bounded-attempt, exponential-backoff execution wrapper.
///
/// Created per call; `try_count` reports how many attempts the last `call`
/// made, which the orchestrator folds into exhausted-retry diagnostics.
#[derive(Debug)]
pub struct RetryProxy {
    max_attempts: u32,
    backoff_base: Duration,
    retryable: HashSet<ErrorKind>,
    try_count: u32,
}

impl RetryProxy {
    /// Create a proxy allowing up to `max_attempts` attempts (clamped to at
    /// least 1) of failures whose kind is in `retryable`.
    pub fn new(max_attempts: u32, retryable: HashSet<ErrorKind>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base: DEFAULT_BACKOFF_BASE,
            retryable,
            try_count: 0,
        }
    }

    /// Override the base backoff delay
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Attempts made by the most recent [`call`](Self::call)
    pub fn try_count(&self) -> u32 {
        self.try_count
    }

    /// Whether the given kind belongs to this proxy's retryable set
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Invoke `action` until it succeeds, a non-retryable failure occurs, or
    /// the attempt budget is exhausted; the last error is returned as-is.
    ///
    /// Attempt *n* (1-indexed) that fails retryably emits the
    /// `Retrying... [{n}x]` notice and waits `backoff_base * 2^(n-1)` before
    /// the next attempt. There is no wait before the first attempt.
    pub async fn call<C, T, F, Fut>(&mut self, mut ctx: C, mut action: F) -> (C, Result<T>)
    where
        F: FnMut(C) -> Fut,
        Fut: Future<Output = (C, Result<T>)>,
    {
        self.try_count = 0;
        loop {
            self.try_count += 1;
            let (returned, result) = action(ctx).await;
            ctx = returned;

            match result {
                Ok(value) => return (ctx, Ok(value)),
                Err(e) => {
                    if self.try_count >= self.max_attempts || !self.retryable.contains(&e.kind()) {
                        return (ctx, Err(e));
                    }
                    info!("Retrying... [{}x]", self.try_count);
                    sleep(self.backoff_delay(self.try_count)).await;
                }
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;

    fn retryable() -> HashSet<ErrorKind> {
        [ErrorKind::Connection, ErrorKind::Driver].into_iter().collect()
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let proxy = RetryProxy::new(5, retryable()).with_backoff_base(Duration::from_millis(100));

        assert_eq!(proxy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(proxy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(proxy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(proxy.backoff_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_max_attempts_clamped_to_one() {
        let proxy = RetryProxy::new(0, retryable());
        assert_eq!(proxy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mut proxy = RetryProxy::new(3, retryable());
        let (calls, result) = proxy
            .call(0_u32, |calls| async move { (calls + 1, Ok::<_, Error>(42)) })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
        assert_eq!(proxy.try_count(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut proxy =
            RetryProxy::new(5, retryable()).with_backoff_base(Duration::from_millis(1));
        let (calls, result) = proxy
            .call(0_u32, |calls| async move {
                let calls = calls + 1;
                if calls < 3 {
                    (calls, Err(Error::connection("refused")))
                } else {
                    (calls, Ok("ready"))
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ready");
        assert_eq!(calls, 3);
        assert_eq!(proxy.try_count(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_aborts_immediately() {
        let mut proxy =
            RetryProxy::new(5, retryable()).with_backoff_base(Duration::from_millis(1));
        let (calls, result) = proxy
            .call(0_u32, |calls| async move {
                (calls + 1, Err::<(), _>(Error::query("syntax error")))
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Query);
        assert_eq!(calls, 1);
        assert_eq!(proxy.try_count(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let mut proxy =
            RetryProxy::new(3, retryable()).with_backoff_base(Duration::from_millis(1));
        let (calls, result) = proxy
            .call(0_u32, |calls| async move {
                (calls + 1, Err::<(), _>(Error::driver("gone away")))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
        assert_eq!(calls, 3);
        assert_eq!(proxy.try_count(), 3);
    }
}
