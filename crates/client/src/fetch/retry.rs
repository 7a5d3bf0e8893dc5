//! Bounded retry with exponential backoff.
//!
//! - 4xx: returned at once; the request itself is wrong.
//! - 5xx, timeouts, transport errors: retried up to `max_retries` times.
//! - Anything else: returned at once.
//!
//! The wait before retry `i` (1-based) is `base_delay * 2^(i-1)`.

use std::time::Duration;

use revcache_core::{AppConfig, Error, StoredResponse};

use super::{Fetch, Request};

/// Retry bound and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(1000) }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Total time spent waiting if every retry is used.
    pub fn worst_case_wait(&self) -> Duration {
        (1..=self.max_retries).map(|i| self.delay_for(i)).sum()
    }
}

/// Fetch `request`, retrying transient failures per `policy`.
///
/// # Errors
///
/// Returns non-transient fetch errors unchanged, and
/// `Error::RetriesExhausted` wrapping the last failure once every retry has
/// failed. A final 5xx is reported as `Error::HttpError("status 5xx")`.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetch, request: &Request, policy: RetryPolicy,
) -> Result<StoredResponse, Error> {
    let mut attempt: u32 = 0;

    loop {
        let failure = match fetcher.fetch(request).await {
            Ok(response) if response.is_server_error() => Error::HttpError(format!("status {}", response.status)),
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() => e,
            Err(e) => return Err(e),
        };

        if attempt >= policy.max_retries {
            return Err(Error::RetriesExhausted {
                url: request.url.clone(),
                retries: policy.max_retries,
                source: Box::new(failure),
            });
        }

        attempt += 1;
        let delay = policy.delay_for(attempt);
        tracing::warn!(
            url = %request.url,
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "retrying fetch"
        );
        tokio::time::sleep(delay).await;
    }
}
