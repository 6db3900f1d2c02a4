//! Paced, throttle-aware CMS client.

use super::{ApiError, ApiRequest, ApiResponse, Sleeper, TokioSleeper, Transport};
use catalog_sync_engine::RetryPolicy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Wraps a [`Transport`] with a fixed inter-request delay and bounded
/// exponential backoff on HTTP 429.
///
/// Only throttling is retried. Timeouts, network errors and every other
/// non-2xx status go straight back to the caller: a timed-out write may have
/// landed, and the signal that started the run will be redelivered anyway.
#[derive(Debug, Clone)]
pub struct RateLimitedClient<T, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl<T: Transport, S: Sleeper> RateLimitedClient<T, S> {
    pub fn new(transport: T, sleeper: S, policy: RetryPolicy, request_delay: Duration) -> Self {
        Self {
            transport,
            sleeper,
            policy,
            request_delay,
        }
    }

    /// Send `request`, pacing every attempt and retrying while throttled.
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut attempt: u32 = 0;
        loop {
            if !self.request_delay.is_zero() {
                self.sleeper.sleep(self.request_delay).await;
            }

            let response = self.transport.send(request).await?;
            if response.is_success() {
                if attempt > 0 {
                    debug!(
                        method = %request.method,
                        path = %request.path,
                        attempts = attempt + 1,
                        "CMS call succeeded after throttling"
                    );
                }
                return Ok(response);
            }

            if !self.policy.should_retry(attempt, response.status) {
                if RetryPolicy::is_retryable(response.status) {
                    warn!(
                        method = %request.method,
                        path = %request.path,
                        attempts = attempt + 1,
                        "CMS still throttling after max attempts"
                    );
                }
                return Err(ApiError::Http {
                    status: response.status,
                    body: response.body,
                });
            }

            let delay = self.policy.delay_for(attempt, response.retry_after);
            warn!(
                method = %request.method,
                path = %request.path,
                attempt = attempt + 1,
                max_attempts = self.policy.max_attempts,
                delay_secs = delay.as_secs_f64(),
                "CMS throttled, backing off"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// [`call`](Self::call) and decode the body into `R`.
    pub async fn call_json<R: DeserializeOwned>(&self, request: &ApiRequest) -> Result<R, ApiError> {
        let response = self.call(request).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            ApiError::Parse(format!(
                "{} {}: {e}; body: {}",
                request.method, request.path, response.body
            ))
        })
    }
}
