use crate::error::{GardenCalError, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Attempts and exponential backoff for one HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Delay before the retry that follows `attempt` (1-based), doubling each time.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Server-side failures and rate limiting are worth another attempt;
/// other client errors are not.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// GET `url`, retrying transport errors and retryable statuses.
pub async fn get_with_retry(
    client: &reqwest::Client,
    url: &str,
    policy: RetryPolicy,
    source: &str,
) -> Result<reqwest::Response> {
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) {
                    let body = response.text().await.unwrap_or_default();
                    return Err(GardenCalError::DataSourceUnavailable(format!(
                        "{} returned {}: {}",
                        source, status, body
                    )));
                }
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    %status,
                    source,
                    "Bad response status"
                );
                last_error = format!("status {}", status);
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    source,
                    "Request failed"
                );
                last_error = e.to_string();
            }
        }

        if attempt < policy.max_attempts {
            let delay = policy.backoff_after(attempt);
            info!(delay_ms = delay.as_millis() as u64, source, "Sleeping before retry");
            sleep(delay).await;
        }
    }

    Err(GardenCalError::DataSourceUnavailable(format!(
        "{}: all {} attempts failed ({})",
        source, policy.max_attempts, last_error
    )))
}
