//! Shared HTTP plumbing for the embedding, rerank and vector store clients.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → returned to the caller, no retry
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Build a client with the given request timeout.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send the request produced by `build`, retrying transient failures.
///
/// Returns the first response that is either successful or a non-retryable
/// client error; use [`error_for_status`] to turn the latter into an error.
/// `label` names the remote service in error messages.
pub async fn send_with_retry<F>(label: &str, max_retries: u32, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = retry_backoff(attempt);
            tracing::debug!(service = label, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if should_retry(status) {
                    let body_text = response.text().await.unwrap_or_default();
                    tracing::warn!(service = label, %status, attempt, "transient API error");
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        label,
                        status,
                        body_text
                    ));
                    continue;
                }
                return Ok(response);
            }
            Err(e) => {
                tracing::warn!(service = label, error = %e, attempt, "request failed");
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", label)))
}

/// Fail with the response body when `response` is not a success.
pub async fn error_for_status(label: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body_text = response.text().await.unwrap_or_default();
    bail!("{} API error {}: {}", label, status, body_text);
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}
