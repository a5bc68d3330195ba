//! Retry with exponential backoff for gateway HTTP calls.
//!
//! Only connection-level failures (refused, reset) are retried. A client
//! timeout is returned at once: the per-request timeout already spends the
//! caller's whole deadline, and a timed-out submit may still commit. Any HTTP
//! response, whatever its status, is returned to the caller as-is.

use std::time::Duration;

/// Retry attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Send a request, retrying connection failures with backoff.
///
/// `f` is called up to `MAX_RETRIES + 1` times, and once only when the
/// attempt times out.
pub(crate) async fn retry_send<F, Fut>(
    function: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_timeout() => {
                tracing::warn!(function, attempt = attempt + 1, "ledger gateway request timed out: {e}");
                return Err(e);
            }
            Err(e) => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    function,
                    attempt = attempt + 1,
                    max_retries = MAX_RETRIES,
                    "ledger gateway request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}
