use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry an external call with exponential backoff, per spec §5 "Timeouts"
/// and the `ExternalTransient` error class in §7. `is_retryable` decides
/// whether a given error is transient; permanent errors return immediately.
pub async fn with_backoff<T, E, F, Fut, R>(
    label: &str,
    max_attempts: u32,
    mut call: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                warn!(%label, attempt, ?backoff, "external call failed, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Default retry classification for `reqwest::Error`: timeouts and
/// connection failures are transient, everything else (decode errors,
/// status errors we construct ourselves) is not.
pub fn reqwest_is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
