//! Bounded retry with exponential backoff.
//!
//! Used for stage-completion writes to the upstream system. Simple fixed
//! policy: up to `max_retries` retries after the initial attempt, delay
//! doubling per attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Run `op` until it succeeds or the retry budget is spent.
///
/// The delay before retry N (zero-based) is `base_delay * 2^N`. Returns the
/// last error when all attempts fail.
pub async fn with_backoff<T, E, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                warn!(attempt = attempt + 1, error = %err, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
