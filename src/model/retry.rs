//! Bounded retry for hosted-model calls
//!
//! Every outbound call goes through the same decorator instead of ad hoc
//! try/except at each site. After the last attempt the final error is
//! surfaced to the caller.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

pub async fn with_retries<T, F, Fut>(attempts: u32, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                last_err = Some(e);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{}: no attempts were made", what)))
}
