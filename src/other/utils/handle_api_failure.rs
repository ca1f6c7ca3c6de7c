use std::{cmp, time::Duration};

use tokio::time::sleep;
use tracing::{event, Level};

static INCREMENTS_LIMIT: u64 = 30; // 30 Seconds
static MAX_FAILURES: u64 = 10;

/// Backs off after a failed read before the caller retries it, sleeping
/// one more second per consecutive failure (capped at `INCREMENTS_LIMIT`).
///
/// # Returns
/// Whether the caller should give up instead of retrying.
pub async fn handle_api_failure(failures_in_a_row: &mut u64) -> bool {
  if *failures_in_a_row >= MAX_FAILURES {
    event!(Level::ERROR, "Maximum retries reached! Giving up...");
    return true;
  }

  *failures_in_a_row += 1;
  sleep(Duration::from_secs(cmp::min(
    *failures_in_a_row,
    INCREMENTS_LIMIT,
  )))
  .await;

  false
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn gives_up_after_max_failures() {
    let mut failures = MAX_FAILURES;
    assert!(handle_api_failure(&mut failures).await);
    assert_eq!(failures, MAX_FAILURES);

    let mut failures = 0;
    assert!(!handle_api_failure(&mut failures).await);
    assert_eq!(failures, 1);
  }
}
