use crate::driver::traits::BrowserDriver;
use crate::parser::types::{Locator, SelectorStrategy};
use anyhow::Result;
use std::time::{Duration, Instant};

/// Fixed visibility polling interval
pub const POLL_INTERVAL_MS: u64 = 250;

/// Outcome of resolving a selector strategy. Absence is a value, not an
/// error; the caller decides whether it is fatal.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found {
        locator: Locator,
        candidate_index: usize,
    },
    NotFound,
}

/// Try each candidate of the strategy in declared order, polling visibility
/// until `timeout_ms` elapses. The first visible match wins; when several
/// candidates are visible in the same poll cycle the earlier-declared one is
/// preferred. Read-only: no DOM interaction beyond visibility queries.
pub async fn resolve(
    driver: &dyn BrowserDriver,
    strategy: &SelectorStrategy,
    timeout_ms: u64,
) -> Result<Resolution> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        for (candidate_index, candidate) in strategy.candidates.iter().enumerate() {
            if driver.is_visible(candidate).await? {
                return Ok(Resolution::Found {
                    locator: candidate.clone(),
                    candidate_index,
                });
            }
        }

        let now = Instant::now();
        if now >= deadline {
            log::debug!("no candidate matched within {}ms: {}", timeout_ms, strategy);
            return Ok(Resolution::NotFound);
        }

        let remaining = deadline - now;
        tokio::time::sleep(remaining.min(Duration::from_millis(POLL_INTERVAL_MS))).await;
    }
}
