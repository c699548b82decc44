//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Growth stops after this many doublings.
pub const MAX_DOUBLINGS: u32 = 4;

/// Delay before retry number `attempt` (0-based): `base << min(attempt, 4)`
/// plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    let base_ms = base.as_millis().min(u64::MAX as u128) as u64;
    let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(MAX_DOUBLINGS));

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}
