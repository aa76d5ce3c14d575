//! Retry delays for outbound calls: doubling per attempt, capped, with jitter.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Upper bound on the jitter added to a delay, as a fraction of it.
const JITTER_RATIO: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
        }
    }

    /// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`,
    /// capped at `max`, plus up to 20% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let delay = self.base.saturating_mul(1 << doublings).min(self.max);
        delay + jitter(delay / JITTER_RATIO)
    }

    /// Same as [`Backoff::delay`] but never shorter than an upstream
    /// `Retry-After` hint. The hint itself is capped at `max`.
    pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let delay = self.delay(attempt);
        match hint {
            Some(hint) => delay.max(hint.min(self.max)),
            None => delay,
        }
    }
}

fn jitter(spread: Duration) -> Duration {
    let spread_ms = spread.as_millis() as u64;
    if spread_ms == 0 {
        return Duration::ZERO;
    }
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    Duration::from_millis(seed % (spread_ms + 1))
}
