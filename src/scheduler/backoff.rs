//! Inter-tick delay computation.
//!
//! `delay = base × min(2^streak, 8) × (2 if throttled) × (1.5 if low power)`,
//! with `base` drawn uniformly from the configured interval range and every
//! step truncated to whole seconds.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound of the streak multiplier.
pub const MAX_BACKOFF_MULTIPLIER: u64 = 8;

/// `min(2^streak, 8)`; 1 for an empty streak.
pub fn backoff_multiplier(streak: u32) -> u64 {
    1u64.checked_shl(streak)
        .unwrap_or(u64::MAX)
        .min(MAX_BACKOFF_MULTIPLIER)
}

/// Apply the streak, throttle and low-power multipliers to `base_secs`.
pub fn compute_delay(base_secs: u64, streak: u32, throttled: bool, low_power: bool) -> Duration {
    let mut secs = base_secs.saturating_mul(backoff_multiplier(streak));
    if throttled {
        secs = secs.saturating_mul(2);
    }
    if low_power {
        secs = secs.saturating_mul(3) / 2;
    }
    Duration::from_secs(secs)
}

/// Draws base delays and applies [`compute_delay`].
#[derive(Debug, Clone)]
pub struct DelayPolicy {
    range: RangeInclusive<u64>,
    low_power: bool,
    rng: StdRng,
}

impl DelayPolicy {
    pub fn new(range: RangeInclusive<u64>, low_power: bool) -> Self {
        Self {
            range,
            low_power,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Deterministic base delays.
    pub fn seeded(range: RangeInclusive<u64>, low_power: bool, seed: u64) -> Self {
        Self {
            range,
            low_power,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_delay(&mut self, streak: u32, throttled: bool) -> Duration {
        let base = self.rng.random_range(self.range.clone());
        compute_delay(base, streak, throttled, self.low_power)
    }
}
