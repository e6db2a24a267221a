//! Rate-limited throttle decision.
//!
//! The sampler is queried at most once per poll interval. Any call inside
//! the interval returns the verdict of the last poll.

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::resource::{ResourceLimits, ResourceSampler};

/// Verdict of the most recent poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePressureState {
    pub checked_at: Instant,
    pub throttled: bool,
}

/// Decides whether the relay should skip work because the process is under
/// memory or CPU pressure.
pub struct ResourceGate {
    sampler: Box<dyn ResourceSampler>,
    limits: ResourceLimits,
    state: Option<ResourcePressureState>,
}

impl ResourceGate {
    pub fn new(sampler: Box<dyn ResourceSampler>, limits: ResourceLimits) -> Self {
        Self {
            sampler,
            limits,
            state: None,
        }
    }

    /// State of the last poll, if any.
    pub fn state(&self) -> Option<ResourcePressureState> {
        self.state
    }

    /// Last verdict without polling. False before the first poll.
    pub fn is_throttled(&self) -> bool {
        self.state.is_some_and(|s| s.throttled)
    }

    /// Throttle verdict, polling the sampler only when the cached one is
    /// older than the poll interval.
    pub fn should_throttle(&mut self) -> bool {
        if !self.limits.enabled {
            return false;
        }

        let now = Instant::now();
        if let Some(state) = self.state {
            if now.duration_since(state.checked_at) < self.limits.poll_interval {
                return state.throttled;
            }
        }

        let throttled = self.poll();
        self.state = Some(ResourcePressureState {
            checked_at: now,
            throttled,
        });
        throttled
    }

    fn poll(&mut self) -> bool {
        let mut throttled = false;

        match self.sampler.memory_used_mb() {
            Ok(memory_mb) if memory_mb > self.limits.max_memory_mb => {
                warn!(
                    memory_mb,
                    limit_mb = self.limits.max_memory_mb,
                    "Memory usage above limit"
                );
                throttled = true;
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Memory sample unavailable"),
        }

        match self.sampler.cpu_percent() {
            Ok(cpu) if cpu > self.limits.max_cpu_percent => {
                warn!(
                    cpu_percent = cpu,
                    limit_percent = self.limits.max_cpu_percent,
                    "CPU usage above limit"
                );
                throttled = true;
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "CPU sample unavailable"),
        }

        throttled
    }
}
