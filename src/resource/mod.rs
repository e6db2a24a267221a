//! # Resource Module
//!
//! Process resource sampling and the throttle gate built on it.

pub mod gate;
pub mod procfs;

pub use gate::{ResourceGate, ResourcePressureState};
pub use procfs::ProcfsSampler;

use std::time::Duration;

use crate::error::RelayResult;

/// Reports the relay's own resource usage.
///
/// Either metric may fail with [`crate::error::RelayError::Sampler`] when the
/// platform offers no way to read it.
pub trait ResourceSampler {
    /// Resident memory of this process in MB.
    fn memory_used_mb(&mut self) -> RelayResult<f64>;

    /// CPU usage of this process in percent of one core since the previous call.
    fn cpu_percent(&mut self) -> RelayResult<f64>;
}

impl<S: ResourceSampler + ?Sized> ResourceSampler for Box<S> {
    fn memory_used_mb(&mut self) -> RelayResult<f64> {
        (**self).memory_used_mb()
    }

    fn cpu_percent(&mut self) -> RelayResult<f64> {
        (**self).cpu_percent()
    }
}

/// Ceilings and polling cadence for [`ResourceGate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimits {
    pub max_memory_mb: f64,
    pub max_cpu_percent: f64,
    /// When false the gate never samples and never throttles.
    pub enabled: bool,
    pub poll_interval: Duration,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_mb: 200.0,
            max_cpu_percent: 30.0,
            enabled: true,
            poll_interval: Duration::from_secs(30),
        }
    }
}
