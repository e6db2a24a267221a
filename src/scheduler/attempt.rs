//! Per-tick records and loop state.

use chrono::{DateTime, Local};

/// Why a tick did no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The resource gate reported memory or CPU pressure.
    Throttled,
    /// The previous capture attempt was too recent.
    TooSoon,
}

/// Which stage of a tick failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Capture,
    Encode,
    Persist,
    /// Transport failure during upload.
    Transient,
    /// The remote end answered with a non-2xx status.
    Rejected { status: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Skipped(SkipReason),
    Delivered,
    Failed(FailureKind),
}

/// Record of one tick. Returned to the caller, never persisted.
#[derive(Debug, Clone)]
pub struct CaptureAttempt {
    pub at: DateTime<Local>,
    pub outcome: AttemptOutcome,
    /// Encoded payload size, when the tick got that far.
    pub size_bytes: Option<usize>,
}

impl CaptureAttempt {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Failed(_))
    }
}

/// Consecutive failed ticks. Skipped ticks leave it untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureStreak(u32);

impl FailureStreak {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn record_failure(&mut self) -> u32 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Loop lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopLifecycle {
    Running,
    /// Cancellation observed; the in-flight tick finishes first.
    ShuttingDown,
    Stopped,
}

/// Stage of the tick in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Capturing,
    Encoding,
    Delivering,
    CleaningUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The failure streak reached the configured threshold.
    HardStop,
    /// The shutdown token was cancelled.
    Shutdown,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub ticks: u32,
    pub delivered: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl RunSummary {
    pub(crate) fn new() -> Self {
        Self {
            reason: StopReason::Shutdown,
            ticks: 0,
            delivered: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub(crate) fn record(&mut self, attempt: &CaptureAttempt) {
        self.ticks += 1;
        match attempt.outcome {
            AttemptOutcome::Delivered => self.delivered += 1,
            AttemptOutcome::Failed(_) => self.failed += 1,
            AttemptOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}
