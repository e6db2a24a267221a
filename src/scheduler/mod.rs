//! # Scheduler Module
//!
//! The capture loop: one tick at a time, each tick gated on resource
//! pressure and spacing, followed by an interruptible backoff sleep.
//!
//! ```text
//! tick ─▶ gate ─▶ capture ─▶ fit ─▶ persist ─▶ send ─▶ streak ─▶ delay ─▶ sleep
//!          │                                                              │
//!          └─ skip ──────────────────────────────────────────────────────▶┘
//! ```

pub mod attempt;
pub mod backoff;
pub mod scheduler;

pub use attempt::{
    AttemptOutcome, CaptureAttempt, FailureKind, FailureStreak, LoopLifecycle, RunSummary,
    SkipReason, StopReason, TickPhase,
};
pub use backoff::{DelayPolicy, MAX_BACKOFF_MULTIPLIER, backoff_multiplier, compute_delay};
pub use scheduler::{CaptureScheduler, CaptureSchedulerBuilder};
