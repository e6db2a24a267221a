use std::time::Duration;

use chrono::Local;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capture::FrameSource;
use crate::config::RelayConfig;
use crate::delivery::{DeliveryChannel, DeliveryOutcome, WebhookClient};
use crate::error::{RelayError, RelayResult};
use crate::processing::ImageBudgeter;
use crate::resource::{ProcfsSampler, ResourceGate, ResourceSampler};
use crate::scheduler::attempt::{
    AttemptOutcome, CaptureAttempt, FailureKind, FailureStreak, LoopLifecycle, RunSummary,
    SkipReason, StopReason, TickPhase,
};
use crate::scheduler::backoff::DelayPolicy;
use crate::storage::{ArtifactStore, DirArtifactStore, artifact_name};

/// Drives capture, encoding and delivery until shutdown or hard stop.
///
/// All collaborators are owned exclusively; the loop runs on a single task
/// and holds no locks.
pub struct CaptureScheduler {
    frame_source: Box<dyn FrameSource>,
    budgeter: ImageBudgeter,
    gate: ResourceGate,
    delivery: Box<dyn DeliveryChannel>,
    store: Box<dyn ArtifactStore>,
    delay: DelayPolicy,
    streak: FailureStreak,
    max_consecutive_failures: u32,
    min_spacing: Duration,
    delete_after_send: bool,
    last_attempt: Option<Instant>,
    lifecycle: LoopLifecycle,
    phase: TickPhase,
    shutdown: CancellationToken,
}

impl CaptureScheduler {
    /// Start building a scheduler from a validated configuration.
    pub fn builder(config: &RelayConfig) -> CaptureSchedulerBuilder<'_> {
        CaptureSchedulerBuilder::new(config)
    }

    pub fn failure_streak(&self) -> u32 {
        self.streak.get()
    }

    pub fn lifecycle(&self) -> LoopLifecycle {
        self.lifecycle
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run one capture cycle. Never fails: every problem becomes an
    /// [`AttemptOutcome`].
    pub async fn tick(&mut self) -> CaptureAttempt {
        if self.gate.should_throttle() {
            info!("Resource limits exceeded, skipping capture");
            return self.finish(AttemptOutcome::Skipped(SkipReason::Throttled), None);
        }

        let now = Instant::now();
        if let Some(last) = self.last_attempt {
            let since = now.duration_since(last);
            if since < self.min_spacing {
                debug!(since_secs = since.as_secs(), "Previous capture too recent, skipping");
                return self.finish(AttemptOutcome::Skipped(SkipReason::TooSoon), None);
            }
        }
        self.last_attempt = Some(now);

        self.phase = TickPhase::Capturing;
        let frame = match self.frame_source.capture() {
            Ok(frame) => frame,
            Err(e) => return self.fail(FailureKind::Capture, &e, None),
        };

        self.phase = TickPhase::Encoding;
        let image = match self.budgeter.fit(frame) {
            Ok(image) => image,
            Err(e) => return self.fail(FailureKind::Encode, &e, None),
        };
        let size_bytes = image.len();
        debug!(
            size_bytes,
            width = image.width,
            height = image.height,
            quality = image.quality,
            over_budget = image.over_budget,
            "Frame encoded"
        );

        let handle = match self.store.persist(&artifact_name(&Local::now()), &image.bytes) {
            Ok(handle) => handle,
            Err(e) => return self.fail(FailureKind::Persist, &e, Some(size_bytes)),
        };

        self.phase = TickPhase::Delivering;
        let outcome = self.delivery.send(image, &handle.file_name()).await;

        self.phase = TickPhase::CleaningUp;
        match outcome {
            DeliveryOutcome::Success { .. } => {
                self.streak.reset();
                if self.delete_after_send {
                    if let Err(e) = self.store.delete(&handle) {
                        warn!(error = %e, "Failed to delete delivered artifact");
                    }
                }
                info!(file = %handle.file_name(), size_bytes, "Screenshot delivered");
                self.finish(AttemptOutcome::Delivered, Some(size_bytes))
            }
            DeliveryOutcome::TransientFailure { reason } => {
                let streak = self.streak.record_failure();
                warn!(
                    %reason,
                    streak,
                    path = %handle.path().display(),
                    "Delivery failed, artifact kept"
                );
                self.finish(AttemptOutcome::Failed(FailureKind::Transient), Some(size_bytes))
            }
            DeliveryOutcome::RemoteRejected { status, .. } => {
                let streak = self.streak.record_failure();
                warn!(
                    status,
                    streak,
                    path = %handle.path().display(),
                    "Delivery rejected, artifact kept"
                );
                self.finish(
                    AttemptOutcome::Failed(FailureKind::Rejected { status }),
                    Some(size_bytes),
                )
            }
        }
    }

    fn fail(
        &mut self,
        kind: FailureKind,
        error: &RelayError,
        size_bytes: Option<usize>,
    ) -> CaptureAttempt {
        let streak = self.streak.record_failure();
        warn!(error = %error, category = error.category(), streak, "Capture cycle failed");
        self.finish(AttemptOutcome::Failed(kind), size_bytes)
    }

    fn finish(&mut self, outcome: AttemptOutcome, size_bytes: Option<usize>) -> CaptureAttempt {
        self.phase = TickPhase::Idle;
        CaptureAttempt {
            at: Local::now(),
            outcome,
            size_bytes,
        }
    }

    /// Delay before the next tick under the current streak and pressure.
    ///
    /// Pressure is the gate's last verdict and is not re-polled here, so it
    /// can be up to one poll interval old.
    pub fn next_delay(&mut self) -> Duration {
        self.delay.next_delay(self.streak.get(), self.gate.is_throttled())
    }

    /// Loop until the shutdown token is cancelled or the failure streak
    /// reaches the hard-stop threshold.
    ///
    /// Cancellation interrupts the inter-tick sleep immediately; a tick in
    /// progress always runs to completion.
    pub async fn run(&mut self) -> RunSummary {
        let shutdown = self.shutdown.clone();
        let mut summary = RunSummary::new();
        self.lifecycle = LoopLifecycle::Running;
        info!(
            max_consecutive_failures = self.max_consecutive_failures,
            "Capture loop started"
        );

        summary.reason = self.drive(&shutdown, &mut summary).await;

        self.lifecycle = LoopLifecycle::Stopped;
        info!(
            reason = ?summary.reason,
            ticks = summary.ticks,
            delivered = summary.delivered,
            failed = summary.failed,
            skipped = summary.skipped,
            "Capture loop stopped"
        );
        summary
    }

    /// Tick and sleep until a stop condition. Leaves the lifecycle at
    /// `ShuttingDown` when the stop came from cancellation.
    async fn drive(
        &mut self,
        shutdown: &CancellationToken,
        summary: &mut RunSummary,
    ) -> StopReason {
        loop {
            if shutdown.is_cancelled() {
                self.lifecycle = LoopLifecycle::ShuttingDown;
                return StopReason::Shutdown;
            }

            let attempt = self.tick().await;
            summary.record(&attempt);

            if self.streak.get() >= self.max_consecutive_failures {
                error!(
                    failures = self.streak.get(),
                    "Too many consecutive failures, stopping"
                );
                return StopReason::HardStop;
            }
            if shutdown.is_cancelled() {
                self.lifecycle = LoopLifecycle::ShuttingDown;
                return StopReason::Shutdown;
            }

            let delay = self.next_delay();
            info!(delay_secs = delay.as_secs(), "Next capture scheduled");

            let cancelled = tokio::select! {
                biased;
                _ = shutdown.cancelled() => true,
                _ = sleep(delay) => false,
            };
            if cancelled {
                self.lifecycle = LoopLifecycle::ShuttingDown;
                return StopReason::Shutdown;
            }
        }
    }
}

/// Builder for [`CaptureScheduler`].
///
/// Collaborators left unset fall back to the production implementations:
/// screen capture (with the `screen-capture` feature), the configured
/// webhook, the screenshot directory and procfs sampling.
pub struct CaptureSchedulerBuilder<'a> {
    config: &'a RelayConfig,
    frame_source: Option<Box<dyn FrameSource>>,
    delivery: Option<Box<dyn DeliveryChannel>>,
    store: Option<Box<dyn ArtifactStore>>,
    sampler: Option<Box<dyn ResourceSampler>>,
    rng_seed: Option<u64>,
    shutdown: Option<CancellationToken>,
}

impl<'a> CaptureSchedulerBuilder<'a> {
    pub fn new(config: &'a RelayConfig) -> Self {
        Self {
            config,
            frame_source: None,
            delivery: None,
            store: None,
            sampler: None,
            rng_seed: None,
            shutdown: None,
        }
    }

    pub fn with_frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.frame_source = Some(Box::new(source));
        self
    }

    pub fn with_delivery(mut self, delivery: impl DeliveryChannel + 'static) -> Self {
        self.delivery = Some(Box::new(delivery));
        self
    }

    pub fn with_artifact_store(mut self, store: impl ArtifactStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_sampler(mut self, sampler: impl ResourceSampler + 'static) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    /// Seed the base-delay generator.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Validate the configuration and assemble the scheduler.
    pub fn build(self) -> RelayResult<CaptureScheduler> {
        let config = self.config;
        config.validate()?;

        let frame_source = match self.frame_source {
            Some(source) => source,
            None => default_frame_source()?,
        };
        let delivery: Box<dyn DeliveryChannel> = match self.delivery {
            Some(delivery) => delivery,
            None => Box::new(WebhookClient::from_config(config)?),
        };
        let store: Box<dyn ArtifactStore> = match self.store {
            Some(store) => store,
            None => Box::new(DirArtifactStore::new(&config.screenshot_dir)?),
        };
        let sampler = self
            .sampler
            .unwrap_or_else(|| Box::new(ProcfsSampler::new()));

        let delay = match self.rng_seed {
            Some(seed) => DelayPolicy::seeded(config.interval_range(), config.low_power_mode, seed),
            None => DelayPolicy::new(config.interval_range(), config.low_power_mode),
        };

        Ok(CaptureScheduler {
            frame_source,
            budgeter: ImageBudgeter::from_config(config),
            gate: ResourceGate::new(sampler, config.resource_limits()),
            delivery,
            store,
            delay,
            streak: FailureStreak::default(),
            max_consecutive_failures: config.max_consecutive_failures,
            min_spacing: Duration::from_secs(config.min_capture_spacing_secs),
            delete_after_send: config.delete_after_send,
            last_attempt: None,
            lifecycle: LoopLifecycle::Running,
            phase: TickPhase::Idle,
            shutdown: self.shutdown.unwrap_or_else(CancellationToken::new),
        })
    }
}

#[cfg(feature = "screen-capture")]
fn default_frame_source() -> RelayResult<Box<dyn FrameSource>> {
    Ok(Box::new(crate::capture::scrap::ScrapFrameSource::new()?))
}

#[cfg(not(feature = "screen-capture"))]
fn default_frame_source() -> RelayResult<Box<dyn FrameSource>> {
    Err(RelayError::frame_capture("built without screen capture support")
        .with_recovery_suggestion("rebuild with the `screen-capture` feature"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawFrame;
    use crate::processing::EncodedImage;
    use crate::storage::ArtifactHandle;
    use async_trait::async_trait;

    struct SolidFrames;

    impl FrameSource for SolidFrames {
        fn capture(&mut self) -> RelayResult<RawFrame> {
            Ok(RawFrame::solid_rgb(16, 16, [10, 20, 30]))
        }
    }

    struct Accepting;

    #[async_trait]
    impl DeliveryChannel for Accepting {
        async fn send(&self, _payload: EncodedImage, _filename: &str) -> DeliveryOutcome {
            DeliveryOutcome::Success { status: 200 }
        }
    }

    struct Discarding;

    impl ArtifactStore for Discarding {
        fn persist(&mut self, name: &str, _bytes: &[u8]) -> RelayResult<ArtifactHandle> {
            Ok(ArtifactHandle::new(name))
        }

        fn delete(&mut self, _handle: &ArtifactHandle) -> RelayResult<()> {
            Ok(())
        }
    }

    struct Idle;

    impl ResourceSampler for Idle {
        fn memory_used_mb(&mut self) -> RelayResult<f64> {
            Ok(10.0)
        }

        fn cpu_percent(&mut self) -> RelayResult<f64> {
            Ok(1.0)
        }
    }

    fn scheduler() -> CaptureScheduler {
        let config = RelayConfig {
            webhook_url: Some("http://127.0.0.1:9/hook".to_string()),
            min_interval: 60,
            max_interval: 60,
            ..RelayConfig::default()
        };
        CaptureScheduler::builder(&config)
            .with_frame_source(SolidFrames)
            .with_delivery(Accepting)
            .with_artifact_store(Discarding)
            .with_sampler(Idle)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick_enters_shutting_down() {
        let mut s = scheduler();
        let token = s.shutdown_token();
        token.cancel();

        let mut summary = RunSummary::new();
        let reason = s.drive(&token, &mut summary).await;

        assert_eq!(reason, StopReason::Shutdown);
        assert_eq!(summary.ticks, 0);
        assert_eq!(s.lifecycle(), LoopLifecycle::ShuttingDown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_enters_shutting_down() {
        let mut s = scheduler();
        let token = s.shutdown_token();
        let canceller = token.clone();

        let mut summary = RunSummary::new();
        let (reason, ()) = tokio::join!(s.drive(&token, &mut summary), async move {
            sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        assert_eq!(reason, StopReason::Shutdown);
        assert_eq!(summary.ticks, 1);
        assert_eq!(s.lifecycle(), LoopLifecycle::ShuttingDown);
    }
}
