//! # Screenshot Relay
//!
//! Periodically captures the screen, compresses the capture under an upload
//! ceiling, and posts it to a webhook. The loop adapts its pace: failures
//! back off exponentially, resource pressure skips ticks and slows the
//! schedule, and a run of consecutive failures stops it.
//!
//! ## Architecture
//!
//! - `config`: [`RelayConfig`], loaded from JSON plus environment overrides
//! - `capture`: the [`FrameSource`] seam and the scrap-backed screen grabber
//! - `processing`: [`ImageBudgeter`], fitting frames into a byte budget
//! - `resource`: process sampling and the rate-limited [`ResourceGate`]
//! - `delivery`: [`DeliveryChannel`] and the multipart [`WebhookClient`]
//! - `storage`: [`ArtifactStore`] for on-disk copies of each payload
//! - `scheduler`: [`CaptureScheduler`], the tick algorithm and backoff
//! - `logging`: stdout plus rotating file output through `tracing`
//!
//! ## Example
//!
//! ```rust,no_run
//! use screenshot_relay::{CaptureScheduler, RelayConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::load(Path::new("config.json"))?.config;
//! let mut scheduler = CaptureScheduler::builder(&config).build()?;
//!
//! let summary = scheduler.run().await;
//! println!("stopped after {} ticks: {:?}", summary.ticks, summary.reason);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod processing;
pub mod resource;
pub mod scheduler;
pub mod storage;

pub use capture::{FrameSource, PixelFormat, RawFrame};
pub use config::RelayConfig;
pub use delivery::{DeliveryChannel, DeliveryOutcome, WebhookClient};
pub use error::{RelayError, RelayResult};
pub use processing::{Budget, EncodedImage, ImageBudgeter};
pub use resource::{ResourceGate, ResourceLimits, ResourceSampler};
pub use scheduler::{
    AttemptOutcome, CaptureAttempt, CaptureScheduler, LoopLifecycle, RunSummary, StopReason,
};
pub use storage::{ArtifactHandle, ArtifactStore, DirArtifactStore};

/// File name used for `--test-webhook` uploads.
pub const TEST_IMAGE_NAME: &str = "test_screenshot.jpg";

/// Encode a 100×100 red image through `budgeter` and send it once.
pub async fn send_test_image<D>(
    delivery: &D,
    budgeter: &mut ImageBudgeter,
) -> RelayResult<DeliveryOutcome>
where
    D: DeliveryChannel + ?Sized,
{
    let image = budgeter.fit(RawFrame::solid_rgb(100, 100, [255, 0, 0]))?;
    Ok(delivery.send(image, TEST_IMAGE_NAME).await)
}
