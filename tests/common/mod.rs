//! Common test utilities for the relay integration tests.
//!
//! Every mock shares its recorded state through `Arc<Mutex<..>>` so a test
//! can inspect it after handing the mock to the scheduler.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use screenshot_relay::config::RelayConfig;
use screenshot_relay::{
    ArtifactHandle, ArtifactStore, DeliveryChannel, DeliveryOutcome, EncodedImage, FrameSource,
    RawFrame, RelayError, RelayResult, ResourceSampler,
};
use tokio_util::sync::CancellationToken;

/// Valid configuration with a fixed 10 s base delay.
pub fn test_config() -> RelayConfig {
    RelayConfig {
        webhook_url: Some("http://127.0.0.1:9/hook".to_string()),
        min_interval: 10,
        max_interval: 10,
        ..RelayConfig::default()
    }
}

/// Frame source that returns small solid frames, or fails.
#[derive(Clone, Default)]
pub struct MockFrameSource {
    pub fail: bool,
    pub calls: Arc<Mutex<u32>>,
}

impl MockFrameSource {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl FrameSource for MockFrameSource {
    fn capture(&mut self) -> RelayResult<RawFrame> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(RelayError::frame_capture("display unavailable"));
        }
        Ok(RawFrame::solid_rgb(64, 48, [30, 60, 90]))
    }
}

/// One recorded upload.
#[derive(Debug, Clone)]
pub struct SentPayload {
    pub filename: String,
    pub size_bytes: usize,
}

/// Delivery channel replaying scripted outcomes, then a default.
#[derive(Clone)]
pub struct ScriptedDelivery {
    script: Arc<Mutex<VecDeque<DeliveryOutcome>>>,
    fallback: DeliveryOutcome,
    pub sent: Arc<Mutex<Vec<SentPayload>>>,
    cancel_on_send: Option<CancellationToken>,
}

impl ScriptedDelivery {
    pub fn always(outcome: DeliveryOutcome) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: outcome,
            sent: Arc::new(Mutex::new(Vec::new())),
            cancel_on_send: None,
        }
    }

    pub fn succeeding() -> Self {
        Self::always(DeliveryOutcome::Success { status: 200 })
    }

    pub fn transient() -> Self {
        Self::always(DeliveryOutcome::TransientFailure {
            reason: "connection reset".to_string(),
        })
    }

    /// Play `outcomes` in order before falling back to success.
    pub fn scripted(outcomes: Vec<DeliveryOutcome>) -> Self {
        let delivery = Self::succeeding();
        delivery.script.lock().unwrap().extend(outcomes);
        delivery
    }

    /// Cancel `token` from inside every send, as a signal arriving mid-upload.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_send = Some(token);
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryChannel for ScriptedDelivery {
    async fn send(&self, payload: EncodedImage, filename: &str) -> DeliveryOutcome {
        self.sent.lock().unwrap().push(SentPayload {
            filename: filename.to_string(),
            size_bytes: payload.len(),
        });
        if let Some(token) = &self.cancel_on_send {
            token.cancel();
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// In-memory artifact store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub fail_persist: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl ArtifactStore for MemoryStore {
    fn persist(&mut self, name: &str, bytes: &[u8]) -> RelayResult<ArtifactHandle> {
        if self.fail_persist {
            return Err(RelayError::io(
                "persist artifact",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(ArtifactHandle::new(name))
    }

    fn delete(&mut self, handle: &ArtifactHandle) -> RelayResult<()> {
        self.files.lock().unwrap().remove(&handle.file_name());
        Ok(())
    }
}

/// Sampler with fixed readings.
#[derive(Clone, Copy)]
pub struct FixedSampler {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl FixedSampler {
    pub fn idle() -> Self {
        Self {
            memory_mb: 50.0,
            cpu_percent: 1.0,
        }
    }

    pub fn under_pressure() -> Self {
        Self {
            memory_mb: 4096.0,
            cpu_percent: 1.0,
        }
    }
}

impl ResourceSampler for FixedSampler {
    fn memory_used_mb(&mut self) -> RelayResult<f64> {
        Ok(self.memory_mb)
    }

    fn cpu_percent(&mut self) -> RelayResult<f64> {
        Ok(self.cpu_percent)
    }
}
