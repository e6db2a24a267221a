//! # Delivery Module
//!
//! One upload attempt per call, classified into a [`DeliveryOutcome`].
//! Retrying is the scheduler's business, through its failure streak and
//! backoff.

pub mod webhook;

pub use webhook::WebhookClient;

use async_trait::async_trait;

use crate::processing::EncodedImage;

/// Result of a single upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The remote end accepted the payload (2xx).
    Success { status: u16 },
    /// Transport-level failure: timeout, refused connection, reset.
    TransientFailure { reason: String },
    /// The remote end answered with a non-2xx status.
    RemoteRejected { status: u16, body: String },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }
}

/// Sends an encoded payload to the remote endpoint.
///
/// The payload is taken by value; its buffer is released when the call
/// returns, whatever the outcome.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, payload: EncodedImage, filename: &str) -> DeliveryOutcome;
}

#[async_trait]
impl<D: DeliveryChannel + ?Sized> DeliveryChannel for Box<D> {
    async fn send(&self, payload: EncodedImage, filename: &str) -> DeliveryOutcome {
        (**self).send(payload, filename).await
    }
}
