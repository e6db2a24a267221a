//! Multipart webhook upload through reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::delivery::{DeliveryChannel, DeliveryOutcome};
use crate::error::{RelayError, RelayResult};
use crate::processing::EncodedImage;

/// Multipart field name the webhook expects the file under.
pub const FILE_FIELD: &str = "file";

const IMAGE_MIME: &str = "image/jpeg";

/// Longest response body carried in a rejection.
const MAX_BODY_CHARS: usize = 500;

/// HTTP multipart uploader.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookClient {
    /// Client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shotrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayError::external("reqwest", e).with_operation("build HTTP client"))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// Client for the configured webhook, with the low-power-aware timeout.
    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        let url = config
            .webhook_url
            .as_deref()
            .ok_or_else(|| RelayError::config("webhook_url", "", "webhook URL must be provided"))?;
        Self::new(url, config.delivery_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl DeliveryChannel for WebhookClient {
    async fn send(&self, payload: EncodedImage, filename: &str) -> DeliveryOutcome {
        let size_bytes = payload.len();
        let part = match Part::bytes(payload.bytes)
            .file_name(filename.to_string())
            .mime_str(IMAGE_MIME)
        {
            Ok(part) => part,
            Err(e) => {
                return DeliveryOutcome::TransientFailure {
                    reason: format!("cannot build multipart body: {}", e),
                };
            }
        };
        let form = Form::new().part(FILE_FIELD, part);

        debug!(filename, size_bytes, "Uploading payload");
        let response = match self.client.post(&self.url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                warn!(filename, %reason, "Upload failed");
                return DeliveryOutcome::TransientFailure { reason };
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(filename, size_bytes, status = status.as_u16(), "Upload delivered");
            return DeliveryOutcome::Success {
                status: status.as_u16(),
            };
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_BODY_CHARS)
            .collect();
        warn!(filename, status = status.as_u16(), %body, "Upload rejected");
        DeliveryOutcome::RemoteRejected {
            status: status.as_u16(),
            body,
        }
    }
}
