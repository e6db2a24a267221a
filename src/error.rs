//! # Error Handling
//!
//! Error types for the screenshot relay. Every fallible collaborator (frame
//! source, encoder, artifact store, resource sampler, configuration loader)
//! reports a [`RelayError`]. Delivery is deliberately absent: upload results are
//! classified into [`crate::delivery::DeliveryOutcome`] instead of errors, and
//! an oversized encode is reported through
//! [`crate::processing::EncodedImage::over_budget`].
//!
//! ## Classification
//!
//! - **Fatal**: configuration errors. They stop the process before the loop starts.
//! - **Per-tick**: everything else. The scheduler absorbs them into its failure
//!   streak and keeps running.
//!
//! ## Usage
//!
//! ```rust
//! use screenshot_relay::error::{RelayError, classify};
//!
//! let error = RelayError::config("min_interval", "3", "must be at least 10 seconds")
//!     .with_recovery_suggestion("Run with --create-config to create a sample configuration file");
//!
//! assert!(classify::is_fatal(&error));
//! assert_eq!(error.category(), "config");
//! ```

use std::{error::Error as StdError, fmt, path::PathBuf, time::SystemTime};

/// Metadata attached to every error.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            recovery_suggestion: None,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }
}

/// Base error type for the screenshot relay
#[derive(Debug)]
pub enum RelayError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Frame source could not produce a frame
    FrameCapture {
        reason: String,
        context: ErrorContext,
    },
    /// Resizing or encoding failed (not a size overage)
    Encode {
        stage: String,
        reason: String,
        context: ErrorContext,
    },
    /// Process introspection unavailable
    Sampler {
        metric: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<PathBuf>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl RelayError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a frame capture error
    pub fn frame_capture(reason: impl Into<String>) -> Self {
        Self::FrameCapture {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an encode error
    pub fn encode(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            stage: stage.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a sampler error
    pub fn sampler(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sampler {
            metric: metric.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.into()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Get the recovery suggestion, if any
    pub fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Sampler { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::Sampler { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::FrameCapture { .. } => "frame_capture",
            Self::Encode { .. } => "encode",
            Self::Sampler { .. } => "sampler",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            RelayError::FrameCapture { reason, .. } => {
                write!(f, "Frame capture failed: {}", reason)
            }
            RelayError::Encode { stage, reason, .. } => {
                write!(f, "Encoding failed during {}: {}", stage, reason)
            }
            RelayError::Sampler { metric, reason, .. } => {
                write!(f, "Resource sample '{}' unavailable: {}", metric, reason)
            }
            RelayError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation,
                        path.display(),
                        source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            RelayError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
        }
    }
}

impl StdError for RelayError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type RelayResult<T> = Result<T, RelayError>;

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error must stop the process
    pub fn is_fatal(error: &RelayError) -> bool {
        matches!(error, RelayError::Config { .. })
    }
}

impl From<std::io::Error> for RelayError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<image::ImageError> for RelayError {
    fn from(error: image::ImageError) -> Self {
        Self::encode("jpeg", error.to_string())
    }
}

impl From<shot_scale::cpu::ScaleError> for RelayError {
    fn from(error: shot_scale::cpu::ScaleError) -> Self {
        Self::encode("resize", error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = RelayError::config("image_quality", "0", "must be between 1 and 100");
        assert_eq!(error.category(), "config");
        assert!(classify::is_fatal(&error));
        assert_eq!(
            error.to_string(),
            "Configuration error in 'image_quality': must be between 1 and 100 (value: 0)"
        );
    }

    #[test]
    fn test_error_with_context() {
        let error = RelayError::frame_capture("no primary display")
            .with_operation("capture")
            .with_recovery_suggestion("check that a display server is running");

        assert_eq!(error.category(), "frame_capture");
        assert!(!classify::is_fatal(&error));
        assert_eq!(error.context().operation.as_deref(), Some("capture"));
        assert_eq!(
            error.recovery_suggestion(),
            Some("check that a display server is running")
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = RelayError::io_at("persist artifact", "/tmp/shot.jpg", io);
        assert!(error.source().is_some());
        assert!(error.to_string().contains("/tmp/shot.jpg"));
    }

    #[test]
    fn test_scale_error_converts_to_encode() {
        let scale = shot_scale::cpu::ScaleError::SourceTooSmall {
            expected: 300,
            actual: 12,
        };
        let error: RelayError = scale.into();
        assert_eq!(error.category(), "encode");
    }
}
