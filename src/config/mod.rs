//! # Configuration Module
//!
//! This module provides the relay configuration, its validation, and the
//! loader that layers a JSON file and environment overrides over the defaults.

pub mod config;
pub mod loader;

pub use config::{MAX_PAYLOAD_CEILING_MB, RelayConfig};
pub use loader::{FileFallback, LoadedConfig};
