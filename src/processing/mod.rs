//! # Processing Module
//!
//! Turns a captured frame into an upload payload that fits the byte budget.

pub mod budget;

pub use budget::{Budget, EncodedImage, FALLBACK_QUALITY, ImageBudgeter};
