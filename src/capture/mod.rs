// # Capture Module
//
// Frame sources for the relay. The scheduler only sees the `FrameSource`
// trait; the scrap-backed implementation is compiled with the
// `screen-capture` feature.

pub mod frame;
#[cfg(feature = "screen-capture")]
pub mod scrap;

pub use frame::{PixelFormat, RawFrame};

use crate::error::RelayResult;

/// Produces one full-screen frame per call.
///
/// Implementations block until a frame is available or give up with
/// [`crate::error::RelayError::FrameCapture`].
pub trait FrameSource {
    /// Grab the current screen contents.
    fn capture(&mut self) -> RelayResult<RawFrame>;
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn capture(&mut self) -> RelayResult<RawFrame> {
        (**self).capture()
    }
}
