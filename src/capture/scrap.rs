// # Scrap Capture Source
//
// Captures the primary display through the `scrap` library. scrap reports
// `WouldBlock` until the compositor has a new frame ready, so a capture call
// polls for up to `retry_window` before giving up.
//
// | Platform | Backend |
// |----------|---------|
// | Windows | DXGI |
// | macOS | CoreGraphics |
// | Linux | X11 (XShm) |

use std::io::ErrorKind;
use std::thread;
use std::time::{Duration, Instant};

use scrap::{Capturer, Display};
use tracing::{debug, info};

use crate::capture::{FrameSource, PixelFormat, RawFrame};
use crate::error::{RelayError, RelayResult};

const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(2);
const RETRY_NAP: Duration = Duration::from_millis(10);

/// Primary-display capture through scrap.
pub struct ScrapFrameSource {
    capturer: Capturer,
    width: u32,
    height: u32,
    retry_window: Duration,
}

impl ScrapFrameSource {
    /// Open the primary display.
    pub fn new() -> RelayResult<Self> {
        let display = Display::primary().map_err(|e| {
            RelayError::frame_capture(format!("no primary display: {}", e))
                .with_recovery_suggestion("check that a display server is running")
        })?;
        let width = display.width() as u32;
        let height = display.height() as u32;
        let capturer = Capturer::new(display)
            .map_err(|e| RelayError::frame_capture(format!("cannot create capturer: {}", e)))?;

        info!(width, height, "Screen capturer ready");
        Ok(Self {
            capturer,
            width,
            height,
            retry_window: DEFAULT_RETRY_WINDOW,
        })
    }
}

impl FrameSource for ScrapFrameSource {
    fn capture(&mut self) -> RelayResult<RawFrame> {
        let retry_window = self.retry_window;
        let deadline = Instant::now() + retry_window;
        let (width, height) = (self.width, self.height);
        loop {
            match self.capturer.frame() {
                Ok(frame) => {
                    let data = frame.to_vec();
                    // scrap pads rows on some platforms; derive the real stride
                    let stride = data.len() / height.max(1) as usize;
                    debug!(width, height, stride, "Frame captured");
                    return Ok(RawFrame {
                        width,
                        height,
                        stride,
                        format: PixelFormat::Bgra8,
                        data,
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(RelayError::frame_capture(format!(
                            "no frame ready within {:?}",
                            retry_window
                        )));
                    }
                    thread::sleep(RETRY_NAP);
                }
                Err(e) => {
                    return Err(RelayError::frame_capture(format!("scrap frame error: {}", e)));
                }
            }
        }
    }
}
