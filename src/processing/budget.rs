//! # Image Budgeter
//!
//! Shrinks and encodes a frame so the payload fits the upload ceiling.
//!
//! ## Pipeline
//!
//! ```text
//! RawFrame ─▶ RGB8 ─▶ [dimension cap] ─▶ byte-budget shrink ─▶ JPEG(q)
//!                      low power only                            │
//!                                                   over max_bytes?
//!                                                                ▼
//!                              shrink to max_bytes ─▶ JPEG(fallback q)
//! ```
//!
//! The byte-budget shrink uses a fixed heuristic of eight pixels per budget
//! byte: a `target_bytes` budget allows `target_bytes * 8` pixels, and larger
//! frames are scaled uniformly by `sqrt(threshold / pixels)`.
//!
//! Staying over budget after the fallback is not an error. The oversized
//! result is returned with [`EncodedImage::over_budget`] set and the remote
//! end decides.

use fast_image_resize::Resizer;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use shot_scale::cpu::{ResizeQuality, scale_rgb_cpu};
use shot_scale::presets::{ScaleTarget, Size, build_plan};
use tracing::{debug, info, warn};

use crate::capture::RawFrame;
use crate::config::RelayConfig;
use crate::error::RelayResult;

/// JPEG quality for the second encode attempt.
pub const FALLBACK_QUALITY: u8 = 50;

/// Pixels allowed per budget byte in the shrink heuristic.
const PIXELS_PER_BUDGET_BYTE: u64 = 8;

/// Size, quality and dimension constraints for one payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    /// Hard ceiling; exceeding it triggers the fallback pass.
    pub max_bytes: u64,
    /// Drives the first shrink pass. Never above `max_bytes`.
    pub target_bytes: u64,
    /// Quality of the first encode.
    pub quality: u8,
    /// Resolution cap applied in low-power mode.
    pub max_dimensions: Size,
}

impl Budget {
    pub fn new(max_bytes: u64, quality: u8, max_dimensions: Size) -> Self {
        Self {
            max_bytes,
            target_bytes: max_bytes,
            quality,
            max_dimensions,
        }
    }

    /// Aim the first pass below the ceiling. Clamped to `max_bytes`.
    pub fn with_target_bytes(mut self, target_bytes: u64) -> Self {
        self.target_bytes = target_bytes.min(self.max_bytes);
        self
    }
}

/// Encoded payload ready for delivery.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Quality of the encode that produced `bytes`.
    pub quality: u8,
    /// True when any resize stage changed the dimensions.
    pub resized: bool,
    /// True when `bytes` still exceeds `max_bytes` after the fallback pass.
    pub over_budget: bool,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fits frames into a [`Budget`].
pub struct ImageBudgeter {
    budget: Budget,
    low_power: bool,
    resizer: Resizer,
}

impl ImageBudgeter {
    pub fn new(budget: Budget, low_power: bool) -> Self {
        Self {
            budget,
            low_power,
            resizer: Resizer::new(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.budget(), config.low_power_mode)
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    fn resize_quality(&self) -> ResizeQuality {
        if self.low_power {
            ResizeQuality::Fast
        } else {
            ResizeQuality::High
        }
    }

    /// Shrink and encode `frame`. Errors only on genuine resize or encode
    /// failures, never because of size.
    pub fn fit(&mut self, frame: RawFrame) -> RelayResult<EncodedImage> {
        let mut rgb = frame.to_rgb()?;
        let mut size = Size {
            w: frame.width,
            h: frame.height,
        };
        drop(frame);

        let original = size;
        let quality = self.resize_quality();

        if self.low_power {
            let plan = build_plan(size, ScaleTarget::FitWithin(self.budget.max_dimensions));
            if !plan.is_identity() {
                info!(
                    from = ?(plan.input.w, plan.input.h),
                    to = ?(plan.out.w, plan.out.h),
                    "Capping resolution for low-power mode"
                );
                rgb = scale_rgb_cpu(&mut self.resizer, &rgb, &plan, quality)?;
                size = plan.out;
            }
        }

        (rgb, size) = self.shrink_to(rgb, size, self.budget.target_bytes, quality)?;

        let bytes = encode_jpeg(&rgb, size, self.budget.quality)?;
        if bytes.len() as u64 <= self.budget.max_bytes {
            return Ok(EncodedImage {
                bytes,
                width: size.w,
                height: size.h,
                quality: self.budget.quality,
                resized: size != original,
                over_budget: false,
            });
        }

        warn!(
            size_bytes = bytes.len(),
            max_bytes = self.budget.max_bytes,
            "Encoded image over budget, retrying at fallback quality"
        );
        drop(bytes);

        (rgb, size) = self.shrink_to(rgb, size, self.budget.max_bytes, quality)?;
        let fallback_quality = self.budget.quality.min(FALLBACK_QUALITY);
        let bytes = encode_jpeg(&rgb, size, fallback_quality)?;
        let over_budget = bytes.len() as u64 > self.budget.max_bytes;
        if over_budget {
            warn!(
                size_bytes = bytes.len(),
                max_bytes = self.budget.max_bytes,
                "Image still over budget after fallback, sending anyway"
            );
        }

        Ok(EncodedImage {
            bytes,
            width: size.w,
            height: size.h,
            quality: fallback_quality,
            resized: size != original,
            over_budget,
        })
    }

    fn shrink_to(
        &mut self,
        rgb: Vec<u8>,
        size: Size,
        budget_bytes: u64,
        quality: ResizeQuality,
    ) -> RelayResult<(Vec<u8>, Size)> {
        let threshold = budget_bytes.saturating_mul(PIXELS_PER_BUDGET_BYTE);
        let plan = build_plan(size, ScaleTarget::PixelBudget(threshold));
        if plan.is_identity() {
            return Ok((rgb, size));
        }
        debug!(
            from = ?(plan.input.w, plan.input.h),
            to = ?(plan.out.w, plan.out.h),
            threshold_pixels = threshold,
            "Shrinking to byte budget"
        );
        let scaled = scale_rgb_cpu(&mut self.resizer, &rgb, &plan, quality)?;
        Ok((scaled, plan.out))
    }
}

/// Encode tightly packed RGB8 as baseline JPEG.
pub fn encode_jpeg(rgb: &[u8], size: Size, quality: u8) -> RelayResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode(rgb, size.w, size.h, ExtendedColorType::Rgb8)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn budget(max_bytes: u64) -> Budget {
        Budget::new(max_bytes, 85, Size { w: 1920, h: 1080 })
    }

    #[test]
    fn test_small_frame_is_encoded_unchanged() {
        let mut budgeter = ImageBudgeter::new(budget(8 * MB), false);
        let image = budgeter.fit(RawFrame::solid_rgb(100, 100, [255, 0, 0])).unwrap();

        assert_eq!((image.width, image.height), (100, 100));
        assert_eq!(image.quality, 85);
        assert!(!image.resized);
        assert!(!image.over_budget);
        // JPEG SOI marker
        assert_eq!(&image.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_byte_budget_shrinks_preserving_aspect() {
        // 1000 bytes allows 8000 pixels; 200x100 is 20000
        let mut budgeter = ImageBudgeter::new(budget(1000), false);
        let image = budgeter.fit(RawFrame::solid_rgb(200, 100, [0, 0, 255])).unwrap();

        assert!(image.resized);
        assert_eq!((image.width, image.height), (126, 63));
    }

    #[test]
    fn test_impossible_budget_returns_over_budget_result() {
        let mut budgeter = ImageBudgeter::new(budget(1), false);
        let image = budgeter.fit(RawFrame::solid_rgb(200, 100, [0, 255, 0])).unwrap();

        assert!(image.over_budget);
        assert_eq!(image.quality, FALLBACK_QUALITY);
        assert!(!image.is_empty());
    }

    #[test]
    fn test_low_power_caps_resolution() {
        let caps = Budget::new(8 * MB, 85, Size { w: 64, h: 64 });
        let mut budgeter = ImageBudgeter::new(caps, true);
        let image = budgeter.fit(RawFrame::solid_rgb(256, 128, [9, 9, 9])).unwrap();
        assert_eq!((image.width, image.height), (64, 32));

        // dimension cap is a low-power-only stage
        let mut budgeter = ImageBudgeter::new(caps, false);
        let image = budgeter.fit(RawFrame::solid_rgb(256, 128, [9, 9, 9])).unwrap();
        assert_eq!((image.width, image.height), (256, 128));
    }

    #[test]
    fn test_target_bytes_is_clamped_to_max() {
        let b = budget(1000).with_target_bytes(5000);
        assert_eq!(b.target_bytes, 1000);
        let b = budget(1000).with_target_bytes(400);
        assert_eq!(b.target_bytes, 400);
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        let mut budgeter = ImageBudgeter::new(budget(MB), false);
        let frame = RawFrame::packed(10, 10, crate::capture::PixelFormat::Rgb8, vec![0; 5]);
        assert!(budgeter.fit(frame).is_err());
    }
}
