// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGB8 in → RGB8 out, tightly packed rows.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::presets::ScalePlan;

#[derive(Debug)]
pub enum ScaleError {
    SourceTooSmall { expected: usize, actual: usize },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::SourceTooSmall { expected, actual } => {
                write!(f, "Source buffer too small: expected {} bytes, got {}", expected, actual)
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Resampling quality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeQuality {
    /// Nearest-neighbour. Cheapest, used in low-power mode.
    Fast,
    /// Lanczos3 convolution.
    High,
}

impl ResizeQuality {
    fn to_alg(self) -> ResizeAlg {
        match self {
            ResizeQuality::Fast => ResizeAlg::Nearest,
            ResizeQuality::High => ResizeAlg::Convolution(FilterType::Lanczos3),
        }
    }
}

/// Resize a tightly packed RGB8 buffer according to `plan`.
///
/// Returns a freshly allocated `plan.out.w * plan.out.h * 3` byte buffer.
/// An identity plan returns a copy of the source without resampling.
pub fn scale_rgb_cpu(
    resizer: &mut Resizer,
    src_rgb: &[u8],
    plan: &ScalePlan,
    quality: ResizeQuality,
) -> Result<Vec<u8>, ScaleError> {
    let src_len = (plan.input.w as usize) * (plan.input.h as usize) * 3;
    if src_rgb.len() < src_len {
        return Err(ScaleError::SourceTooSmall { expected: src_len, actual: src_rgb.len() });
    }
    if plan.is_identity() {
        return Ok(src_rgb[..src_len].to_vec());
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(plan.input.w, plan.input.h, &src_rgb[..src_len])?;

    let dst_len = (plan.out.w as usize) * (plan.out.h as usize) * 3;
    let mut dst = vec![0u8; dst_len];
    {
        let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst)?;
        let opts = ResizeOptions::new().resize_alg(quality.to_alg());
        resizer.resize_typed::<U8x3>(&src_view, &mut dst_image, &opts)?;
    }

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{build_plan, ScaleTarget, Size};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut buf = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..(w * h) {
            buf.extend_from_slice(&rgb);
        }
        buf
    }

    #[test]
    fn test_downscale_both_qualities() {
        let src = solid(40, 20, [10, 200, 30]);
        let plan = build_plan(Size { w: 40, h: 20 }, ScaleTarget::FitWithin(Size { w: 20, h: 20 }));
        for quality in [ResizeQuality::Fast, ResizeQuality::High] {
            let mut resizer = Resizer::new();
            let out = scale_rgb_cpu(&mut resizer, &src, &plan, quality).unwrap();
            assert_eq!(out.len(), 20 * 10 * 3);
            // a solid colour survives any filter
            assert_eq!(&out[..3], &[10, 200, 30]);
        }
    }

    #[test]
    fn test_identity_plan_copies_source() {
        let src = solid(4, 4, [1, 2, 3]);
        let plan = build_plan(Size { w: 4, h: 4 }, ScaleTarget::PixelBudget(100));
        let mut resizer = Resizer::new();
        let out = scale_rgb_cpu(&mut resizer, &src, &plan, ResizeQuality::High).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_short_source_is_rejected() {
        let plan = build_plan(Size { w: 10, h: 10 }, ScaleTarget::PixelBudget(10));
        let mut resizer = Resizer::new();
        let err = scale_rgb_cpu(&mut resizer, &[0u8; 12], &plan, ResizeQuality::Fast).unwrap_err();
        assert!(matches!(err, ScaleError::SourceTooSmall { expected: 300, actual: 12 }));
    }
}
