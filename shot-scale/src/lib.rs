// SPDX-License-Identifier: MIT
//! # shot-scale: Downscaling for Size-Budgeted Screenshots
//!
//! This crate computes how far a captured frame has to shrink before it is
//! encoded, and performs the resize on the CPU with `fast_image_resize`.
//!
//! ## Key Components
//!
//! - [`presets`]: Scale plan computation (bounding-box fit and pixel-budget fit)
//! - [`cpu`]: RGB8 resizing with a fast (nearest) or high-quality (Lanczos3) filter
//!
//! ## Planning Rules
//!
//! - Aspect ratio is always preserved
//! - Never upscales: inputs already inside the target are left unchanged
//! - Output sides are truncated and clamped to a minimum of 1px
//!
//! ## Usage Example
//!
//! ```rust
//! use shot_scale::cpu::{scale_rgb_cpu, ResizeQuality};
//! use shot_scale::presets::{build_plan, ScaleTarget, Size};
//!
//! let input = Size { w: 64, h: 32 };
//! let plan = build_plan(input, ScaleTarget::FitWithin(Size { w: 32, h: 32 }));
//! assert_eq!((plan.out.w, plan.out.h), (32, 16));
//!
//! let src = vec![0u8; 64 * 32 * 3];
//! let mut resizer = fast_image_resize::Resizer::new();
//! let out = scale_rgb_cpu(&mut resizer, &src, &plan, ResizeQuality::High).unwrap();
//! assert_eq!(out.len(), 32 * 16 * 3);
//! ```

pub mod cpu;
pub mod presets;
