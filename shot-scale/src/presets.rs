// SPDX-License-Identifier: MIT
//! # Scale Plan Computation
//!
//! Two kinds of constraint are supported:
//! 1. **FitWithin**: keep both sides inside a bounding box (resolution cap)
//! 2. **PixelBudget**: keep `w * h` at or below a pixel count (byte-budget heuristic)
//!
//! Both use a single uniform scale factor so the aspect ratio is preserved.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Total pixel count.
    pub fn pixels(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Defines the size constraint for a scaling operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleTarget {
    /// Both sides must fit inside this box. The scale factor is the smaller
    /// of the two per-axis factors.
    FitWithin(Size),
    /// Pixel count must not exceed this value. The scale factor is
    /// `sqrt(max_pixels / pixels)`.
    PixelBudget(u64),
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target constraint used for planning
    pub target: ScaleTarget,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the image untouched.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute a scaling plan for `input` under `target`.
///
/// # Performance
/// O(1) computation with minimal floating-point operations
pub fn build_plan(input: Size, target: ScaleTarget) -> ScalePlan {
    let out = match target {
        ScaleTarget::FitWithin(bounds) => fit_within(input, bounds),
        ScaleTarget::PixelBudget(max_pixels) => fit_pixel_budget(input, max_pixels),
    };
    ScalePlan { input, target, out }
}

/// Fit image within a bounding box while preserving aspect ratio.
/// Never upscales.
fn fit_within(input: Size, bounds: Size) -> Size {
    if input.w <= bounds.w && input.h <= bounds.h {
        return input;
    }
    let s = (bounds.w as f64 / input.w as f64).min(bounds.h as f64 / input.h as f64);
    scale_by(input, s)
}

/// Shrink so the pixel count stays at or below `max_pixels`.
/// Never upscales.
fn fit_pixel_budget(input: Size, max_pixels: u64) -> Size {
    let pixels = input.pixels();
    if pixels <= max_pixels {
        return input;
    }
    let s = (max_pixels as f64 / pixels as f64).sqrt();
    scale_by(input, s)
}

fn scale_by(input: Size, s: f64) -> Size {
    Size {
        w: ((input.w as f64 * s) as u32).max(1),
        h: ((input.h as f64 * s) as u32).max(1),
    }
}
