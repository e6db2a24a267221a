//! Raw frames as delivered by a frame source, and their normalisation to
//! tightly packed RGB8.

use crate::error::{RelayError, RelayResult};

/// Pixel layout of a [`RawFrame`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Blue, green, red, alpha. What scrap returns on every platform.
    Bgra8,
    Rgba8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// One captured frame. Rows may be padded: `stride` is the byte distance
/// between the starts of two consecutive rows.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Frame with tightly packed rows.
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width as usize * format.bytes_per_pixel(),
            format,
            data,
        }
    }

    /// Single-colour RGB frame.
    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(pixels * 3).collect();
        Self::packed(width, height, PixelFormat::Rgb8, data)
    }

    /// Convert to tightly packed RGB8, dropping alpha and row padding.
    pub fn to_rgb(&self) -> RelayResult<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(RelayError::frame_capture(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }

        let bpp = self.format.bytes_per_pixel();
        let row_bytes = self.width as usize * bpp;
        if self.stride < row_bytes {
            return Err(RelayError::frame_capture(format!(
                "stride {} shorter than row of {} bytes",
                self.stride, row_bytes
            )));
        }
        let needed = self.stride * (self.height as usize - 1) + row_bytes;
        if self.data.len() < needed {
            return Err(RelayError::frame_capture(format!(
                "frame buffer too small: expected {} bytes, got {}",
                needed,
                self.data.len()
            )));
        }

        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in self.data.chunks(self.stride).take(self.height as usize) {
            let row = &row[..row_bytes];
            match self.format {
                PixelFormat::Rgb8 => out.extend_from_slice(row),
                PixelFormat::Rgba8 => {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&px[..3]);
                    }
                }
                PixelFormat::Bgra8 => {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&[px[2], px[1], px[0]]);
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgra_with_padding() {
        // 2x2 BGRA with 4 bytes of padding per row
        let data = vec![
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let frame = RawFrame {
            width: 2,
            height: 2,
            stride: 12,
            format: PixelFormat::Bgra8,
            data,
        };
        let rgb = frame.to_rgb().unwrap();
        assert_eq!(rgb, vec![3, 2, 1, 6, 5, 4, 9, 8, 7, 12, 11, 10]);
    }

    #[test]
    fn test_last_row_may_omit_padding() {
        let data = vec![1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        let frame = RawFrame {
            width: 1,
            height: 2,
            stride: 8,
            format: PixelFormat::Rgba8,
            data,
        };
        assert_eq!(frame.to_rgb().unwrap(), vec![1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn test_solid_rgb_is_identity() {
        let frame = RawFrame::solid_rgb(3, 2, [255, 0, 0]);
        assert_eq!(frame.data.len(), 18);
        assert_eq!(frame.to_rgb().unwrap(), frame.data);
    }

    #[test]
    fn test_short_buffer_is_capture_error() {
        let frame = RawFrame::packed(4, 4, PixelFormat::Bgra8, vec![0; 10]);
        let err = frame.to_rgb().unwrap_err();
        assert_eq!(err.category(), "frame_capture");

        let empty = RawFrame::packed(0, 4, PixelFormat::Rgb8, Vec::new());
        assert!(empty.to_rgb().is_err());
    }
}
