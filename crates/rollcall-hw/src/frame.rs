//! Captured frames and their conversion from YUYV, BGR or MJPG to RGB.

use image::{ImageFormat, RgbImage};

/// Pixel layout of a captured buffer, as delivered by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Packed 8-bit RGB (V4L2 `RGB3`).
    Rgb,
    /// Packed 8-bit BGR (V4L2 `BGR3`).
    Bgr,
    /// YUYV 4:2:2 packed: two pixels per four bytes `[Y0, U, Y1, V]`.
    Yuyv,
    /// Motion-JPEG compressed frame.
    Mjpg,
}

impl PixelLayout {
    /// Bytes a `width x height` frame occupies, or `None` for compressed layouts.
    pub fn frame_len(self, width: u32, height: u32) -> Option<usize> {
        let pixels = width as usize * height as usize;
        match self {
            PixelLayout::Rgb | PixelLayout::Bgr => Some(pixels * 3),
            PixelLayout::Yuyv => Some(pixels * 2),
            PixelLayout::Mjpg => None,
        }
    }

    /// Reject widths the layout cannot represent. YUYV packs pixel pairs, so
    /// its width must be even.
    pub fn check_width(self, width: u32) -> Result<(), FrameError> {
        if self == PixelLayout::Yuyv && width % 2 != 0 {
            return Err(FrameError::OddYuyvWidth(width));
        }
        Ok(())
    }
}

/// A captured camera frame in the device's native layout.
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// Convert to the RGB channel order the face models expect.
    pub fn to_rgb(&self) -> Result<RgbImage, FrameError> {
        let rgb = match self.layout {
            PixelLayout::Rgb => {
                let expected = self.width as usize * self.height as usize * 3;
                check_len(&self.data, expected)?;
                self.data[..expected].to_vec()
            }
            PixelLayout::Bgr => bgr_to_rgb(&self.data, self.width, self.height)?,
            PixelLayout::Yuyv => yuyv_to_rgb(&self.data, self.width, self.height)?,
            PixelLayout::Mjpg => return decode_mjpg(&self.data),
        };

        let len = rgb.len();
        RgbImage::from_raw(self.width, self.height, rgb).ok_or(FrameError::InvalidLength {
            expected: self.width as usize * self.height as usize * 3,
            actual: len,
        })
    }
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), FrameError> {
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Swap packed BGR triples into RGB order.
pub fn bgr_to_rgb(bgr: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = width as usize * height as usize * 3;
    check_len(bgr, expected)?;
    Ok(bgr[..expected]
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect())
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 limited-range coefficients.
///
/// Each `[Y0, U, Y1, V]` group yields two RGB pixels sharing chroma.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    PixelLayout::Yuyv.check_width(width)?;
    let expected = width as usize * height as usize * 2;
    check_len(yuyv, expected)?;

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for group in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (group[0], group[1], group[2], group[3]);
        rgb.extend_from_slice(&ycbcr_to_rgb(y0, u, v));
        rgb.extend_from_slice(&ycbcr_to_rgb(y1, u, v));
    }
    Ok(rgb)
}

fn ycbcr_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(298 * c + 409 * e),
        clamp(298 * c - 100 * d - 208 * e),
        clamp(298 * c + 516 * d),
    ]
}

fn decode_mjpg(data: &[u8]) -> Result<RgbImage, FrameError> {
    Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("YUYV frames need an even width, got {0}")]
    OddYuyvWidth(u32),
    #[error("MJPG decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout) -> Frame {
        Frame {
            data,
            width,
            height,
            layout,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_bgr_to_rgb_swaps_channels() {
        let bgr = vec![10, 20, 30, 40, 50, 60];
        let rgb = bgr_to_rgb(&bgr, 2, 1).unwrap();
        assert_eq!(rgb, vec![30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn test_bgr_frame_to_rgb_image() {
        let img = frame(vec![0, 0, 255], 1, 1, PixelLayout::Bgr).to_rgb().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_yuyv_black_and_white() {
        // Y=16 is black and Y=235 is white in limited range.
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_neutral_grey() {
        let yuyv = vec![128, 128, 128, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![130; 6]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let result = yuyv_to_rgb(&[16, 128], 2, 1);
        assert!(matches!(
            result,
            Err(FrameError::InvalidLength { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_yuyv_odd_width_rejected() {
        let result = yuyv_to_rgb(&[16, 128, 235, 128, 16, 128], 3, 1);
        assert!(matches!(result, Err(FrameError::OddYuyvWidth(3))));
        assert!(PixelLayout::Bgr.check_width(3).is_ok());
    }

    #[test]
    fn test_rgb_frame_too_short() {
        let result = frame(vec![1, 2, 3], 2, 1, PixelLayout::Rgb).to_rgb();
        assert!(result.is_err());
    }

    #[test]
    fn test_mjpg_roundtrip_dimensions() {
        let src = RgbImage::from_pixel(8, 4, image::Rgb([200, 10, 10]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(src)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let img = frame(jpeg, 8, 4, PixelLayout::Mjpg).to_rgb().unwrap();
        assert_eq!(img.dimensions(), (8, 4));
    }

    #[test]
    fn test_mjpg_garbage_is_error() {
        let result = frame(vec![0, 1, 2, 3], 2, 2, PixelLayout::Mjpg).to_rgb();
        assert!(matches!(result, Err(FrameError::Decode(_))));
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(PixelLayout::Bgr.frame_len(4, 2), Some(24));
        assert_eq!(PixelLayout::Yuyv.frame_len(4, 2), Some(16));
        assert_eq!(PixelLayout::Mjpg.frame_len(4, 2), None);
    }
}
