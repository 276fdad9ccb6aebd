//! Draws face boxes and labels onto full-resolution frames.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rollcall_core::{Detection, UPSCALE_FACTOR};
use std::path::Path;

const BOX_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 2;
const LABEL_HEIGHT_PX: f32 = 24.0;
/// Gap between the label's baseline and the top edge of its box.
const LABEL_GAP_PX: i32 = 10;

/// DejaVu Sans, bundled so labels render on hosts without system fonts.
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    /// Load the label font from `font_path`, or the bundled font when no path
    /// is configured or the configured one is unusable.
    pub fn load(font_path: Option<&Path>) -> Self {
        if let Some(path) = font_path {
            let font = std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|e| e.to_string()));
            match font {
                Ok(font) => {
                    tracing::debug!(path = %path.display(), "loaded label font");
                    return Self::new(Some(font));
                }
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "label font unusable; using bundled font"
                    );
                }
            }
        }

        match FontVec::try_from_vec(BUNDLED_FONT.to_vec()) {
            Ok(font) => Self::new(Some(font)),
            Err(error) => {
                tracing::warn!(%error, "bundled label font invalid; drawing boxes only");
                Self::new(None)
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every detection, scaling its downscaled location back to `frame`.
    pub fn draw(&self, frame: &mut RgbImage, detections: &[Detection]) {
        for detection in detections {
            let loc = detection.location.scaled(UPSCALE_FACTOR);

            for inset in 0..BOX_THICKNESS {
                let width = loc.width() - 2 * inset;
                let height = loc.height() - 2 * inset;
                if width <= 0 || height <= 0 {
                    break;
                }
                let rect = Rect::at(loc.left + inset, loc.top + inset)
                    .of_size(width as u32, height as u32);
                draw_hollow_rect_mut(frame, rect, BOX_COLOUR);
            }

            if let Some(font) = &self.font {
                let y = loc.top - LABEL_GAP_PX - LABEL_HEIGHT_PX as i32;
                draw_text_mut(
                    frame,
                    LABEL_COLOUR,
                    loc.left,
                    y,
                    PxScale::from(LABEL_HEIGHT_PX),
                    font,
                    detection.label.as_str(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{FaceLocation, Label};

    fn detection(top: i32, right: i32, bottom: i32, left: i32) -> Detection {
        Detection {
            label: Label::Unknown,
            location: FaceLocation {
                top,
                right,
                bottom,
                left,
            },
            similarity: None,
        }
    }

    #[test]
    fn test_draws_box_at_upscaled_location() {
        let mut frame = RgbImage::new(100, 100);
        Overlay::new(None).draw(&mut frame, &[detection(5, 15, 15, 5)]);

        // Reduced (l=5, t=5, r=15, b=15) → frame (20, 20)..(60, 60).
        assert_eq!(*frame.get_pixel(20, 20), BOX_COLOUR);
        assert_eq!(*frame.get_pixel(21, 30), BOX_COLOUR);
        assert_eq!(*frame.get_pixel(40, 40), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(19, 19), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_box_partly_outside_frame_is_clipped() {
        let mut frame = RgbImage::new(32, 32);
        Overlay::new(None).draw(&mut frame, &[detection(0, 20, 20, 4)]);
        assert_eq!(*frame.get_pixel(16, 0), BOX_COLOUR);
    }

    #[test]
    fn test_degenerate_box_draws_nothing() {
        let mut frame = RgbImage::new(16, 16);
        Overlay::new(None).draw(&mut frame, &[detection(2, 2, 2, 2)]);
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_unusable_font_falls_back_to_bundled() {
        assert!(Overlay::load(Some(Path::new("/nonexistent/font.ttf"))).has_font());
        assert!(Overlay::load(None).has_font());
    }

    #[test]
    fn test_label_drawn_above_box() {
        let mut frame = RgbImage::new(160, 120);
        let mut face = detection(15, 30, 25, 5);
        face.label = Label::Known("alice".into());
        Overlay::load(None).draw(&mut frame, &[face]);

        // Box top at 60, so the label occupies rows 26..50 from x = 20.
        let lit = (20..120)
            .flat_map(|x| (26..50).map(move |y| (x, y)))
            .any(|(x, y)| frame.get_pixel(x, y).0.iter().all(|&c| c > 200));
        assert!(lit);
    }

    #[test]
    fn test_without_font_only_box_is_drawn() {
        let mut frame = RgbImage::new(160, 120);
        Overlay::new(None).draw(&mut frame, &[detection(15, 30, 25, 5)]);
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0]) || *p == BOX_COLOUR));
    }
}
