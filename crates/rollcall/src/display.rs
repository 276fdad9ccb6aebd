//! Preview window backed by minifb.

use crate::session::{DisplayError, DisplaySink, Key, KeySource};
use image::RgbImage;
use minifb::{KeyRepeat, Window, WindowOptions};

pub struct PreviewWindow {
    window: Window,
    buffer: Vec<u32>,
}

impl PreviewWindow {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self, DisplayError> {
        let mut window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .map_err(|e| DisplayError::Open(e.to_string()))?;
        window.set_target_fps(30);

        Ok(Self {
            window,
            buffer: Vec::with_capacity((width * height) as usize),
        })
    }
}

impl DisplaySink for PreviewWindow {
    fn show(&mut self, image: &RgbImage) -> Result<(), DisplayError> {
        pack_0rgb(image, &mut self.buffer);
        self.window
            .update_with_buffer(&self.buffer, image.width() as usize, image.height() as usize)
            .map_err(|e| DisplayError::Update(e.to_string()))
    }
}

impl KeySource for PreviewWindow {
    fn poll_key(&mut self) -> Option<Key> {
        if !self.window.is_open() {
            return Some(Key::Closed);
        }
        self.window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .find_map(|key| match key {
                minifb::Key::Q => Some(Key::Char('q')),
                minifb::Key::Escape => Some(Key::Escape),
                _ => None,
            })
    }
}

/// Pack RGB pixels into minifb's `0RGB` u32 layout, reusing `out`.
fn pack_0rgb(image: &RgbImage, out: &mut Vec<u32>) {
    out.clear();
    out.extend(
        image
            .pixels()
            .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])),
    );
}
