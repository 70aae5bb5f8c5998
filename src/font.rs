use crate::frame::Frame;
use anyhow::Result;
use font8x8::legacy::BASIC_LEGACY;
use image::{Rgb, Rgba, RgbImage};

pub const DEFAULT_FONT_SIZE: u32 = 15;

const GLYPH: u32 = 8;

/// Draws text with a background box onto a frame.
pub trait TextOverlay {
    /// Draws `text` with its top-left corner at (`x`, `y`). Coordinates may
    /// fall partly or fully outside the frame; the drawing is clipped.
    fn overlay(
        &self,
        frame: &mut Frame,
        text: &str,
        x: i32,
        y: i32,
        foreground: Rgba<u8>,
        background: Rgba<u8>,
    ) -> Result<()>;

    fn line_height(&self) -> u32;
}

/// Fixed-width ASCII font scaled up from 8x8 glyphs.
///
/// Lines are `size` pixels apart; glyphs are scaled to the nearest multiple
/// of eight and clipped to the line.
pub struct BitmapFont {
    size: u32,
    scale: u32,
}

impl BitmapFont {
    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        Self {
            size,
            scale: ((size + GLYPH / 2) / GLYPH).max(1),
        }
    }

    pub fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * GLYPH * self.scale
    }

    fn glyph(ch: char) -> [u8; 8] {
        let code = ch as usize;
        if code < BASIC_LEGACY.len() {
            BASIC_LEGACY[code]
        } else {
            BASIC_LEGACY['?' as usize]
        }
    }
}

impl Default for BitmapFont {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_SIZE)
    }
}

impl TextOverlay for BitmapFont {
    fn overlay(
        &self,
        frame: &mut Frame,
        text: &str,
        x: i32,
        y: i32,
        foreground: Rgba<u8>,
        background: Rgba<u8>,
    ) -> Result<()> {
        let image = frame.image_mut();
        let height = self.line_height() as i32;
        let bottom = y + height;
        fill_rect(
            image,
            x,
            y,
            x + self.text_width(text) as i32,
            bottom,
            background,
        );

        let step = (GLYPH * self.scale) as i32;
        let top = y + (height - step).max(0) / 2;
        for (i, ch) in text.chars().enumerate() {
            let left = x + i as i32 * step;
            for (row, bits) in Self::glyph(ch).iter().enumerate() {
                for col in 0..GLYPH {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = left + (col * self.scale) as i32;
                    let py = top + (row as u32 * self.scale) as i32;
                    fill_rect(
                        image,
                        px,
                        py,
                        px + self.scale as i32,
                        (py + self.scale as i32).min(bottom),
                        foreground,
                    );
                }
            }
        }
        Ok(())
    }

    fn line_height(&self) -> u32 {
        self.size
    }
}

/// Alpha-blends `color` over the half-open rectangle, clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(image.width() as i32);
    let y1 = y1.min(image.height() as i32);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    for py in y0..y1 {
        for px in x0..x1 {
            let pixel = image.get_pixel_mut(px as u32, py as u32);
            *pixel = blend(*pixel, color);
        }
    }
}

fn blend(dst: Rgb<u8>, src: Rgba<u8>) -> Rgb<u8> {
    let alpha = src[3] as u32;
    let mix = |d: u8, s: u8| ((s as u32 * alpha + d as u32 * (255 - alpha) + 127) / 255) as u8;
    Rgb([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2])])
}
