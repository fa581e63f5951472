//! Drawing primitives on RGBA canvases

use image::{Rgba, RgbaImage};

use super::font::CardFont;

pub const BLACK: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0xFF]);
pub const GRAY: Rgba<u8> = Rgba([0x33, 0x33, 0x33, 0xFF]);
pub const SILVER: Rgba<u8> = Rgba([0xCC, 0xCC, 0xCC, 0xFF]);
pub const OUTLINE: Rgba<u8> = Rgba([0x66, 0x66, 0x66, 0xFF]);

/// Extra gap between lines of multi-line text, in pixels
const LINE_SPACING: f32 = 4.0;

/// Where a text position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// Point is the left end of the first baseline
    LeftBaseline,
    /// Point is the center of the whole text block
    Center,
}

/// Source-over blend of `color` at `coverage` (0..1) into one pixel.
/// Out-of-bounds coordinates are ignored.
pub fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }

    let alpha = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if alpha <= 0.0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);

    for channel in 0..3 {
        let src = color[channel] as f32 * alpha;
        let below = dst[channel] as f32 * dst_alpha * (1.0 - alpha);
        let value = if out_alpha > 0.0 { (src + below) / out_alpha } else { 0.0 };
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Fill the rectangle with inclusive corners (x0, y0) and (x1, y1)
pub fn fill_rect(canvas: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            blend_pixel(canvas, x, y, color, 1.0);
        }
    }
}

/// Draw a rectangle outline of `width` pixels inside the inclusive corners
pub fn outline_rect(
    canvas: &mut RgbaImage,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: Rgba<u8>,
    width: i32,
) {
    for inset in 0..width {
        let (left, top, right, bottom) = (x0 + inset, y0 + inset, x1 - inset, y1 - inset);
        if left > right || top > bottom {
            break;
        }
        fill_rect(canvas, left, top, right, top, color);
        fill_rect(canvas, left, bottom, right, bottom, color);
        fill_rect(canvas, left, top, left, bottom, color);
        fill_rect(canvas, right, top, right, bottom, color);
    }
}

/// Draw text (newlines start new lines) at `(x, y)` interpreted by `anchor`
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &CardFont,
    (x, y): (i32, i32),
    text: &str,
    anchor: TextAnchor,
    color: Rgba<u8>,
) {
    let ascent = font.ascent();
    let line_height = ascent + font.descent() + LINE_SPACING;
    let lines: Vec<&str> = text.split('\n').collect();

    match anchor {
        TextAnchor::LeftBaseline => {
            for (i, line) in lines.iter().enumerate() {
                let baseline = y as f32 + i as f32 * line_height;
                font.draw_line(canvas, x as f32, baseline, line, color);
            }
        }
        TextAnchor::Center => {
            let block_height = lines.len() as f32 * line_height - LINE_SPACING;
            let top = y as f32 - block_height / 2.0;
            for (i, line) in lines.iter().enumerate() {
                let width = font.text_width(line);
                let left = x as f32 - width / 2.0;
                let baseline = top + ascent + i as f32 * line_height;
                font.draw_line(canvas, left, baseline, line, color);
            }
        }
    }
}
