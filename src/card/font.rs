//! Card fonts
//!
//! TrueType faces are rasterized with `rusttype`. When a face cannot be
//! loaded the card falls back to a built-in 5x7 bitmap face scaled to the
//! requested pixel size, so text is always drawn.

use std::path::Path;

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale as GlyphScale};

use super::canvas::blend_pixel;

/// Where a font actually came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSource {
    TrueType,
    Builtin,
}

/// A face at a fixed pixel size
#[derive(Clone)]
pub enum CardFont {
    TrueType { font: Font<'static>, px: f32 },
    Builtin { unit: u32 },
}

impl CardFont {
    /// Load a TrueType face from disk, falling back to the built-in face
    pub fn load(path: &Path, px: f32) -> Self {
        match std::fs::read(path) {
            Ok(data) => match Font::try_from_vec(data) {
                Some(font) => return CardFont::TrueType { font, px },
                None => tracing::warn!(
                    path = %path.display(),
                    "Invalid font file, using built-in font"
                ),
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Font not found, using built-in font"
                )
            }
        }
        Self::builtin(px)
    }

    /// Built-in bitmap face approximating `px` pixels of line height
    pub fn builtin(px: f32) -> Self {
        let unit = (px / BITMAP_CELL_HEIGHT as f32).round().max(1.0) as u32;
        CardFont::Builtin { unit }
    }

    pub fn source(&self) -> FontSource {
        match self {
            CardFont::TrueType { .. } => FontSource::TrueType,
            CardFont::Builtin { .. } => FontSource::Builtin,
        }
    }

    /// Distance from baseline to the top of the tallest glyphs
    pub fn ascent(&self) -> f32 {
        match self {
            CardFont::TrueType { font, px } => font.v_metrics(GlyphScale::uniform(*px)).ascent,
            CardFont::Builtin { unit } => (BITMAP_GLYPH_ROWS * unit) as f32,
        }
    }

    /// Distance from baseline to the bottom of descenders (positive)
    pub fn descent(&self) -> f32 {
        match self {
            CardFont::TrueType { font, px } => -font.v_metrics(GlyphScale::uniform(*px)).descent,
            CardFont::Builtin { unit } => (BITMAP_DESCENT_ROWS * unit) as f32,
        }
    }

    /// Advance width of a single line of text
    pub fn text_width(&self, text: &str) -> f32 {
        match self {
            CardFont::TrueType { font, px } => {
                let scale = GlyphScale::uniform(*px);
                font.layout(text, scale, point(0.0, 0.0))
                    .last()
                    .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                    .unwrap_or(0.0)
            }
            CardFont::Builtin { unit } => {
                (text.chars().count() as u32 * BITMAP_ADVANCE * unit) as f32
            }
        }
    }

    /// Draw one line with its baseline starting at (x, baseline)
    pub fn draw_line(
        &self,
        canvas: &mut RgbaImage,
        x: f32,
        baseline: f32,
        text: &str,
        color: Rgba<u8>,
    ) {
        match self {
            CardFont::TrueType { font, px } => {
                let scale = GlyphScale::uniform(*px);
                for glyph in font.layout(text, scale, point(x, baseline)) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, coverage| {
                            blend_pixel(
                                canvas,
                                bb.min.x + gx as i32,
                                bb.min.y + gy as i32,
                                color,
                                coverage,
                            );
                        });
                    }
                }
            }
            CardFont::Builtin { unit } => {
                let unit = *unit as i32;
                let top = baseline.round() as i32 - BITMAP_GLYPH_ROWS as i32 * unit;
                let mut pen_x = x.round() as i32;

                for ch in text.chars() {
                    let columns = bitmap_glyph(ch);
                    for (col, bits) in columns.iter().enumerate() {
                        for row in 0..BITMAP_GLYPH_ROWS as i32 {
                            if bits & (1 << row) == 0 {
                                continue;
                            }
                            let cell_x = pen_x + col as i32 * unit;
                            let cell_y = top + row * unit;
                            for dy in 0..unit {
                                for dx in 0..unit {
                                    blend_pixel(canvas, cell_x + dx, cell_y + dy, color, 1.0);
                                }
                            }
                        }
                    }
                    pen_x += BITMAP_ADVANCE as i32 * unit;
                }
            }
        }
    }
}

/// The three faces used on a card
#[derive(Clone)]
pub struct FontSet {
    pub text: CardFont,
    pub bold: CardFont,
    pub small: CardFont,
}

impl FontSet {
    pub fn load(regular: &Path, bold: &Path, text_px: f32, small_px: f32) -> Self {
        Self {
            text: CardFont::load(regular, text_px),
            bold: CardFont::load(bold, text_px),
            small: CardFont::load(regular, small_px),
        }
    }

    /// Source of each face: (text, bold, small)
    pub fn sources(&self) -> (FontSource, FontSource, FontSource) {
        (self.text.source(), self.bold.source(), self.small.source())
    }
}

// ============================================================================
// Built-in bitmap face
// ============================================================================

/// Rows above the baseline
const BITMAP_GLYPH_ROWS: u32 = 7;
/// Rows below the baseline
const BITMAP_DESCENT_ROWS: u32 = 1;
const BITMAP_CELL_HEIGHT: u32 = BITMAP_GLYPH_ROWS + BITMAP_DESCENT_ROWS;
/// Five glyph columns plus one column of spacing
const BITMAP_ADVANCE: u32 = 6;

/// Column bitmaps for ASCII 0x20..=0x5F, bit 0 is the top row.
/// Lowercase letters are drawn with their uppercase glyphs.
const BITMAP_GLYPHS: [[u8; 5]; 64] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // '#'
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62], // '%'
    [0x36, 0x49, 0x56, 0x20, 0x50], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00], // '\''
    [0x00, 0x1C, 0x22, 0x41, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00], // ')'
    [0x2A, 0x1C, 0x7F, 0x1C, 0x2A], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08], // '+'
    [0x00, 0x50, 0x30, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46], // '2'
    [0x21, 0x41, 0x45, 0x4B, 0x31], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00], // ';'
    [0x08, 0x14, 0x22, 0x41, 0x00], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14], // '='
    [0x00, 0x41, 0x22, 0x14, 0x08], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E], // '@'
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22], // 'C'
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41], // 'E'
    [0x7F, 0x09, 0x09, 0x09, 0x01], // 'F'
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // 'H'
    [0x00, 0x41, 0x7F, 0x41, 0x00], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40], // 'L'
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // 'M'
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46], // 'R'
    [0x46, 0x49, 0x49, 0x49, 0x31], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // 'V'
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63], // 'X'
    [0x07, 0x08, 0x70, 0x08, 0x07], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43], // 'Z'
    [0x00, 0x7F, 0x41, 0x41, 0x00], // '['
    [0x02, 0x04, 0x08, 0x10, 0x20], // '\\'
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ']'
    [0x04, 0x02, 0x01, 0x02, 0x04], // '^'
    [0x40, 0x40, 0x40, 0x40, 0x40], // '_'
];

/// Glyph for a character; anything outside the table renders as '?'
fn bitmap_glyph(ch: char) -> &'static [u8; 5] {
    let upper = ch.to_ascii_uppercase();
    match upper as u32 {
        code @ 0x20..=0x5F => &BITMAP_GLYPHS[(code - 0x20) as usize],
        _ => &BITMAP_GLYPHS[('?' as u32 - 0x20) as usize],
    }
}
