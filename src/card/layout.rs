//! Card layout anchors
//!
//! All coordinates are measured on the reference template (1289 px wide) and
//! scaled by `template_width / reference_width` before use.

use serde::{Deserialize, Serialize};

/// Width of the template the anchors were measured on
pub const REFERENCE_WIDTH: f64 = 1289.0;

/// Photo placement box (x, y, width, height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Named anchor points for every dynamic element on the card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardLayout {
    pub reference_width: f64,

    // Header label colon x positions and their shared baseline
    pub id_colon_x: u32,
    pub membership_colon_x: u32,
    pub active_colon_x: u32,
    pub header_values_y: u32,
    /// Gap between a header colon and its value
    pub after_colon_margin: u32,

    // Left column
    pub left_value_x: u32,
    pub name_y: u32,
    pub profession_y: u32,
    pub designation_y: u32,
    pub mandal_y: u32,
    pub dob_y: u32,
    pub blood_y: u32,
    pub contact_y: u32,
    pub address_y: u32,
    pub address_line_gap: u32,
    pub address_wrap_chars: usize,
    pub address_max_lines: usize,

    pub photo_box: PhotoBox,
    /// Top-left of the signature overlay
    pub signature_overlay_xy: (u32, u32),

    // Font sizes in reference pixels
    pub text_font_px: f64,
    pub small_font_px: f64,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            reference_width: REFERENCE_WIDTH,
            id_colon_x: 210,
            membership_colon_x: 690,
            active_colon_x: 1080,
            header_values_y: 275,
            after_colon_margin: 12,
            left_value_x: 450,
            name_y: 357,
            profession_y: 398,
            designation_y: 439,
            mandal_y: 480,
            dob_y: 521,
            blood_y: 562,
            contact_y: 603,
            address_y: 644,
            address_line_gap: 25,
            address_wrap_chars: 35,
            address_max_lines: 2,
            photo_box: PhotoBox {
                x: 923,
                y: 357,
                width: 200,
                height: 240,
            },
            signature_overlay_xy: (860, 430),
            text_font_px: 22.0,
            small_font_px: 18.0,
        }
    }
}

impl CardLayout {
    /// Scale factor for a template of the given pixel width
    pub fn scale_for(&self, template_width: u32) -> Scale {
        Scale(template_width as f64 / self.reference_width)
    }
}

/// Proportional scale between the reference template and the actual one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale(pub f64);

impl Scale {
    pub fn factor(&self) -> f64 {
        self.0
    }

    /// Scale one reference coordinate: `round(v * scale)`
    pub fn pos(&self, value: u32) -> i32 {
        (value as f64 * self.0).round() as i32
    }

    /// Scale a reference point
    pub fn point(&self, (x, y): (u32, u32)) -> (i32, i32) {
        (self.pos(x), self.pos(y))
    }

    /// Scale a photo box, keeping every dimension at least one pixel
    pub fn photo_box(&self, b: &PhotoBox) -> PhotoBox {
        let scaled = |v: u32| self.pos(v).max(0) as u32;
        PhotoBox {
            x: scaled(b.x),
            y: scaled(b.y),
            width: scaled(b.width).max(1),
            height: scaled(b.height).max(1),
        }
    }

    /// Font pixel size: truncated, never below one pixel
    pub fn font_px(&self, reference_px: f64) -> f32 {
        (reference_px * self.0).floor().max(1.0) as f32
    }

    /// Scale image dimensions by truncation (overlay resize)
    pub fn dimensions(&self, (width, height): (u32, u32)) -> (u32, u32) {
        (
            (width as f64 * self.0) as u32,
            (height as f64 * self.0) as u32,
        )
    }
}
