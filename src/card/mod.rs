//! Membership card rendering
//!
//! - `layout`: anchor coordinates measured on the reference template
//! - `font`: TrueType faces with a built-in bitmap fallback
//! - `canvas`: pixel-level drawing helpers
//! - `wrap`: word wrapping for the address field
//! - `renderer`: composes and saves the card

mod canvas;
mod font;
mod layout;
mod renderer;
mod wrap;

use std::path::PathBuf;

use thiserror::Error;

pub use font::{CardFont, FontSet, FontSource};
pub use layout::{CardLayout, PhotoBox, Scale, REFERENCE_WIDTH};
pub use renderer::{
    card_file_name, CardRenderer, HeaderValues, OverlayOutcome, PhotoOutcome, RenderReport,
    RenderedCard, SavedCard,
};
pub use wrap::wrap_text;

/// Errors that prevent a card from being produced
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Card template not found at {0}")]
    TemplateMissing(PathBuf),

    #[error("Card template could not be decoded: {0}")]
    TemplateDecode(String),

    #[error("Card could not be saved: {0}")]
    Save(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    Join(String),
}
