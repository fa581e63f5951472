//! Identifier extraction from uploaded identity documents
//!
//! The text layer of every page is searched first. Only when it holds no
//! identifier is each page rasterized and passed through OCR.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use membership_server::extract::{IdentifierExtractor, PdfPages};
//!
//! let pages = PdfPages::from_path("upload.pdf")?;
//! let identifier = extractor.extract(pages).await; // Option<Identifier>
//! ```

mod extractor;
mod source;

pub use extractor::{ExtractionPass, IdentifierExtractor, DEFAULT_OCR_DPI};
pub use source::{PageSource, PdfPages};

#[cfg(test)]
pub(crate) use source::{single_page_pdf, StaticPages};

use thiserror::Error;

use crate::ocr::OcrError;

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("MuPDF error: {0}")]
    MuPdf(String),

    #[error("Failed to render page: {0}")]
    Render(String),

    #[error("Image encoding error: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Task join error: {0}")]
    Join(String),
}

impl From<mupdf::Error> for ExtractError {
    fn from(e: mupdf::Error) -> Self {
        ExtractError::MuPdf(e.to_string())
    }
}
