//! OCR Types
//!
//! Defines types for recognizing text on rasterized document pages.

use serde::{Deserialize, Serialize};

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// Tesseract OCR (local)
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl Default for OcrProvider {
    fn default() -> Self {
        Self::Tesseract
    }
}

/// OCR result for one page image
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Recognized text
    pub text: String,
    /// Confidence score (0-100)
    pub confidence: f64,
    /// Provider used
    pub provider: OcrProvider,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("API error: {0}")]
    ApiError(String),
}
