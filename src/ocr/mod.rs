//! OCR Module
//!
//! Recognizes text on rasterized pages of scanned identity documents that
//! carry no text layer.
//!
//! Supports multiple backends:
//! - Tesseract (local, requires the `tesseract` binary)
//! - Ollama vision models (local LLM)

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider, TesseractProvider};
pub use service::OcrService;
pub use types::{OcrError, OcrProvider, OcrResult};

#[cfg(test)]
pub(crate) use provider::MockProvider;
