//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{OcrError, OcrProvider, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Perform OCR on an encoded (PNG) page image
    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR provider
///
/// Shells out to the `tesseract` binary, so only the binary has to be installed.
pub struct TesseractProvider {
    /// Default language
    default_language: String,
    /// Binary name or path
    command: String,
    /// Where page images are staged for the binary
    temp_dir: PathBuf,
}

impl TesseractProvider {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
            command: "tesseract".to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Use a specific tesseract binary
    pub fn with_command(mut self, command: &str) -> Self {
        self.command = command.to_string();
        self
    }

    /// Stage page images in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Write the page image to a file removed when the guard drops
    fn stage_input(&self, image_data: &[u8]) -> std::io::Result<tempfile::NamedTempFile> {
        let mut input = tempfile::Builder::new()
            .prefix("ocr_input_")
            .suffix(".png")
            .tempfile_in(&self.temp_dir)?;
        input.write_all(image_data)?;
        input.flush()?;
        Ok(input)
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.default_language);

        // Dropped on every exit path, including a cancelled future
        let input = self
            .stage_input(image_data)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to write temp file: {}", e)))?;

        // "stdout" as output base streams the text instead of writing a .txt file
        let output = tokio::process::Command::new(&self.command)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .kill_on_drop(true)
            .output()
            .await;

        drop(input);

        let output = output
            .map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            confidence: 80.0, // Plain-text mode has no confidence output
            provider: OcrProvider::Tesseract,
        })
    }
}

/// Upper bound on an Ollama reachability check
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Ollama vision model provider
pub struct OllamaProvider {
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match reqwest::Client::new()
            .get(&url)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let client = reqwest::Client::new();
        let url = format!("{}/api/generate", self.base_url);

        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let lang_hint = language
            .map(|l| format!(" The text is in {}.", l))
            .unwrap_or_default();

        let prompt = format!(
            "Extract all text from this scanned identity document exactly as written.{} \
             Return only the extracted text, nothing else.",
            lang_hint
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        });

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = result["response"].as_str().unwrap_or("").trim().to_string();

        Ok(OcrResult {
            text,
            confidence: 75.0, // LLMs don't provide confidence scores
            provider: OcrProvider::Ollama,
        })
    }
}

/// Mock provider for testing
///
/// Returns one scripted text per call, in order, and counts calls.
#[cfg(test)]
pub struct MockProvider {
    pub pages: Vec<String>,
    pub available: bool,
    pub fail: bool,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            available: true,
            fail: false,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_pages(&[])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(
        &self,
        _image_data: &[u8],
        _language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        let index = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            return Err(OcrError::ProcessingError("engine crashed".to_string()));
        }
        Ok(OcrResult {
            text: self.pages.get(index).cloned().unwrap_or_default(),
            confidence: 90.0,
            provider: OcrProvider::Tesseract,
        })
    }
}
