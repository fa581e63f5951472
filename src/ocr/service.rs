//! OCR Service
//!
//! Orchestrates OCR providers in configured order.

use std::sync::Arc;

use super::{
    provider::{OcrProviderTrait, OllamaProvider, TesseractProvider},
    types::{OcrError, OcrProvider, OcrResult},
};
use crate::config::OcrConfig;

/// OCR service over an ordered provider chain
pub struct OcrService {
    default_language: String,
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a new OCR service from configuration
    pub fn new(config: &OcrConfig) -> Self {
        let providers = config
            .providers
            .iter()
            .map(|kind| -> Arc<dyn OcrProviderTrait> {
                match kind {
                    OcrProvider::Tesseract => Arc::new(TesseractProvider::new(&config.language)),
                    OcrProvider::Ollama => {
                        Arc::new(OllamaProvider::new(&config.ollama_url, &config.ollama_model))
                    }
                }
            })
            .collect();

        Self {
            default_language: config.language.clone(),
            providers,
        }
    }

    /// Create a service over explicit providers
    pub fn with_providers(
        default_language: &str,
        providers: Vec<Arc<dyn OcrProviderTrait>>,
    ) -> Self {
        Self {
            default_language: default_language.to_string(),
            providers,
        }
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Recognize text in a page image, trying providers in order
    pub async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.default_language);
        let mut last_error = None;

        for provider in &self.providers {
            if !provider.is_available().await {
                continue;
            }
            match provider.recognize(image_data, Some(lang)).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {:?} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::ProviderNotAvailable("No OCR providers available".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::MockProvider;

    #[test]
    fn test_service_from_config() {
        let config = OcrConfig {
            providers: vec![OcrProvider::Tesseract, OcrProvider::Ollama],
            ..OcrConfig::default()
        };
        let service = OcrService::new(&config);
        assert_eq!(service.providers.len(), 2);
        assert_eq!(service.providers[1].provider_type(), OcrProvider::Ollama);
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let failing = Arc::new(MockProvider::failing());
        let working = Arc::new(MockProvider::with_pages(&["page text"]));
        let providers: Vec<Arc<dyn OcrProviderTrait>> = vec![failing.clone(), working.clone()];
        let service = OcrService::with_providers("eng", providers);

        let result = service.recognize(b"png", None).await.unwrap();
        assert_eq!(result.text, "page text");
        assert_eq!(failing.call_count(), 1);
        assert_eq!(working.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_providers_are_skipped() {
        let mut offline = MockProvider::with_pages(&["never"]);
        offline.available = false;
        let providers: Vec<Arc<dyn OcrProviderTrait>> = vec![Arc::new(offline)];
        let service = OcrService::with_providers("eng", providers);

        let result = service.recognize(b"png", None).await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
        assert!(service.available_providers().await.is_empty());
    }
}
