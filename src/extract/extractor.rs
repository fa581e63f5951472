//! Identifier extraction: text layer first, OCR fallback

use std::path::Path;
use std::sync::Arc;

use crate::identifier::{find_identifier, Identifier};
use crate::ocr::OcrService;

use super::{ExtractError, PageSource, PdfPages};

/// Default rasterization resolution for the OCR pass
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Which pass produced an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPass {
    TextLayer,
    Ocr,
}

/// Extracts an EPIC identifier from a page-oriented document
pub struct IdentifierExtractor {
    ocr: OcrService,
    dpi: u32,
    language: String,
}

impl IdentifierExtractor {
    pub fn new(ocr: OcrService, dpi: u32, language: &str) -> Self {
        Self {
            ocr,
            dpi,
            language: language.to_string(),
        }
    }

    pub fn ocr(&self) -> &OcrService {
        &self.ocr
    }

    /// Extract an identifier, collapsing every fault to `None`
    pub async fn extract<S: PageSource>(&self, source: S) -> Option<Identifier> {
        match self.try_extract(source).await {
            Ok(found) => found.map(|(identifier, _)| identifier),
            Err(e) => {
                tracing::warn!(error = %e, "Identifier extraction failed");
                None
            }
        }
    }

    /// Extract an identifier from a PDF on disk. Unreadable files yield `None`.
    pub async fn extract_pdf(&self, path: &Path) -> Option<Identifier> {
        let owned = path.to_path_buf();
        let opened = tokio::task::spawn_blocking(move || PdfPages::from_path(owned))
            .await
            .map_err(|e| ExtractError::Join(e.to_string()));

        match opened {
            Ok(Ok(pages)) => self.extract(pages).await,
            Ok(Err(e)) | Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not open PDF");
                None
            }
        }
    }

    /// Extract an identifier, reporting the pass that found it or the fault that stopped it
    pub async fn try_extract<S: PageSource>(
        &self,
        source: S,
    ) -> Result<Option<(Identifier, ExtractionPass)>, ExtractError> {
        let source = Arc::new(source);

        let text_source = Arc::clone(&source);
        let text = tokio::task::spawn_blocking(move || text_source.page_texts())
            .await
            .map_err(|e| ExtractError::Join(e.to_string()))??
            .join("\n");

        if let Some(identifier) = find_identifier(&text) {
            tracing::debug!(identifier = %identifier, "Identifier found in text layer");
            return Ok(Some((identifier, ExtractionPass::TextLayer)));
        }

        tracing::debug!("No identifier in text layer, falling back to OCR");

        let dpi = self.dpi;
        let images = tokio::task::spawn_blocking(move || source.rasterize_pages(dpi))
            .await
            .map_err(|e| ExtractError::Join(e.to_string()))??;

        let mut ocr_text = String::new();
        for (index, image) in images.iter().enumerate() {
            let result = self.ocr.recognize(image, Some(&self.language)).await?;
            tracing::debug!(
                page = index + 1,
                provider = ?result.provider,
                chars = result.text.len(),
                "OCR page recognized"
            );
            ocr_text.push_str(&result.text);
            ocr_text.push('\n');
        }

        Ok(find_identifier(&ocr_text).map(|identifier| {
            tracing::debug!(identifier = %identifier, "Identifier found by OCR");
            (identifier, ExtractionPass::Ocr)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{single_page_pdf, StaticPages};
    use crate::ocr::{MockProvider, OcrProviderTrait};

    fn extractor_with(provider: Arc<MockProvider>) -> IdentifierExtractor {
        IdentifierExtractor::new(
            OcrService::with_providers("eng", vec![provider as Arc<dyn OcrProviderTrait>]),
            DEFAULT_OCR_DPI,
            "eng",
        )
    }

    #[tokio::test]
    async fn test_text_layer_match_skips_ocr() {
        let ocr = Arc::new(MockProvider::with_pages(&["ZZZ9999999"]));
        let extractor = extractor_with(ocr.clone());

        let pages = StaticPages::new(&["ELECTION COMMISSION", "EPIC No.\nABC1234567"]);
        let found = extractor.try_extract(pages).await.unwrap();

        assert_eq!(
            found,
            Some((Identifier::parse("ABC1234567").unwrap(), ExtractionPass::TextLayer))
        );
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ocr_fallback_without_text_layer() {
        let ocr = Arc::new(MockProvider::with_pages(&["front side", "Identity Card\nTNB7654321"]));
        let extractor = extractor_with(ocr.clone());

        let found = extractor.try_extract(StaticPages::new(&["", ""])).await.unwrap();

        assert_eq!(
            found,
            Some((Identifier::parse("TNB7654321").unwrap(), ExtractionPass::Ocr))
        );
        assert_eq!(ocr.call_count(), 2);
    }

    #[tokio::test]
    async fn test_ocr_pages_are_not_merged_into_one_token() {
        // "ABC" ends page one, "1234567" starts page two
        let ocr = Arc::new(MockProvider::with_pages(&["ABC", "1234567"]));
        let extractor = extractor_with(ocr);

        assert!(extractor.extract(StaticPages::new(&["", ""])).await.is_none());
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let ocr = Arc::new(MockProvider::with_pages(&["no code here"]));
        let extractor = extractor_with(ocr);

        let found = extractor.extract(StaticPages::new(&["just some text"])).await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_ocr_failure_collapses_to_none() {
        let extractor = extractor_with(Arc::new(MockProvider::failing()));
        let pages = StaticPages::new(&[""]);

        assert!(extractor.extract(pages).await.is_none());

        let pages = StaticPages::new(&[""]);
        let err = extractor.try_extract(pages).await.unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(_)));
    }

    #[tokio::test]
    async fn test_rasterize_failure_collapses_to_none() {
        let extractor = extractor_with(Arc::new(MockProvider::with_pages(&["ABC1234567"])));
        let mut pages = StaticPages::new(&["nothing"]);
        pages.fail_rasterize = true;

        assert!(extractor.extract(pages).await.is_none());
    }

    #[tokio::test]
    async fn test_document_without_pages() {
        let ocr = Arc::new(MockProvider::with_pages(&[]));
        let extractor = extractor_with(ocr.clone());

        assert!(extractor.extract(StaticPages::new(&[])).await.is_none());
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_on_disk() {
        let ocr = Arc::new(MockProvider::with_pages(&["ABC1234567"]));
        let extractor = extractor_with(ocr.clone());
        let dir = tempfile::TempDir::new().unwrap();

        let corrupt = dir.path().join("corrupt.pdf");
        std::fs::write(&corrupt, b"definitely not a pdf").unwrap();
        assert!(extractor.extract_pdf(&corrupt).await.is_none());
        assert!(extractor.extract_pdf(&dir.path().join("missing.pdf")).await.is_none());
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pdf_text_layer_needs_no_ocr() {
        let ocr = Arc::new(MockProvider::with_pages(&["ZZZ9999999"]));
        let extractor = extractor_with(ocr.clone());

        let pages = PdfPages::from_bytes(single_page_pdf("EPIC No ABC1234567")).unwrap();
        let found = extractor.try_extract(pages).await.unwrap();
        assert_eq!(
            found,
            Some((Identifier::parse("ABC1234567").unwrap(), ExtractionPass::TextLayer))
        );

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("voter.pdf");
        std::fs::write(&path, single_page_pdf("EPIC No ABC1234567")).unwrap();
        assert_eq!(
            extractor.extract_pdf(&path).await,
            Some(Identifier::parse("ABC1234567").unwrap())
        );
        assert_eq!(ocr.call_count(), 0);
    }
}
