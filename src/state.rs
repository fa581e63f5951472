//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::card::CardRenderer;
use crate::config::Config;
use crate::extract::IdentifierExtractor;
use crate::ocr::OcrService;
use crate::verification::VerificationStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    verification: VerificationStore,
    extractor: IdentifierExtractor,
    renderer: CardRenderer,
}

impl AppState {
    /// Build state from configuration with the configured OCR providers
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let ocr = OcrService::new(&config.ocr);
        let extractor = IdentifierExtractor::new(ocr, config.ocr.dpi, &config.ocr.language);
        Self::with_extractor(config, db, extractor)
    }

    /// Build state around a specific extractor
    pub fn with_extractor(config: Config, db: SqlitePool, extractor: IdentifierExtractor) -> Self {
        let verification = VerificationStore::new(config.verification.ttl_minutes);
        let renderer = CardRenderer::new(&config.paths, &config.card);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                verification,
                extractor,
                renderer,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the verification session store
    pub fn verification(&self) -> &VerificationStore {
        &self.inner.verification
    }

    /// Get the identifier extractor
    pub fn extractor(&self) -> &IdentifierExtractor {
        &self.inner.extractor
    }

    /// Get the card renderer
    pub fn renderer(&self) -> &CardRenderer {
        &self.inner.renderer
    }
}
