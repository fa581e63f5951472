//! Health check route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::OcrProvider;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// OCR engines that answered a reachability check
    pub ocr_providers: Vec<OcrProvider>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ocr_providers: state.extractor().ocr().available_providers().await,
    })
}
