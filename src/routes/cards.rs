//! Membership card routes
//!
//! Endpoints:
//! - POST /generate-card/ - Render a member's card into the cards directory
//! - GET /download-card?card_path= - Download a rendered card

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::card::{HeaderValues, RenderError};
use crate::db::MemberRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::form::FormData;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-card/", post(generate_card))
        .route("/download-card", get(download_card))
}

#[derive(Debug, Serialize)]
pub struct GenerateCardResponse {
    pub message: String,
    pub member_id: i64,
    pub membership_no: Option<String>,
    pub card_path: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub card_path: String,
}

/// POST /generate-card/
///
/// Multipart `member_id` or `membership_no`; the id wins when both are given.
async fn generate_card(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerateCardResponse>> {
    let form = FormData::read(multipart).await?;
    let member_id = form.integer("member_id")?.filter(|id| *id > 0);
    let membership_no = form.text("membership_no");

    if member_id.is_none() && membership_no.is_none() {
        return Err(AppError::BadRequest(
            "Provide member_id or membership_no".to_string(),
        ));
    }

    let record = MemberRepository::new(state.db())
        .find(member_id, membership_no)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found in database".to_string()))?;

    let header = HeaderValues::for_record(&record);
    let renderer = state.renderer().clone();
    let member = record.clone();
    let saved = tokio::task::spawn_blocking(move || renderer.render_to_file(&member, &header))
        .await
        .map_err(|e| RenderError::Join(e.to_string()))??;

    Ok(Json(GenerateCardResponse {
        message: "Card generated".to_string(),
        member_id: record.id,
        membership_no: record.membership_no,
        card_path: saved.path.to_string_lossy().into_owned(),
    }))
}

/// GET /download-card?card_path=
///
/// Serves only files inside the cards directory
async fn download_card(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let path = resolve_card_path(state.renderer().cards_dir(), &query.card_path)
        .await
        .ok_or_else(|| AppError::NotFound("Card file not found".to_string()))?;

    let data = tokio::fs::read(&path).await?;
    let filename = format!("membership_card_{}.png", Utc::now().format("%Y%m%d_%H%M%S"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Canonical path of an existing file inside `cards_dir`
async fn resolve_card_path(cards_dir: &Path, requested: &str) -> Option<PathBuf> {
    let root = tokio::fs::canonicalize(cards_dir).await.ok()?;
    let candidate = tokio::fs::canonicalize(requested).await.ok()?;

    if !candidate.starts_with(&root) {
        tracing::warn!(path = %requested, "Refusing card download outside the cards directory");
        return None;
    }

    let metadata = tokio::fs::metadata(&candidate).await.ok()?;
    metadata.is_file().then_some(candidate)
}
