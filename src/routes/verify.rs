//! Registration routes
//!
//! Endpoints:
//! - POST /verify-document/ - Check a claimed EPIC number against an uploaded PDF
//! - POST /submit-details/ - Register a member against a verification token

use std::path::Path;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{generate_membership_no, MemberRecord, MemberRepository, NewMember};
use crate::error::{AppError, Result};
use crate::identifier::Identifier;
use crate::state::AppState;

use super::form::{safe_file_name, FormData};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify-document/", post(verify_document))
        .route("/submit-details/", post(submit_details))
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: String,
    pub verification_token: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub member_id: i64,
    pub membership_no: String,
}

/// POST /verify-document/
///
/// Multipart fields `epic_number` and `pdf_file`. The PDF is kept in the
/// temporary directory until the details are submitted or the token expires.
async fn verify_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VerifyResponse>> {
    let form = FormData::read(multipart).await?;
    let claim = Identifier::normalize_claim(form.require_text("epic_number")?);
    let upload = form.require_file("pdf_file")?;

    let temp_dir = &state.config().paths.temp_upload_dir;
    tokio::fs::create_dir_all(temp_dir).await?;
    let temp_path = temp_dir.join(format!(
        "{}_{}",
        Uuid::new_v4(),
        safe_file_name(&upload.file_name)
    ));
    tokio::fs::write(&temp_path, &upload.data).await?;

    tracing::info!(
        claim = %claim,
        path = %temp_path.display(),
        bytes = upload.data.len(),
        "Verifying identity document"
    );

    let extracted = extract_with_budget(&state, &temp_path).await;

    let identifier = match extracted {
        Some(identifier) if identifier.matches_claim(&claim) => identifier,
        other => {
            discard(&temp_path).await;
            let message = match other {
                Some(found) => format!(
                    "Mismatch: Entered EPIC '{}' does not match PDF EPIC '{}'.",
                    claim, found
                ),
                None => "Could not extract a matching EPIC number from the PDF.".to_string(),
            };
            tracing::info!(claim = %claim, "Verification failed: {}", message);
            return Err(AppError::BadRequest(message));
        }
    };

    let session = state.verification().create(temp_path, identifier).await;

    Ok(Json(VerifyResponse {
        message: "Verification successful. Use this token to submit member details.".to_string(),
        verification_token: session.token.to_string(),
    }))
}

/// Run the extractor under the configured time budget
async fn extract_with_budget(state: &AppState, path: &Path) -> Option<Identifier> {
    let budget = Duration::from_secs(state.config().verification.extraction_timeout_secs);

    match tokio::time::timeout(budget, state.extractor().extract_pdf(path)).await {
        Ok(found) => found,
        Err(_) => {
            tracing::warn!(
                path = %path.display(),
                timeout_secs = budget.as_secs(),
                "Identifier extraction timed out"
            );
            None
        }
    }
}

/// POST /submit-details/
///
/// Multipart fields `verification_token`, `photo_file` and the member details.
async fn submit_details(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>> {
    let form = FormData::read(multipart).await?;
    let token = form.require_text("verification_token")?;
    let member = NewMember::from_fields(&form.fields)?;
    let photo = form.require_file("photo_file")?;

    let session = state.verification().take(token).await?;
    let paths = &state.config().paths;

    let unique_id = &Uuid::new_v4().simple().to_string()[..8];
    let prefix = format!("{}_{}", session.identifier, unique_id);

    let temp_name = session
        .temp_pdf_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");
    let pdf_path = paths.pdf_upload_dir.join(format!("{}_{}", prefix, temp_name));
    let photo_path = paths
        .photo_upload_dir
        .join(format!("{}_{}", prefix, safe_file_name(&photo.file_name)));

    tokio::fs::create_dir_all(&paths.pdf_upload_dir).await?;
    tokio::fs::create_dir_all(&paths.photo_upload_dir).await?;
    move_file(&session.temp_pdf_path, &pdf_path).await?;
    if let Err(e) = tokio::fs::write(&photo_path, &photo.data).await {
        discard(&pdf_path).await;
        return Err(e.into());
    }

    let stored = register(&state, &member, &pdf_path, &photo_path).await;
    let (record, membership_no) = match stored {
        Ok(stored) => stored,
        Err(e) => {
            discard(&pdf_path).await;
            discard(&photo_path).await;
            return Err(e);
        }
    };

    tracing::info!(
        member_id = record.id,
        membership_no = %membership_no,
        identifier = %session.identifier,
        "Member registered"
    );

    Ok(Json(SubmitResponse {
        message: "Details submitted. Proceed to payment.".to_string(),
        member_id: record.id,
        membership_no,
    }))
}

/// Insert the member row and assign its membership number
async fn register(
    state: &AppState,
    member: &NewMember,
    pdf_path: &Path,
    photo_path: &Path,
) -> Result<(MemberRecord, String)> {
    let repo = MemberRepository::new(state.db());
    let record = repo
        .create(
            member,
            &pdf_path.to_string_lossy(),
            &photo_path.to_string_lossy(),
        )
        .await?;

    let membership_no = generate_membership_no(record.id, Utc::now());
    repo.assign_membership_no(record.id, &membership_no).await?;

    Ok((record, membership_no))
}

/// Rename, falling back to copy + delete across filesystems
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to delete uploaded file");
    }
}
