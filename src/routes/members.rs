//! Member administration routes
//!
//! Endpoints:
//! - POST /update-payment/ - Set a member's payment status
//! - POST /seed-member/ - Insert a raw member row

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{MemberRepository, SeedMember};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::form::FormData;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update-payment/", post(update_payment))
        .route("/seed-member/", post(seed_member))
}

#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    pub member_id: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub id: i64,
}

/// POST /update-payment/
async fn update_payment(
    State(state): State<AppState>,
    Json(update): Json<PaymentUpdate>,
) -> Result<Json<MessageResponse>> {
    let status = update.status.trim();
    if status.is_empty() {
        return Err(AppError::BadRequest("Status is required".to_string()));
    }

    let updated = MemberRepository::new(state.db())
        .update_status(update.member_id, status)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!("Member {} not found", update.member_id)));
    }

    tracing::info!(member_id = update.member_id, status = %status, "Payment status updated");

    Ok(Json(MessageResponse {
        message: format!("Payment {}.", status),
    }))
}

/// POST /seed-member/
///
/// Multipart of raw member columns, stored as given
async fn seed_member(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SeedResponse>> {
    let form = FormData::read(multipart).await?;

    let seed = SeedMember {
        name: form.require_text("name")?.to_string(),
        contact_no: form.owned("contact_no"),
        membership_no: form.owned("membership_no"),
        active_no: form.owned("active_no"),
        profession: form.owned("profession"),
        designation: form.owned("designation"),
        mandal: form.owned("mandal"),
        dob: form.owned("dob"),
        blood_group: form.owned("blood_group"),
        address: form.owned("address"),
        photo_path: form.owned("photo_path"),
        pdf_proof_path: form.owned("pdf_proof_path"),
        status: form.owned("status"),
    };

    let id = MemberRepository::new(state.db()).seed(&seed).await?;

    Ok(Json(SeedResponse {
        message: "Seeded".to_string(),
        id,
    }))
}
