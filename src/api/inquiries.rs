//! Contact inquiries: public submission, admin listing.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AdminUser;
use super::error::ApiError;
use super::metrics::record_inquiry;
use super::validation::inquiry_errors;
use crate::db::{CreateInquiryRequest, Inquiry, Package};
use crate::{AppState, DbPool};

const DEFAULT_LIST_LIMIT: i64 = 100;

/// Store an inquiry after checking that any referenced package exists.
/// Shared by the JSON endpoint and the contact page.
pub async fn submit_inquiry(db: &DbPool, request: CreateInquiryRequest) -> Result<Inquiry, ApiError> {
    if let Some(package_id) = request.package_id.as_deref().filter(|p| !p.trim().is_empty()) {
        if Package::get(db, package_id.trim()).await?.is_none() {
            return Err(ApiError::validation_field("package_id", "Unknown package"));
        }
    }

    let inquiry = Inquiry::create(db, request).await?;
    record_inquiry();
    tracing::info!(inquiry_id = %inquiry.id, package_id = ?inquiry.package_id, "Inquiry received");
    Ok(inquiry)
}

/// POST /api/inquiries
pub async fn create_inquiry(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    inquiry_errors(&request).finish()?;
    let inquiry = submit_inquiry(&state.db, request).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/inquiries
pub async fn list_inquiries(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Inquiry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 1000);
    Ok(Json(Inquiry::list(&state.db, limit).await?))
}
