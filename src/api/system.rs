//! Site-level endpoints: health, Firebase client config and dashboard stats.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use super::auth::AdminUser;
use super::error::ApiError;
use crate::db::{self, SiteStats};
use crate::firebase::FirebaseClientConfig;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub environment: String,
}

/// GET /health
///
/// Reports 503 when the database does not answer, so load balancers can act on it.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = db::test_connection(&state.db).await;
    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            database,
            environment: state.config.environment.to_string(),
        }),
    )
}

/// GET /api/firebase/config
///
/// The public client keys the browser needs to initialise the SDK. Service
/// account credentials never leave the server.
pub async fn firebase_config(State(state): State<Arc<AppState>>) -> Json<FirebaseClientConfig> {
    Json(state.config.firebase.client.clone())
}

/// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<SiteStats>, ApiError> {
    Ok(Json(SiteStats::collect(&state.db).await?))
}
