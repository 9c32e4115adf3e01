//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! This module provides:
//! - A `/metrics` endpoint that returns Prometheus-formatted metrics
//! - Middleware for tracking HTTP request counts and durations
//! - Helpers to record sign-ins and inquiries

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::db::SiteStats;
use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const LOGINS_TOTAL: &str = "logins_total";
pub const INQUIRIES_TOTAL: &str = "inquiries_total";
pub const PACKAGES_ACTIVE: &str = "packages_active";
pub const PACKAGES_FEATURED: &str = "packages_featured";
pub const USERS_TOTAL: &str = "users_total";

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Call once during startup; a second install fails.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_counter!(LOGINS_TOTAL, "Sign-in attempts by method and outcome");
    describe_counter!(INQUIRIES_TOTAL, "Contact inquiries received");
    describe_gauge!(PACKAGES_ACTIVE, "Number of active packages");
    describe_gauge!(PACKAGES_FEATURED, "Number of featured packages");
    describe_gauge!(USERS_TOTAL, "Number of customer accounts");

    Ok(handle)
}

/// GET /metrics - Returns Prometheus-formatted metrics.
///
/// This endpoint is accessible without authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    update_gauge_metrics(&state).await;

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}

async fn update_gauge_metrics(state: &AppState) {
    match SiteStats::collect(&state.db).await {
        Ok(stats) => {
            gauge!(PACKAGES_ACTIVE).set(stats.packages as f64);
            gauge!(PACKAGES_FEATURED).set(stats.featured as f64);
            gauge!(USERS_TOTAL).set(stats.users as f64);
        }
        Err(e) => tracing::warn!("Failed to refresh gauge metrics: {}", e),
    }
}

/// Middleware to track HTTP request metrics.
///
/// Records:
/// - `http_requests_total` counter with method, path, and status labels
/// - `http_request_duration_seconds` histogram with method and path labels
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Matched route pattern keeps label cardinality bounded (/package/:id)
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Sign-in method label values
#[derive(Debug, Clone, Copy)]
pub enum LoginMethod {
    Password,
    Google,
    AdminGoogle,
}

impl LoginMethod {
    fn as_str(&self) -> &'static str {
        match self {
            LoginMethod::Password => "password",
            LoginMethod::Google => "google",
            LoginMethod::AdminGoogle => "admin_google",
        }
    }
}

pub fn record_login(method: LoginMethod, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(LOGINS_TOTAL, "method" => method.as_str(), "outcome" => outcome).increment(1);
}

pub fn record_inquiry() {
    counter!(INQUIRIES_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(HTTP_REQUESTS_TOTAL.ends_with("_total"));
        assert!(LOGINS_TOTAL.ends_with("_total"));
        assert!(INQUIRIES_TOTAL.ends_with("_total"));
        assert!(HTTP_REQUEST_DURATION_SECONDS.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_login(LoginMethod::AdminGoogle, false);
        record_inquiry();
    }
}
