pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod firebase;
pub mod startup;
pub mod ui;

pub use db::DbPool;

use axum::{middleware, Router};
use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::api::rate_limit::RateLimiter;
use crate::firebase::{GoogleKeyVerifier, IdTokenVerifier};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics_handle: Option<PrometheusHandle>,
    /// Checks Firebase ID tokens on Google sign-in
    pub id_tokens: Arc<dyn IdTokenVerifier>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let id_tokens = Arc::new(GoogleKeyVerifier::new(&config.firebase));
        Self {
            config,
            db,
            rate_limiter,
            metrics_handle: None,
            id_tokens,
        }
    }

    /// Replace the ID token verifier
    pub fn with_id_token_verifier(mut self, verifier: Arc<dyn IdTokenVerifier>) -> Self {
        self.id_tokens = verifier;
        self
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// The full site: JSON API plus HTML pages and static assets.
pub fn app(state: Arc<AppState>) -> Router {
    api::create_router(state.clone())
        .merge(ui::create_router(state))
        .layer(middleware::from_fn(api::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}
