//! Package catalogue endpoints.
//!
//! Reads are public and default to active packages; writes need an admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AdminUser, MaybeUser};
use super::error::ApiError;
use super::validation::{validate_create_package, validate_status, validate_update_package};
use crate::db::{CreatePackageRequest, Package, PackageFilter, Status, UpdatePackageRequest};
use crate::AppState;

/// Query string for `GET /api/packages`. Values arrive as strings so bad
/// input becomes a validation error instead of a bare 400.
#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    pub featured: Option<String>,
    pub status: Option<String>,
    pub destination: Option<String>,
    pub limit: Option<i64>,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl PackageQuery {
    /// Anonymous callers and customers only ever see active packages;
    /// admins may ask for any status.
    fn into_filter(self, is_admin: bool) -> Result<PackageFilter, ApiError> {
        let featured = match self.featured.as_deref().filter(|v| !v.is_empty()) {
            Some(v) => Some(parse_flag(v).ok_or_else(|| {
                ApiError::validation_field("featured", "featured must be true or false")
            })?),
            None => None,
        };

        let requested = match self.status.as_deref().filter(|v| !v.is_empty()) {
            Some("all") if is_admin => None,
            Some(v) => {
                Some(validate_status(v).map_err(|e| ApiError::validation_field("status", e))?)
            }
            None if is_admin => None,
            None => Some(Status::Active),
        };
        let status = if is_admin { requested } else { Some(Status::Active) };

        if let Some(limit) = self.limit {
            if limit < 1 {
                return Err(ApiError::validation_field("limit", "limit must be positive"));
            }
        }

        Ok(PackageFilter {
            featured,
            status,
            destination: self.destination,
            limit: self.limit,
        })
    }
}

/// GET /api/packages
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PackageQuery>,
) -> Result<Json<Vec<Package>>, ApiError> {
    let is_admin = user.map(|u| u.is_active_admin()).unwrap_or(false);
    let filter = query.into_filter(is_admin)?;
    Ok(Json(Package::list(&state.db, &filter).await?))
}

/// GET /api/packages/:id
///
/// Inactive packages are hidden from everyone but admins.
pub async fn get_package(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Package>, ApiError> {
    let is_admin = user.map(|u| u.is_active_admin()).unwrap_or(false);
    match Package::get(&state.db, &id).await? {
        Some(package) if package.is_active() || is_admin => Ok(Json(package)),
        _ => Err(ApiError::not_found("Package not found")),
    }
}

/// POST /api/admin/packages
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreatePackageRequest>,
) -> Result<(StatusCode, Json<Package>), ApiError> {
    validate_create_package(&request)?;

    let package = Package::create(&state.db, request).await?;
    tracing::info!(package_id = %package.id, admin = %admin.email, "Package created");
    Ok((StatusCode::CREATED, Json(package)))
}

/// PUT /api/admin/packages/:id
pub async fn update_package(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<UpdatePackageRequest>,
) -> Result<Json<Package>, ApiError> {
    let current = Package::get(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Package not found"))?;
    validate_update_package(&request, &current)?;

    let package = Package::update(&state.db, &id, request)
        .await?
        .ok_or_else(|| ApiError::not_found("Package not found"))?;
    tracing::info!(package_id = %id, admin = %admin.email, "Package updated");
    Ok(Json(package))
}

/// DELETE /api/admin/packages/:id
pub async fn delete_package(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !Package::delete(&state.db, &id).await? {
        return Err(ApiError::not_found("Package not found"));
    }
    tracing::info!(package_id = %id, admin = %admin.email, "Package deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_query_is_forced_active() {
        let query = PackageQuery {
            status: Some("inactive".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter(false).unwrap();
        assert_eq!(filter.status, Some(Status::Active));
    }

    #[test]
    fn test_admin_query_can_see_all() {
        let filter = PackageQuery::default().into_filter(true).unwrap();
        assert_eq!(filter.status, None);

        let query = PackageQuery {
            status: Some("inactive".to_string()),
            featured: Some("true".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter(true).unwrap();
        assert_eq!(filter.status, Some(Status::Inactive));
        assert_eq!(filter.featured, Some(true));
    }

    #[test]
    fn test_bad_query_values_rejected() {
        let query = PackageQuery {
            featured: Some("maybe".to_string()),
            ..Default::default()
        };
        assert!(query.into_filter(false).is_err());

        let query = PackageQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(query.into_filter(false).is_err());
    }
}
