//! Admin user management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::{generate_token, hash_password, AdminUser};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_email, validate_name, validate_optional_phone, validate_password, validate_status,
};
use crate::db::{NewUser, Role, Session, Status, User, UserResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Generated when omitted and returned once in the response
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn load_user(state: &AppState, id: &str) -> Result<User, ApiError> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/admin/admins
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let admins = User::list_admins(&state.db).await?;
    Ok(Json(admins.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("name", validate_name(&request.name))
        .check("email", validate_email(&request.email))
        .check("phone", validate_optional_phone(request.phone.as_deref()));
    if let Some(password) = &request.password {
        builder.check("password", validate_password(password));
    }
    builder.finish()?;

    if User::find_by_email(&state.db, &request.email).await?.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    // 16 hex chars from a fresh session-strength token
    let generated = request
        .password
        .is_none()
        .then(|| generate_token()[..16].to_string());
    let password = request
        .password
        .as_deref()
        .or(generated.as_deref())
        .unwrap_or_default();
    let password_hash = hash_password(password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create user")
    })?;

    let user = User::create(
        &state.db,
        NewUser {
            name: request.name,
            email: request.email,
            phone: request.phone,
            password_hash: Some(password_hash),
            role: request.role,
            status: request.status,
            ..Default::default()
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, role = %request.role, admin = %admin.email, "User created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: UserResponse::from(user),
            generated_password: generated,
        }),
    ))
}

/// PUT /api/admin/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("name", validate_name(&request.name))
        .check("email", validate_email(&request.email))
        .check("phone", validate_optional_phone(request.phone.as_deref()));
    let status = match validate_status(&request.status) {
        Ok(status) => Some(status),
        Err(e) => {
            builder.add("status", e);
            None
        }
    };
    builder.finish()?;
    let status = status.unwrap_or_default();

    if id == admin.id && status == Status::Inactive {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    if let Some(other) = User::find_by_email(&state.db, &request.email).await? {
        if other.id != id {
            return Err(ApiError::conflict("An account with this email already exists"));
        }
    }

    let updated = User::update_profile(
        &state.db,
        &id,
        &request.name,
        &request.email,
        request.phone.as_deref(),
        status,
    )
    .await?;
    if !updated {
        return Err(ApiError::not_found("User not found"));
    }
    if status == Status::Inactive {
        Session::delete_for_user(&state.db, &id).await?;
    }

    tracing::info!(user_id = %id, admin = %admin.email, "User updated");
    Ok(Json(UserResponse::from(load_user(&state, &id).await?)))
}

/// PUT /api/admin/users/:id/status
///
/// Deactivating an account also ends its sessions.
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let status =
        validate_status(&request.status).map_err(|e| ApiError::validation_field("status", e))?;

    if id == admin.id && status == Status::Inactive {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    if !User::set_status(&state.db, &id, status).await? {
        return Err(ApiError::not_found("User not found"));
    }
    if status == Status::Inactive {
        let ended = Session::delete_for_user(&state.db, &id).await?;
        tracing::debug!(user_id = %id, sessions = ended, "Ended sessions for deactivated user");
    }

    tracing::info!(user_id = %id, %status, admin = %admin.email, "User status changed");
    Ok(Json(UserResponse::from(load_user(&state, &id).await?)))
}

/// POST /api/admin/users/:id/promote
pub async fn promote_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state, &id).await?;
    if user.is_admin() {
        return Err(ApiError::conflict("User is already an admin"));
    }

    User::set_role(&state.db, &id, Role::Admin).await?;
    tracing::info!(user_id = %id, admin = %admin.email, "User promoted to admin");
    Ok(Json(UserResponse::from(load_user(&state, &id).await?)))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if id == admin.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    if !User::delete(&state.db, &id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, admin = %admin.email, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
