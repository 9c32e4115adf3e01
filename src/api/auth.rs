use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::metrics::{record_login, LoginMethod};
use super::validation::{validate_email, validate_register, validate_required};
use crate::config::Config;
use crate::db::{
    timestamp_in_days, GoogleLoginRequest, LoginRequest, LoginResponse, NewUser, RegisterRequest,
    Role, Session, Status, User, UserResponse,
};
use crate::firebase::VerifiedIdentity;
use crate::{AppState, DbPool};

/// Name of the HTTP-only cookie carrying the session token
pub const SESSION_COOKIE: &str = "apni_session";

/// Firebase ID tokens are around 1 KB; anything far larger is not one
const MAX_ID_TOKEN_LEN: usize = 4096;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token: 32 bytes, hex encoded
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build the session cookie for a freshly issued token
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.auth.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Extract the session token: `Authorization: Bearer` first, then the cookie
pub fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve a token to its active user, or `None` if the session is missing,
/// expired, or belongs to a deactivated account.
pub async fn user_for_token(db: &DbPool, token: &str) -> Result<Option<User>, sqlx::Error> {
    let token_hash = hash_token(token);
    let Some(session) = Session::find_valid(db, &token_hash).await? else {
        return Ok(None);
    };

    let user = User::find_by_id(db, &session.user_id).await?;
    Ok(user.filter(User::is_active))
}

/// Create a session for the user and record the sign-in.
/// Returns the raw token; only its hash is stored.
pub async fn start_session(
    db: &DbPool,
    config: &Config,
    user: &User,
    firebase_uid: Option<&str>,
    photo_url: Option<&str>,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let expires_at = timestamp_in_days(config.auth.session_days);
    Session::create(db, &user.id, &hash_token(&token), &expires_at).await?;
    User::touch_login(db, &user.id, firebase_uid, photo_url).await?;
    Ok(token)
}

/// Why a password sign-in was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    InvalidCredentials,
    Disabled,
}

impl LoginFailure {
    pub fn message(&self) -> &'static str {
        match self {
            LoginFailure::InvalidCredentials => "Invalid email or password",
            LoginFailure::Disabled => "This account has been deactivated",
        }
    }
}

impl From<LoginFailure> for ApiError {
    fn from(failure: LoginFailure) -> Self {
        match failure {
            LoginFailure::InvalidCredentials => ApiError::unauthorized(failure.message()),
            LoginFailure::Disabled => ApiError::forbidden(failure.message()),
        }
    }
}

/// Check an email/password pair. Unknown emails, Google-only accounts and
/// wrong passwords are all reported as invalid credentials.
pub async fn authenticate_password(
    db: &DbPool,
    email: &str,
    password: &str,
) -> Result<Result<User, LoginFailure>, sqlx::Error> {
    let Some(user) = User::find_by_email(db, email).await? else {
        return Ok(Err(LoginFailure::InvalidCredentials));
    };

    let verified = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(password, hash))
        .unwrap_or(false);
    if !verified {
        return Ok(Err(LoginFailure::InvalidCredentials));
    }
    if !user.is_active() {
        return Ok(Err(LoginFailure::Disabled));
    }
    Ok(Ok(user))
}

fn login_response(
    jar: CookieJar,
    state: &AppState,
    token: String,
    user: User,
) -> (CookieJar, Json<LoginResponse>) {
    let jar = jar.add(session_cookie(token.clone(), &state.config));
    (
        jar,
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    )
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    builder
        .check("email", validate_email(&request.email))
        .check("password", validate_required(&request.password, "Password", 128));
    builder.finish()?;

    let user = match authenticate_password(&state.db, &request.email, &request.password).await? {
        Ok(user) => user,
        Err(failure) => {
            record_login(LoginMethod::Password, false);
            tracing::info!(reason = ?failure, "Password sign-in refused");
            return Err(failure.into());
        }
    };

    let token = start_session(&state.db, &state.config, &user, None, None).await?;
    record_login(LoginMethod::Password, true);
    tracing::info!(user_id = %user.id, "User signed in with password");

    Ok(login_response(jar, &state, token, user))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), ApiError> {
    validate_register(&request)?;

    if User::find_by_email(&state.db, &request.email).await?.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create account")
    })?;

    let user = User::create(
        &state.db,
        NewUser {
            name: request.name,
            email: request.email,
            phone: request.phone,
            password_hash: Some(password_hash),
            role: Role::User,
            status: Status::Active,
            ..Default::default()
        },
    )
    .await?;

    let token = start_session(&state.db, &state.config, &user, None, None).await?;
    tracing::info!(user_id = %user.id, "Registered new account");

    let (jar, body) = login_response(jar, &state, token, user);
    Ok((StatusCode::CREATED, jar, body))
}

/// Verify the posted ID token. Nothing the browser says about the account
/// is used unless Google signed it.
async fn verify_google(
    state: &AppState,
    request: &GoogleLoginRequest,
    method: LoginMethod,
) -> Result<VerifiedIdentity, ApiError> {
    let mut builder = ValidationErrorBuilder::new();
    builder.check(
        "id_token",
        validate_required(&request.id_token, "ID token", MAX_ID_TOKEN_LEN),
    );
    builder.finish()?;

    let identity = match state.id_tokens.verify(request.id_token.trim()).await {
        Ok(identity) => identity,
        Err(e) if e.is_unavailable() => {
            tracing::error!("Google sign-in unavailable: {}", e);
            return Err(ApiError::service_unavailable(
                "Google sign-in is not available right now",
            ));
        }
        Err(e) => {
            record_login(method, false);
            tracing::warn!(reason = %e, "Rejected Google ID token");
            return Err(ApiError::unauthorized("Invalid Google sign-in"));
        }
    };

    let mut builder = ValidationErrorBuilder::new();
    builder.check("email", validate_email(&identity.email));
    builder.finish()?;
    Ok(identity)
}

fn display_name(identity: &VerifiedIdentity) -> String {
    identity
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or(&identity.email)
                .to_string()
        })
}

/// An existing account may only be entered through Google when it is not
/// yet linked, or is linked to this same Firebase user.
fn check_linked_uid(user: &User, identity: &VerifiedIdentity) -> Result<(), ApiError> {
    match user.firebase_uid.as_deref() {
        Some(uid) if uid != identity.uid => {
            tracing::warn!(user_id = %user.id, "Google account does not match linked account");
            Err(ApiError::forbidden(
                "This email is linked to a different Google account",
            ))
        }
        _ => Ok(()),
    }
}

/// POST /api/auth/google
///
/// The browser has already signed in through Firebase and posts the ID
/// token; an unknown verified email becomes a new customer account.
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let identity = verify_google(&state, &request, LoginMethod::Google).await?;

    let user = match User::find_by_email(&state.db, &identity.email).await? {
        Some(user) if !user.is_active() => {
            record_login(LoginMethod::Google, false);
            return Err(LoginFailure::Disabled.into());
        }
        Some(user) => {
            if let Err(e) = check_linked_uid(&user, &identity) {
                record_login(LoginMethod::Google, false);
                return Err(e);
            }
            user
        }
        None => {
            let user = User::create(
                &state.db,
                NewUser {
                    name: display_name(&identity),
                    email: identity.email.clone(),
                    firebase_uid: Some(identity.uid.clone()),
                    photo_url: identity.picture.clone(),
                    role: Role::User,
                    status: Status::Active,
                    ..Default::default()
                },
            )
            .await?;
            tracing::info!(user_id = %user.id, "Created account from Google sign-in");
            user
        }
    };

    let token = start_session(
        &state.db,
        &state.config,
        &user,
        Some(&identity.uid),
        identity.picture.as_deref(),
    )
    .await?;
    record_login(LoginMethod::Google, true);

    Ok(login_response(jar, &state, token, user))
}

/// POST /api/auth/admin/google
///
/// Allowed for active admins, and for emails listed in `auth.admin_emails`
/// which are created or promoted on first sign-in.
pub async fn admin_google_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let identity = verify_google(&state, &request, LoginMethod::AdminGoogle).await?;

    let listed = state.config.auth.is_listed_admin(&identity.email);
    let existing = User::find_by_email(&state.db, &identity.email).await?;

    if let Some(user) = &existing {
        if let Err(e) = check_linked_uid(user, &identity) {
            record_login(LoginMethod::AdminGoogle, false);
            return Err(e);
        }
    }

    let user = match existing {
        Some(user) if !user.is_active() => {
            record_login(LoginMethod::AdminGoogle, false);
            return Err(LoginFailure::Disabled.into());
        }
        Some(user) if user.is_admin() => user,
        Some(user) if listed => {
            User::set_role(&state.db, &user.id, Role::Admin).await?;
            tracing::info!(user_id = %user.id, "Promoted listed admin email");
            User::find_by_id(&state.db, &user.id)
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?
        }
        None if listed => {
            let user = User::create(
                &state.db,
                NewUser {
                    name: display_name(&identity),
                    email: identity.email.clone(),
                    firebase_uid: Some(identity.uid.clone()),
                    photo_url: identity.picture.clone(),
                    role: Role::Admin,
                    status: Status::Active,
                    ..Default::default()
                },
            )
            .await?;
            tracing::info!(user_id = %user.id, "Created admin account for listed email");
            user
        }
        _ => {
            record_login(LoginMethod::AdminGoogle, false);
            tracing::warn!("Admin sign-in refused for non-admin account");
            return Err(ApiError::forbidden("Admin privileges required"));
        }
    };

    let token = start_session(
        &state.db,
        &state.config,
        &user,
        Some(&identity.uid),
        identity.picture.as_deref(),
    )
    .await?;
    record_login(LoginMethod::AdminGoogle, true);

    Ok(login_response(jar, &state, token, user))
}

/// End the session behind `token`, if any
pub async fn end_session(db: &DbPool, token: Option<&str>) -> Result<(), sqlx::Error> {
    if let Some(token) = token {
        Session::delete_by_token_hash(db, &hash_token(token)).await?;
    }
    Ok(())
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let token = extract_token(&headers, &jar);
    end_session(&state.db, token.as_deref()).await?;
    Ok((jar.remove(removal_cookie()), StatusCode::NO_CONTENT))
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Remove the session cookie from a jar (used by the HTML logout page)
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(removal_cookie())
}

/// Any signed-in, active user
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// A signed-in, active admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// The signed-in user when there is one; pages render for anonymous visitors too
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(token) = extract_token(&parts.headers, &jar) else {
        return Ok(None);
    };
    Ok(user_for_token(&state.db, &token).await?)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state)
            .await?
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_active_admin() {
            return Err(ApiError::forbidden("Admin privileges required"));
        }
        Ok(AdminUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::warn!("Could not resolve session for page: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}

/// Purge expired sessions on an interval
pub fn spawn_session_cleanup_task(db: DbPool, interval_secs: u64) {
    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval_secs.max(1));
        loop {
            tokio::time::sleep(interval).await;
            match Session::purge_expired(&db).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Purged {} expired sessions", n),
                Err(e) => tracing::warn!("Session cleanup failed: {}", e),
            }
        }
    });
}
