// Server-rendered site pages
// Askama templates for the pages, rust-embed for the static assets

mod templates;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::CookieJar;
use rust_embed::RustEmbed;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::auth::{self, MaybeUser};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::metrics::{record_login, LoginMethod};
use crate::api::rate_limit::rate_limit_form;
use crate::api::submit_inquiry;
use crate::api::validation::inquiry_errors;
use crate::db::{CreateInquiryRequest, Package, PackageFilter};
use crate::AppState;

pub use templates::*;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Form posts share the form rate-limit tier
    let form_routes = Router::new()
        .route("/contact", get(contact_page).post(contact_submit))
        .route("/auth/login", get(login_page).post(login_submit))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_form));

    Router::new()
        .route("/", get(home))
        .route("/packages", get(packages_page))
        .route("/package/:id", get(package_detail))
        .route("/auth/logout", get(logout))
        .route("/static/*path", get(static_asset))
        .merge(form_routes)
        .fallback(not_found)
        .with_state(state)
}

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    render_with_status(StatusCode::OK, template)
}

fn render_with_status<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

fn error_page(
    state: &AppState,
    user: &MaybeUser,
    status: StatusCode,
    heading: &str,
    message: &str,
) -> Response {
    let template = ErrorTemplate {
        page: PageContext::new(state, user, heading, ""),
        status: status.as_u16(),
        heading: heading.to_string(),
        message: message.to_string(),
    };
    render_with_status(status, template)
}

/// Log the cause and show a generic page; error text never reaches the browser
fn server_error(state: &AppState, user: &MaybeUser, error: impl std::fmt::Display) -> Response {
    tracing::error!("Page request failed: {}", error);
    error_page(
        state,
        user,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong",
        "We could not load this page. Please try again in a moment.",
    )
}

fn package_not_found(state: &AppState, user: &MaybeUser) -> Response {
    error_page(
        state,
        user,
        StatusCode::NOT_FOUND,
        "Package not found",
        "This package is no longer available. Have a look at our other trips.",
    )
}

/// Public pages only show inactive packages to admins
async fn visible_package(
    state: &AppState,
    user: &MaybeUser,
    id: &str,
) -> Result<Option<Package>, sqlx::Error> {
    let is_admin = user.0.as_ref().map(|u| u.is_active_admin()).unwrap_or(false);
    let package = Package::get(&state.db, id).await?;
    Ok(package.filter(|p| is_admin || p.is_active()))
}

// Home
async fn home(State(state): State<Arc<AppState>>, user: MaybeUser) -> Response {
    let filter = PackageFilter::featured(state.config.ui.featured_limit);
    let featured = match Package::list(&state.db, &filter).await {
        Ok(p) => p,
        Err(e) => return server_error(&state, &user, e),
    };
    let destinations = match Package::destinations(&state.db).await {
        Ok(d) => d,
        Err(e) => return server_error(&state, &user, e),
    };

    render_template(IndexTemplate {
        page: PageContext::new(&state, &user, "Home", "home"),
        featured,
        destinations,
    })
}

#[derive(Debug, Default, Deserialize)]
struct PackagesQuery {
    destination: Option<String>,
}

// Package catalogue
async fn packages_page(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Query(query): Query<PackagesQuery>,
) -> Response {
    let selected = query
        .destination
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let filter = PackageFilter {
        destination: selected.clone(),
        ..PackageFilter::active()
    };
    let packages = match Package::list(&state.db, &filter).await {
        Ok(p) => p,
        Err(e) => return server_error(&state, &user, e),
    };
    let destinations = match Package::destinations(&state.db).await {
        Ok(d) => d,
        Err(e) => return server_error(&state, &user, e),
    };

    render_template(PackagesTemplate {
        page: PageContext::new(&state, &user, "Tour packages", "packages"),
        packages,
        destinations,
        selected,
    })
}

// Package detail with its enquiry form
async fn package_detail(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Response {
    match visible_package(&state, &user, &id).await {
        Ok(Some(package)) => render_template(PackageDetailTemplate {
            page: PageContext::new(&state, &user, package.title.clone(), "packages"),
            package,
            form: FormState::default(),
        }),
        Ok(None) => package_not_found(&state, &user),
        Err(e) => server_error(&state, &user, e),
    }
}

// Contact page
async fn contact_page(State(state): State<Arc<AppState>>, user: MaybeUser) -> Response {
    render_contact(&state, &user, FormState::default(), None).await
}

async fn render_contact(
    state: &AppState,
    user: &MaybeUser,
    form: FormState,
    flash: Option<Flash>,
) -> Response {
    let packages = match Package::list(&state.db, &PackageFilter::active()).await {
        Ok(p) => p,
        Err(e) => return server_error(state, user, e),
    };
    let mut page = PageContext::new(state, user, "Contact us", "contact");
    page.flash = flash;
    render_template(ContactTemplate {
        page,
        packages,
        form,
    })
}

/// Re-render whichever page the form was posted from
async fn render_inquiry_form(
    state: &AppState,
    user: &MaybeUser,
    package: Option<Package>,
    form: FormState,
    flash: Option<Flash>,
) -> Response {
    match package {
        Some(package) => {
            let mut page = PageContext::new(state, user, package.title.clone(), "packages");
            page.flash = flash;
            render_template(PackageDetailTemplate {
                page,
                package,
                form,
            })
        }
        None => render_contact(state, user, form, flash).await,
    }
}

fn inquiry_values(req: &CreateInquiryRequest) -> HashMap<String, String> {
    let optional = |v: &Option<String>| v.clone().unwrap_or_default();
    HashMap::from([
        ("name".to_string(), req.name.clone()),
        ("email".to_string(), req.email.clone()),
        ("phone".to_string(), optional(&req.phone)),
        ("subject".to_string(), optional(&req.subject)),
        ("message".to_string(), req.message.clone()),
        ("package_id".to_string(), optional(&req.package_id)),
    ])
}

// Contact / enquiry submission. Invalid input re-renders the form in place.
async fn contact_submit(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Form(request): Form<CreateInquiryRequest>,
) -> Response {
    let mut errors: ValidationErrorBuilder = inquiry_errors(&request);

    let package_id = request
        .package_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let package = match package_id {
        Some(id) => match visible_package(&state, &user, id).await {
            Ok(Some(package)) => Some(package),
            Ok(None) => {
                errors.add("package_id", "Please choose a package from the list");
                None
            }
            Err(e) => return server_error(&state, &user, e),
        },
        None => None,
    };

    if !errors.is_empty() {
        let form = FormState::submitted(inquiry_values(&request), errors.into_errors());
        return render_inquiry_form(&state, &user, package, form, None).await;
    }

    match submit_inquiry(&state.db, request).await {
        Ok(_) => {
            let flash = Flash::success("Thank you! Our travel team will contact you shortly.");
            render_inquiry_form(&state, &user, package, FormState::default(), Some(flash)).await
        }
        Err(e) => server_error(&state, &user, e),
    }
}

/// Only same-site paths; anything else lands on the home page.
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// `//host`; control characters and whitespace are refused outright.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

// Login page
async fn login_page(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref());
    if user.0.is_some() {
        return Redirect::to(&next).into_response();
    }
    render_template(LoginTemplate {
        page: PageContext::new(&state, &user, "Sign in", "login"),
        form: FormState::default(),
        error: None,
        next,
    })
}

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    next: Option<String>,
}

// Login submit
async fn login_submit(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    let email = form.email.trim().to_string();
    let values = HashMap::from([("email".to_string(), email.clone())]);

    let mut errors = ValidationErrorBuilder::new();
    if email.is_empty() {
        errors.add("email", "Please enter your email.");
    }
    if form.password.is_empty() {
        errors.add("password", "Please enter your password.");
    }
    if !errors.is_empty() {
        return render_template(LoginTemplate {
            page: PageContext::new(&state, &user, "Sign in", "login"),
            form: FormState::submitted(values, errors.into_errors()),
            error: None,
            next,
        });
    }

    let signed_in = match auth::authenticate_password(&state.db, &email, &form.password).await {
        Ok(result) => result,
        Err(e) => return server_error(&state, &user, e),
    };

    match signed_in {
        Ok(account) => {
            let token = match auth::start_session(&state.db, &state.config, &account, None, None).await {
                Ok(token) => token,
                Err(e) => return server_error(&state, &user, e),
            };
            record_login(LoginMethod::Password, true);
            tracing::info!(user_id = %account.id, "User signed in");
            let jar = jar.add(auth::session_cookie(token, &state.config));
            (jar, Redirect::to(&next)).into_response()
        }
        Err(failure) => {
            record_login(LoginMethod::Password, false);
            let template = LoginTemplate {
                page: PageContext::new(&state, &user, "Sign in", "login"),
                form: FormState::submitted(values, HashMap::new()),
                error: Some(failure.message().to_string()),
                next,
            };
            render_with_status(StatusCode::UNAUTHORIZED, template)
        }
    }
}

// Logout
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let token = auth::extract_token(&headers, &jar);
    if let Err(e) = auth::end_session(&state.db, token.as_deref()).await {
        tracing::warn!("Failed to end session: {}", e);
    }
    (auth::clear_session_cookie(jar), Redirect::to("/")).into_response()
}

// Embedded static files
async fn static_asset(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                file.data,
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

// Unknown API paths get the JSON envelope, everything else the HTML page
async fn not_found(State(state): State<Arc<AppState>>, user: MaybeUser, uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return ApiError::not_found("Endpoint not found").into_response();
    }
    error_page(
        &state,
        &user,
        StatusCode::NOT_FOUND,
        "Page not found",
        "The page you are looking for does not exist.",
    )
}
