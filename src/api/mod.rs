pub mod auth;
pub mod error;
mod inquiries;
pub mod metrics;
mod packages;
pub mod rate_limit;
mod system;
mod users;
pub mod validation;

pub use inquiries::submit_inquiry;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Sign-in routes get the stricter auth tier
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/google", post(auth::google_login))
        .route("/admin/google", post(auth::admin_google_login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    // Admin routes check the session in their AdminUser extractor
    let admin_routes = Router::new()
        .route("/packages", post(packages::create_package))
        .route(
            "/packages/:id",
            put(packages::update_package).delete(packages::delete_package),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        .route("/users/:id/status", put(users::update_user_status))
        .route("/users/:id/promote", post(users::promote_user))
        .route("/admins", get(users::list_admins))
        .route("/stats", get(system::get_stats))
        .route("/inquiries", get(inquiries::list_inquiries));

    let api_routes = Router::new()
        .route("/firebase/config", get(system::firebase_config))
        .route("/packages", get(packages::list_packages))
        .route("/packages/:id", get(packages::get_package))
        .route("/inquiries", post(inquiries::create_inquiry))
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    Router::new()
        .route("/health", get(system::health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api", api_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{self, NewUser, Role, User};
    use crate::firebase::testing;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_state(config: Config) -> Arc<AppState> {
        let pool = db::test_pool().await;
        db::seed_demo_packages(&pool).await.unwrap();
        Arc::new(
            AppState::new(config, pool).with_id_token_verifier(Arc::new(testing::verifier())),
        )
    }

    async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = crate::app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn admin_token(state: &Arc<AppState>) -> String {
        let admin = User::create(
            &state.db,
            NewUser {
                name: "Site Admin".to_string(),
                email: "admin@apniholidays.com".to_string(),
                role: Role::Admin,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        auth::start_session(&state.db, &state.config, &admin, None, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state(Config::default()).await;
        let (status, body) = send(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
    }

    #[tokio::test]
    async fn test_public_package_listing() {
        let state = test_state(Config::default()).await;

        let (status, body) = send(&state, "GET", "/api/packages", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (_, body) = send(&state, "GET", "/api/packages?featured=true", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) =
            send(&state, "GET", "/api/packages?destination=thailand", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = send(&state, "GET", "/api/packages/pkg_dubai_001", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "DUBAI 3 NIGHT 04 DAYS");
        assert_eq!(body["featured"], true);

        let (status, body) = send(&state, "GET", "/api/packages/missing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_firebase_config_is_camel_case() {
        let state = test_state(Config::default()).await;
        let (status, body) = send(&state, "GET", "/api/firebase/config", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["apiKey"], "your-api-key");
        assert_eq!(body["authDomain"], "your-project.firebaseapp.com");
        assert!(body.get("measurementId").is_none());
        assert!(body.get("private_key").is_none());
    }

    #[tokio::test]
    async fn test_register_login_and_me() {
        let state = test_state(Config::default()).await;
        let registration = json!({
            "name": "Asha Verma",
            "email": "asha@example.com",
            "password": "monsoon-getaway",
        });

        let (status, body) =
            send(&state, "POST", "/api/auth/register", None, Some(registration.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"].get("password_hash").is_none());

        let (status, _) = send(&state, "POST", "/api/auth/register", None, Some(registration)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &state,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "asha@example.com", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");

        let (status, body) = send(
            &state,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ASHA@example.com", "password": "monsoon-getaway"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&state, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "asha@example.com");

        let (status, _) = send(&state, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_validation_details() {
        let state = test_state(Config::default()).await;
        let (status, body) = send(
            &state,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "", "email": "nope", "password": "short"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
        let details = &body["error"]["details"];
        assert!(details.get("name").is_some());
        assert!(details.get("email").is_some());
        assert!(details.get("password").is_some());
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let state = test_state(Config::default()).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/google")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"id_token": testing::id_token("g-1", "ravi@example.com")}).to_string(),
            ))
            .unwrap();
        let response = crate::app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with(&format!("{}=", auth::SESSION_COOKIE)));
        assert!(cookie.contains("HttpOnly"));

        let user = User::find_by_email(&state.db, "ravi@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.firebase_uid.as_deref(), Some("g-1"));
        assert_eq!(user.role, "user");
    }

    #[tokio::test]
    async fn test_admin_google_login() {
        let mut config = Config::default();
        config.auth.admin_emails = vec!["owner@apniholidays.com".to_string()];
        let state = test_state(config).await;

        let (status, _) = send(
            &state,
            "POST",
            "/api/auth/admin/google",
            None,
            Some(json!({"id_token": testing::id_token("g-2", "stranger@example.com")})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(User::find_by_email(&state.db, "stranger@example.com")
            .await
            .unwrap()
            .is_none());

        let (status, body) = send(
            &state,
            "POST",
            "/api/auth/admin/google",
            None,
            Some(json!({"id_token": testing::id_token("g-3", "Owner@ApniHolidays.com")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_google_login_requires_a_signed_token() {
        let state = test_state(Config::default()).await;
        let admin = admin_token(&state).await;

        // Claimed identity without a token
        let (status, body) = send(
            &state,
            "POST",
            "/api/auth/google",
            None,
            Some(json!({"uid": "attacker", "email": "admin@apniholidays.com"})),
        )
        .await;
        assert!(status.is_client_error(), "got {}", status);
        assert!(body.get("token").is_none());

        for endpoint in ["/api/auth/google", "/api/auth/admin/google"] {
            let (status, body) = send(
                &state,
                "POST",
                endpoint,
                None,
                Some(json!({"id_token": "eyJhbGciOiJSUzI1NiJ9.e30.c2ln"})),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", endpoint);
            assert!(body.get("token").is_none());
        }

        // Signed for another project
        let mut claims = testing::claims("attacker", "admin@apniholidays.com");
        claims["aud"] = "attacker-project".into();
        let (status, _) = send(
            &state,
            "POST",
            "/api/auth/admin/google",
            None,
            Some(json!({"id_token": testing::sign(&claims)})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&state, "GET", "/api/admin/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_google_login_keeps_linked_account() {
        let state = test_state(Config::default()).await;

        let (status, _) = send(
            &state,
            "POST",
            "/api/auth/google",
            None,
            Some(json!({"id_token": testing::id_token("g-owner", "meera@example.com")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &state,
            "POST",
            "/api/auth/google",
            None,
            Some(json!({"id_token": testing::id_token("g-other", "meera@example.com")})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin() {
        let state = test_state(Config::default()).await;

        let (status, _) = send(&state, "GET", "/api/admin/stats", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, body) = send(
            &state,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "Cust", "email": "cust@example.com", "password": "monsoon-getaway"})),
        )
        .await;
        let customer = body["token"].as_str().unwrap().to_string();
        let (status, _) = send(&state, "GET", "/api/admin/stats", Some(&customer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = admin_token(&state).await;
        let (status, body) = send(&state, "GET", "/api/admin/stats", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["packages"], 5);
        assert_eq!(body["featured"], 3);
        assert_eq!(body["users"], 1);
    }

    #[tokio::test]
    async fn test_admin_package_crud() {
        let state = test_state(Config::default()).await;
        let admin = admin_token(&state).await;

        let (status, body) = send(
            &state,
            "POST",
            "/api/admin/packages",
            Some(&admin),
            Some(json!({
                "title": "Kerala Backwaters",
                "destination": "Kerala",
                "days": 5,
                "price": 24999,
                "discount_price": 21999,
                "highlights": "Houseboat stay, Munnar tea gardens",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("pkg_kerala_"));

        let (status, _) = send(
            &state,
            "POST",
            "/api/admin/packages",
            Some(&admin),
            Some(json!({"title": "Bad", "destination": "X", "days": 2, "price": 100, "discount_price": 200})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/admin/packages/{}", id);
        let (status, body) = send(
            &state,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({"status": "inactive"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "inactive");

        // A discount alone is still checked against the stored price
        let (status, body) = send(
            &state,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({"discount_price": 25000})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["details"].get("discount_price").is_some());
        let stored_uri = format!("/api/packages/{}", id);
        let (_, body) = send(&state, "GET", &stored_uri, Some(&admin), None).await;
        assert_eq!(body["discount_price"], 21999.0);

        // Hidden from the public, visible to admins
        let public_uri = format!("/api/packages/{}", id);
        let (status, _) = send(&state, "GET", &public_uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, "GET", &public_uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "DELETE", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_user_management() {
        let state = test_state(Config::default()).await;
        let admin = admin_token(&state).await;

        let (status, body) = send(
            &state,
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({"name": "Neha", "email": "neha@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["user"]["id"].as_str().unwrap().to_string();
        let generated = body["generated_password"].as_str().unwrap().to_string();
        assert_eq!(generated.len(), 16);

        // The generated password works for sign-in
        let (status, _) = send(
            &state,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "neha@example.com", "password": generated})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &state,
            "PUT",
            &format!("/api/admin/users/{}/status", id),
            Some(&admin),
            Some(json!({"status": "inactive"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "inactive");

        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/admin/users/{}/promote", id),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "admin");

        let (_, body) = send(&state, "GET", "/api/admin/admins", Some(&admin), None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, _) = send(
            &state,
            "DELETE",
            &format!("/api/admin/users/{}", id),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&state, "GET", "/api/admin/users", Some(&admin), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inquiry_submission() {
        let state = test_state(Config::default()).await;

        let (status, body) = send(
            &state,
            "POST",
            "/api/inquiries",
            None,
            Some(json!({"name": "Priya", "email": "priya@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["details"].get("message").is_some());

        let (status, _) = send(
            &state,
            "POST",
            "/api/inquiries",
            None,
            Some(json!({
                "name": "Priya",
                "email": "priya@example.com",
                "phone": "+91 98765 43210",
                "message": "Is Bali available in May?",
                "package_id": "pkg_unknown",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            "POST",
            "/api/inquiries",
            None,
            Some(json!({
                "name": "Priya",
                "email": "priya@example.com",
                "phone": "+91 98765 43210",
                "message": "Is Bali available in May?",
                "package_id": "pkg_bali_001",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "new");

        let admin = admin_token(&state).await;
        let (_, body) = send(&state, "GET", "/api/admin/inquiries", Some(&admin), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited() {
        let mut config = Config::default();
        config.rate_limit.auth_requests_per_window = 2;
        let state = test_state(config).await;
        let creds = json!({"email": "nobody@example.com", "password": "whatever-it-is"});

        for _ in 0..2 {
            let (status, _) =
                send(&state, "POST", "/api/auth/login", None, Some(creds.clone())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, body) = send(&state, "POST", "/api/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "too_many_requests");

        // Other API routes have their own budget
        let (status, _) = send(&state, "GET", "/api/packages", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    async fn login_from(state: &Arc<AppState>, forwarded_for: &str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::from(
                json!({"email": "admin@apniholidays.com", "password": "guess-number-n"})
                    .to_string(),
            ))
            .unwrap();
        crate::app(state.clone()).oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_reset_auth_limit() {
        let mut config = Config::default();
        config.rate_limit.auth_requests_per_window = 2;
        let state = test_state(config).await;

        assert_eq!(login_from(&state, "203.0.113.1").await, StatusCode::UNAUTHORIZED);
        assert_eq!(login_from(&state, "203.0.113.2").await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            login_from(&state, "203.0.113.3").await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_trusted_proxy_headers_key_by_forwarded_client() {
        let mut config = Config::default();
        config.rate_limit.auth_requests_per_window = 2;
        config.rate_limit.trust_proxy_headers = true;
        let state = test_state(config).await;

        for client in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
            assert_eq!(login_from(&state, client).await, StatusCode::UNAUTHORIZED);
        }
        assert_eq!(login_from(&state, "203.0.113.1").await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            login_from(&state, "203.0.113.1").await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
