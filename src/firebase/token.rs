//! Verification of Firebase ID tokens.
//!
//! The browser signs in with Google through Firebase and sends the resulting
//! ID token. The server checks its RS256 signature against Google's published
//! signing keys, and checks that `aud` is the project id and `iss` is
//! `https://securetoken.google.com/<project id>`. Only claims from a verified
//! token are trusted.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::FirebaseSettings;

/// Public keys that sign Firebase ID tokens, in JWK form.
pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Used when Google's response has no usable `Cache-Control: max-age`
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Clock skew tolerated on `exp` and `iat`
const LEEWAY_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Firebase project is not configured")]
    NotConfigured,
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
    #[error("token is signed with unknown key {0:?}")]
    UnknownKey(String),
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token was issued in the future")]
    IssuedInFuture,
    #[error("token has no subject")]
    MissingSubject,
    #[error("token has no verified email")]
    UnverifiedEmail,
}

impl TokenError {
    /// Errors on our side rather than the caller's.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TokenError::NotConfigured | TokenError::KeyFetch(_))
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: u64,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

/// Identity taken from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Checks an ID token and returns the identity it proves.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, TokenError>;
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Option<Instant>,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Verifies tokens against Google's key set, fetched with `reqwest` and
/// cached for as long as Google's `Cache-Control` allows.
pub struct GoogleKeyVerifier {
    project_id: Option<String>,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl GoogleKeyVerifier {
    /// A verifier for the configured project. A placeholder project id
    /// leaves it unconfigured and every token is refused.
    pub fn new(settings: &FirebaseSettings) -> Self {
        let project_id =
            Some(settings.client.project_id.clone()).filter(|_| settings.is_client_configured());
        Self {
            project_id,
            http: reqwest::Client::new(),
            keys: RwLock::new(None),
        }
    }

    /// A verifier with a fixed key set that is never refreshed.
    pub fn with_keys(project_id: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            project_id: Some(project_id.into()),
            http: reqwest::Client::new(),
            keys: RwLock::new(Some(CachedKeys {
                keys,
                expires_at: None,
            })),
        }
    }

    async fn current_keys(&self) -> Result<JwkSet, TokenError> {
        if let Some(cached) = self.keys.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.keys.clone());
            }
        }

        let mut slot = self.keys.write().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.keys.clone());
            }
        }

        let (keys, ttl) = self.fetch_keys().await?;
        tracing::debug!(
            keys = keys.keys.len(),
            ttl_secs = ttl.as_secs(),
            "Fetched Google signing keys"
        );
        *slot = Some(CachedKeys {
            keys: keys.clone(),
            expires_at: Some(Instant::now() + ttl),
        });
        Ok(keys)
    }

    async fn fetch_keys(&self) -> Result<(JwkSet, Duration), TokenError> {
        let response = self
            .http
            .get(GOOGLE_JWKS_URL)
            .send()
            .await
            .map_err(|e| TokenError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TokenError::KeyFetch(format!(
                "Google returned {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| TokenError::KeyFetch(e.to_string()))?;
        Ok((keys, ttl))
    }
}

#[async_trait]
impl IdTokenVerifier for GoogleKeyVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, TokenError> {
        let project_id = self.project_id.as_deref().ok_or(TokenError::NotConfigured)?;
        let keys = self.current_keys().await?;
        verify_with_keys(id_token, &keys, project_id)
    }
}

/// `max-age` from a `Cache-Control` header value
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Check signature, audience, issuer and expiry, then pull out the identity.
pub fn verify_with_keys(
    id_token: &str,
    keys: &JwkSet,
    project_id: &str,
) -> Result<VerifiedIdentity, TokenError> {
    let header = decode_header(id_token)?;
    let kid = header.kid.ok_or(TokenError::MissingKeyId)?;
    let jwk = keys
        .find(&kid)
        .ok_or_else(|| TokenError::UnknownKey(kid.clone()))?;
    let key = DecodingKey::from_jwk(jwk)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = LEEWAY_SECS;
    validation.set_audience(&[project_id]);
    validation.set_issuer(&[format!("{}{}", ISSUER_PREFIX, project_id)]);
    validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

    let claims = decode::<IdTokenClaims>(id_token, &key, &validation)?.claims;

    let now = Utc::now().timestamp().max(0) as u64;
    if claims.iat > now + LEEWAY_SECS {
        return Err(TokenError::IssuedInFuture);
    }
    if claims.sub.trim().is_empty() {
        return Err(TokenError::MissingSubject);
    }
    let email = match claims.email {
        Some(email) if claims.email_verified && !email.trim().is_empty() => email,
        _ => return Err(TokenError::UnverifiedEmail),
    };

    Ok(VerifiedIdentity {
        uid: claims.sub,
        email,
        name: claims.name,
        picture: claims.picture,
    })
}

/// Signing helpers for tests that need real ID tokens.
#[cfg(test)]
pub mod testing {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    pub const KEY_ID: &str = "apni-test-key";
    pub const PROJECT_ID: &str = "apni-holidays";

    const SIGNING_KEY: &str = include_str!("testdata/signing_key.pem");
    const JWKS: &str = include_str!("testdata/jwks.json");

    pub fn keys() -> JwkSet {
        serde_json::from_str(JWKS).unwrap()
    }

    pub fn verifier() -> GoogleKeyVerifier {
        GoogleKeyVerifier::with_keys(PROJECT_ID, keys())
    }

    /// Claims for a fresh Google sign-in to [`PROJECT_ID`]
    pub fn claims(uid: &str, email: &str) -> Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": format!("{}{}", ISSUER_PREFIX, PROJECT_ID),
            "aud": PROJECT_ID,
            "sub": uid,
            "iat": now,
            "exp": now + 3600,
            "auth_time": now,
            "email": email,
            "email_verified": true,
            "name": "Test Traveller",
            "firebase": {"sign_in_provider": "google.com"}
        })
    }

    pub fn sign(claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(KEY_ID.to_string());
        let key = EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    pub fn id_token(uid: &str, email: &str) -> String {
        sign(&claims(uid, email))
    }
}
