//! Firebase settings: the public web-client config, the Admin SDK service
//! account, and the HTML bootstrap snippet embedded in every page.
//!
//! Nothing here fails. Unset variables fall back to `your-*` placeholder
//! literals so that pages still render; [`FirebaseSettings::placeholder_fields`]
//! reports which ones are still unconfigured.

mod token;

pub use token::{GoogleKeyVerifier, IdTokenVerifier, TokenError, VerifiedIdentity, GOOGLE_JWKS_URL};
#[cfg(test)]
pub use token::testing;

use serde::Serialize;

use crate::config::EnvSource;

/// Firebase JS SDK version loaded by the page snippet.
pub const SDK_VERSION: &str = "10.7.1";

/// OAuth scopes requested by the Google sign-in provider.
pub const GOOGLE_SCOPES: [&str; 2] = ["email", "profile"];

const PLACEHOLDER_PREFIX: &str = "your-";

/// Public configuration handed to the browser SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseClientConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

/// Service-account credential bundle for server-side Admin SDK access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceAccountConfig {
    #[serde(rename = "type")]
    pub account_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub auth_provider_x509_cert_url: String,
    pub client_x509_cert_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseSettings {
    pub client: FirebaseClientConfig,
    pub service_account: ServiceAccountConfig,
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        Self::from_env(&std::collections::HashMap::<&str, &str>::new())
    }
}

impl FirebaseSettings {
    pub fn from_env(env: &impl EnvSource) -> Self {
        let project = env.var("FIREBASE_PROJECT_ID");

        let auth_domain = env.var("FIREBASE_AUTH_DOMAIN").unwrap_or_else(|| {
            derived(&project, ".firebaseapp.com", "your-project.firebaseapp.com")
        });
        let storage_bucket = env
            .var("FIREBASE_STORAGE_BUCKET")
            .unwrap_or_else(|| derived(&project, ".appspot.com", "your-project.appspot.com"));
        let project_id = project.unwrap_or_else(|| "your-project-id".to_string());

        let client = FirebaseClientConfig {
            api_key: env.var_or("FIREBASE_API_KEY", "your-api-key"),
            auth_domain,
            project_id: project_id.clone(),
            storage_bucket,
            messaging_sender_id: env.var_or("FIREBASE_SENDER_ID", "your-sender-id"),
            app_id: env.var_or("FIREBASE_APP_ID", "your-app-id"),
            measurement_id: env.var("FIREBASE_MEASUREMENT_ID").filter(|m| !m.is_empty()),
        };

        let service_account = ServiceAccountConfig {
            account_type: "service_account".to_string(),
            project_id,
            private_key_id: env.var_or("FIREBASE_PRIVATE_KEY_ID", "your-private-key-id"),
            // Keys pasted into .env files usually carry escaped newlines
            private_key: env
                .var_or("FIREBASE_PRIVATE_KEY", "your-private-key")
                .replace("\\n", "\n"),
            client_email: env.var_or("FIREBASE_CLIENT_EMAIL", "your-client-email"),
            client_id: env.var_or("FIREBASE_CLIENT_ID", "your-client-id"),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            auth_provider_x509_cert_url: "https://www.googleapis.com/oauth2/v1/certs".to_string(),
            client_x509_cert_url: env.var_or("FIREBASE_CLIENT_CERT_URL", "your-cert-url"),
        };

        Self {
            client,
            service_account,
        }
    }

    /// Client config serialized for embedding in a page.
    pub fn client_config_json(&self) -> String {
        // A struct of plain strings always serializes
        serde_json::to_string(&self.client).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn service_account(&self) -> &ServiceAccountConfig {
        &self.service_account
    }

    /// HTML fragment that loads the compat SDKs, initialises the app and
    /// prepares a Google provider with the `email` and `profile` scopes.
    pub fn sdk_snippet(&self) -> String {
        let base = format!("https://www.gstatic.com/firebasejs/{}", SDK_VERSION);
        let scopes: String = GOOGLE_SCOPES
            .iter()
            .map(|scope| format!("    provider.addScope('{}');\n", scope))
            .collect();

        format!(
            r#"<!-- Firebase SDK -->
<script src="{base}/firebase-app-compat.js"></script>
<script src="{base}/firebase-auth-compat.js"></script>
<script src="{base}/firebase-firestore-compat.js"></script>
<script>
    const firebaseConfig = {config};
    firebase.initializeApp(firebaseConfig);
    const auth = firebase.auth();
    const db = firebase.firestore();

    const provider = new firebase.auth.GoogleAuthProvider();
{scopes}</script>
"#,
            base = base,
            config = script_safe(&self.client_config_json()),
            scopes = scopes,
        )
    }

    /// Names of the environment variables whose values are still placeholders.
    pub fn placeholder_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("FIREBASE_API_KEY", &self.client.api_key),
            ("FIREBASE_PROJECT_ID", &self.client.project_id),
            ("FIREBASE_SENDER_ID", &self.client.messaging_sender_id),
            ("FIREBASE_APP_ID", &self.client.app_id),
            ("FIREBASE_PRIVATE_KEY_ID", &self.service_account.private_key_id),
            ("FIREBASE_PRIVATE_KEY", &self.service_account.private_key),
            ("FIREBASE_CLIENT_EMAIL", &self.service_account.client_email),
            ("FIREBASE_CLIENT_ID", &self.service_account.client_id),
            ("FIREBASE_CLIENT_CERT_URL", &self.service_account.client_x509_cert_url),
        ];
        fields
            .into_iter()
            .filter(|(_, value)| value.starts_with(PLACEHOLDER_PREFIX))
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_client_configured(&self) -> bool {
        !self.client.api_key.starts_with(PLACEHOLDER_PREFIX)
            && !self.client.project_id.starts_with(PLACEHOLDER_PREFIX)
    }
}

fn derived(project: &Option<String>, suffix: &str, placeholder: &str) -> String {
    match project {
        Some(id) if !id.is_empty() => format!("{}{}", id, suffix),
        _ => placeholder.to_string(),
    }
}

/// Keep JSON from closing the surrounding `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
