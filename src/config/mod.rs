mod database;
mod env;

pub use database::{DatabaseSettings, DATABASE_URL_VAR};
pub use env::{EnvSource, Environment, ProcessEnv};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::firebase::FirebaseSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required setting is empty: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
    #[error("invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Process-wide configuration, built once at startup and shared read-only.
///
/// Server, logging, auth, rate limit and UI sections come from the optional
/// TOML file. Database and Firebase settings come from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub environment: Environment,
    #[serde(skip)]
    pub database: DatabaseSettings,
    #[serde(skip)]
    pub firebase: FirebaseSettings,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Messages produced while loading, logged once tracing is initialised
    #[serde(skip)]
    pub notices: Vec<LoadNotice>,
}

/// Something worth logging about how the configuration was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadNotice {
    Info(String),
    Warn(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public site name shown in page titles and the navbar
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            site_name: default_site_name(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_site_name() -> String {
    "Apni Holidays".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Insert the demo package catalogue when the packages table is empty
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            seed_demo_data: true,
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Emails allowed into the admin area through Google sign-in even without an admin account
    #[serde(default)]
    pub admin_emails: Vec<String>,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
            admin_emails: Vec::new(),
            secure_cookies: false,
        }
    }
}

fn default_session_days() -> i64 {
    7
}

impl AuthConfig {
    pub fn is_listed_admin(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|e| e.eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_requests")]
    pub api_requests_per_window: u32,
    #[serde(default = "default_auth_requests")]
    pub auth_requests_per_window: u32,
    #[serde(default = "default_form_requests")]
    pub form_requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Key clients by `X-Forwarded-For`/`X-Real-IP`. Only enable behind a
    /// reverse proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_requests_per_window: default_api_requests(),
            auth_requests_per_window: default_auth_requests(),
            form_requests_per_window: default_form_requests(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_cleanup_interval(),
            trust_proxy_headers: false,
        }
    }
}

fn default_api_requests() -> u32 {
    120
}

fn default_auth_requests() -> u32 {
    20
}

fn default_form_requests() -> u32 {
    10
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

/// Browser-side behaviour timings, rendered onto `<body>` for `main.js`.
#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// How long a `data-loading-text` button stays disabled
    #[serde(default = "default_loading_reset_ms")]
    pub loading_reset_ms: u64,
    /// How long an alert banner stays before removing itself
    #[serde(default = "default_alert_dismiss_ms")]
    pub alert_dismiss_ms: u64,
    /// Number of featured packages on the home page
    #[serde(default = "default_featured_limit")]
    pub featured_limit: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            loading_reset_ms: default_loading_reset_ms(),
            alert_dismiss_ms: default_alert_dismiss_ms(),
            featured_limit: default_featured_limit(),
        }
    }
}

fn default_loading_reset_ms() -> u64 {
    3000
}

fn default_alert_dismiss_ms() -> u64 {
    5000
}

fn default_featured_limit() -> usize {
    6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            database: DatabaseSettings::default(),
            firebase: FirebaseSettings::default(),
            server: ServerConfig::default(),
            pool: PoolConfig::default(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            ui: UiConfig::default(),
            notices: Vec::new(),
        }
    }
}

impl Config {
    /// Load the file (if present) and resolve environment-driven settings.
    ///
    /// Nothing is logged here because this runs before the subscriber is
    /// installed; call [`Config::log_notices`] afterwards.
    pub fn load(path: &Path, env: &impl EnvSource) -> Result<Self> {
        let (mut config, source) = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config =
                Self::from_toml(&content, env).with_context(|| "Failed to parse configuration file")?;
            (config, format!("Loaded configuration from {}", path.display()))
        } else {
            (Self::from_env(env), "No config file found, using defaults".to_string())
        };

        config.notices.insert(0, LoadNotice::Info(source));
        config.notices.push(LoadNotice::Info(format!(
            "Configuration resolved for {}",
            config.environment
        )));
        Ok(config)
    }

    pub fn from_toml(content: &str, env: &impl EnvSource) -> Result<Self, toml::de::Error> {
        let file: Config = toml::from_str(content)?;
        Ok(file.with_env(env))
    }

    /// Defaults for every file section plus environment-driven settings.
    pub fn from_env(env: &impl EnvSource) -> Self {
        Self::default().with_env(env)
    }

    fn with_env(mut self, env: &impl EnvSource) -> Self {
        let (environment, unknown) = Environment::resolve(env);
        if let Some(name) = unknown {
            self.notices.push(LoadNotice::Warn(format!(
                "Unknown {}={:?}, using production settings",
                Environment::VAR,
                name
            )));
        }
        self.environment = environment;
        self.database = DatabaseSettings::for_environment(self.environment, env);
        self.firebase = FirebaseSettings::from_env(env);
        self
    }

    /// Emit the notices collected by [`Config::load`].
    pub fn log_notices(&self) {
        for notice in &self.notices {
            match notice {
                LoadNotice::Info(message) => tracing::info!("{}", message),
                LoadNotice::Warn(message) => tracing::warn!("{}", message),
            }
        }
    }

    /// Check required fields. Returns warnings for settings that are usable
    /// but probably wrong, or an error when the service cannot start.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        let missing = self.database.check_required();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }
        self.database.url()?;

        if self.auth.session_days <= 0 {
            return Err(ConfigError::Invalid {
                field: "auth.session_days",
                reason: "must be positive".to_string(),
            });
        }
        if self.pool.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "pool.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }

        let mut warnings = Vec::new();
        let placeholders = self.firebase.placeholder_fields();
        if !placeholders.is_empty() {
            warnings.push(format!(
                "Firebase variables not set, using placeholders: {}",
                placeholders.join(", ")
            ));
        }
        if self.environment.is_production() && self.database.url_override.is_none() {
            if self.database.username == "username" || self.database.password == "password" {
                warnings.push("DB_USER/DB_PASS not set, using placeholder credentials".to_string());
            }
        }
        if self.environment.is_production() && !self.auth.secure_cookies {
            warnings.push("auth.secure_cookies is off in production".to_string());
        }
        Ok(warnings)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_env(&HashMap::<&str, &str>::new());
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.session_days, 7);
        assert_eq!(config.ui.loading_reset_ms, 3000);
        assert_eq!(config.ui.alert_dismiss_ms, 5000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_toml_with_env() {
        let toml = r#"
            [server]
            port = 8080

            [logging]
            level = "debug"
            format = "json"

            [auth]
            admin_emails = ["Admin@ApniHolidays.com"]

            [ui]
            alert_dismiss_ms = 8000
        "#;
        let env = HashMap::from([("APP_ENV", "development")]);
        let config = Config::from_toml(toml, &env).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.ui.alert_dismiss_ms, 8000);
        assert_eq!(config.ui.loading_reset_ms, 3000);
        assert_eq!(config.database.dbname, "apniholidays_dev");
        assert!(config.auth.is_listed_admin("admin@apniholidays.com"));
        assert!(!config.auth.is_listed_admin("someone@else.com"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(
            Path::new("/nonexistent/apniholidays.toml"),
            &HashMap::from([("DB_NAME", "trips")]),
        )
        .unwrap();
        assert_eq!(config.database.dbname, "trips");
    }

    #[test]
    fn test_load_keeps_notices_for_later_logging() {
        let config = Config::load(
            Path::new("/nonexistent/apniholidays.toml"),
            &HashMap::from([("APP_ENV", "dev")]),
        )
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(
            config.notices.first(),
            Some(&LoadNotice::Info("No config file found, using defaults".to_string()))
        );
        assert!(config
            .notices
            .iter()
            .any(|n| matches!(n, LoadNotice::Warn(m) if m.contains("\"dev\""))));

        let config = Config::from_env(&HashMap::from([("APP_ENV", "development")]));
        assert!(config.notices.is_empty());
    }

    #[test]
    fn test_validate_reports_placeholders() {
        let env = HashMap::from([("APP_ENV", "development")]);
        let warnings = Config::from_env(&env).validate().unwrap();
        assert!(warnings.iter().any(|w| w.contains("FIREBASE_API_KEY")));
    }

    #[test]
    fn test_validate_rejects_empty_required_fields() {
        let env = HashMap::from([("DB_NAME", "")]);
        let err = Config::from_env(&env).validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref f) if f == &vec!["DB_NAME"]));
    }

    #[test]
    fn test_validate_rejects_bad_session_days() {
        let mut config = Config::from_env(&HashMap::<&str, &str>::new());
        config.auth.session_days = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "auth.session_days", .. })
        ));
    }
}
