//! Environment variable access and deployment environment selection.

use std::collections::HashMap;
use std::fmt;

/// Source of environment variables.
///
/// The process environment is read through [`ProcessEnv`]; tests use a plain
/// `HashMap` so that no global state is touched.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;

    /// Read a variable, falling back to `default` when unset.
    fn var_or(&self, key: &str, default: &str) -> String {
        self.var(key).unwrap_or_else(|| default.to_string())
    }
}

/// Reads from `std::env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Deployment environment, selected by `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub const VAR: &'static str = "APP_ENV";

    /// Resolve from `APP_ENV`. Unset or unknown names select production.
    pub fn from_env(env: &impl EnvSource) -> Self {
        Self::resolve(env).0
    }

    /// Like [`Environment::from_env`], also returning an unrecognised
    /// `APP_ENV` value so the caller can report the fallback.
    pub fn resolve(env: &impl EnvSource) -> (Self, Option<String>) {
        match env.var(Self::VAR) {
            None => (Self::Production, None),
            Some(name) => match Self::parse(&name) {
                Some(environment) => (environment, None),
                None => (Self::Production, Some(name)),
            },
        }
    }

    /// Exact, case-sensitive match on the two known names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "development" => Some(Self::Development),
            "production" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_production() {
        let env: HashMap<&str, &str> = HashMap::new();
        assert_eq!(Environment::from_env(&env), Environment::Production);
    }

    #[test]
    fn test_environment_from_app_env() {
        let env = HashMap::from([("APP_ENV", "development")]);
        assert_eq!(Environment::from_env(&env), Environment::Development);

        let env = HashMap::from([("APP_ENV", "production")]);
        assert_eq!(Environment::resolve(&env), (Environment::Production, None));
    }

    #[test]
    fn test_unknown_environment_falls_back_to_production() {
        for name in ["dev", "local", "prod", "Development", "PRODUCTION", " development", "staging", ""] {
            let env = HashMap::from([("APP_ENV", name)]);
            assert_eq!(
                Environment::resolve(&env),
                (Environment::Production, Some(name.to_string())),
                "APP_ENV={:?}",
                name
            );
        }
    }

    #[test]
    fn test_var_or() {
        let env = HashMap::from([("DB_HOST", "db.internal")]);
        assert_eq!(env.var_or("DB_HOST", "localhost"), "db.internal");
        assert_eq!(env.var_or("DB_NAME", "apniholidays"), "apniholidays");
    }
}
