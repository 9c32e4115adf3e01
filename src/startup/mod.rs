//! Startup self-checks module
//!
//! Runs before the server starts accepting requests:
//! - Configuration is complete
//! - Database is reachable and migrated
//! - Firebase client settings are real values rather than placeholders
//! - The package catalogue is not empty

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{self, Package};
use crate::DbPool;

/// Tables the site cannot serve without
const ESSENTIAL_TABLES: [&str; 4] = ["packages", "users", "sessions", "inquiries"];

/// Result of a single startup check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Whether this check is critical (failure should abort startup)
    pub critical: bool,
    /// Human-readable message describing the result
    pub message: String,
    /// Additional details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            critical: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            passed: false,
            critical,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Aggregated startup check results
#[derive(Debug, Clone, Serialize)]
pub struct StartupCheckReport {
    pub checks: Vec<CheckResult>,
    pub all_critical_passed: bool,
    pub all_passed: bool,
    pub summary: String,
}

impl StartupCheckReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let all_critical_passed = checks.iter().filter(|c| c.critical).all(|c| c.passed);
        let all_passed = checks.iter().all(|c| c.passed);

        let failed_critical = checks.iter().filter(|c| c.critical && !c.passed).count();
        let failed_non_critical = checks.iter().filter(|c| !c.critical && !c.passed).count();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();

        let summary = if all_passed {
            format!("All {} startup checks passed", total)
        } else if all_critical_passed {
            format!(
                "{}/{} checks passed ({} non-critical warnings)",
                passed, total, failed_non_critical
            )
        } else {
            format!(
                "{}/{} checks passed ({} critical failures)",
                passed, total, failed_critical
            )
        };

        Self {
            checks,
            all_critical_passed,
            all_passed,
            summary,
        }
    }
}

/// Checks that need no database
pub fn config_checks(config: &Config) -> Vec<CheckResult> {
    vec![check_configuration(config), check_firebase_client(config)]
}

/// Run all startup self-checks
pub async fn run_startup_checks(config: &Config, db: &DbPool) -> StartupCheckReport {
    info!("Running startup self-checks...");

    let mut checks = config_checks(config);
    checks.push(check_database_connectivity(db).await);
    checks.push(check_database_schema(db).await);
    checks.push(check_package_catalogue(db).await);

    let report = StartupCheckReport::new(checks);
    log_report(&report);
    report
}

pub fn log_report(report: &StartupCheckReport) {
    for check in &report.checks {
        if check.passed {
            info!(
                check = %check.name,
                message = %check.message,
                "Startup check PASSED"
            );
        } else if check.critical {
            error!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (CRITICAL)"
            );
        } else {
            warn!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (non-critical)"
            );
        }
    }

    info!(
        summary = %report.summary,
        all_passed = report.all_passed,
        all_critical_passed = report.all_critical_passed,
        "Startup checks completed"
    );
}

fn check_configuration(config: &Config) -> CheckResult {
    match config.validate() {
        Ok(warnings) if warnings.is_empty() => CheckResult::pass(
            "configuration",
            format!("Configuration valid ({})", config.environment.as_str()),
        ),
        Ok(warnings) => CheckResult::fail("configuration", "Configuration has warnings", false)
            .with_details(warnings.join("; ")),
        Err(e) => CheckResult::fail("configuration", "Configuration is invalid", true)
            .with_details(e.to_string()),
    }
}

fn check_firebase_client(config: &Config) -> CheckResult {
    if config.firebase.is_client_configured() {
        CheckResult::pass("firebase_client", "Firebase client settings present")
    } else {
        CheckResult::fail(
            "firebase_client",
            "Firebase client uses placeholder settings; Google sign-in will not work",
            false,
        )
        .with_details(config.firebase.placeholder_fields().join(", "))
    }
}

async fn check_database_connectivity(db: &DbPool) -> CheckResult {
    if db::test_connection(db).await {
        CheckResult::pass("database_connectivity", "Database connection successful")
    } else {
        CheckResult::fail(
            "database_connectivity",
            db::CONNECTION_FAILED_MESSAGE,
            true,
        )
    }
}

async fn check_database_schema(db: &DbPool) -> CheckResult {
    let mut missing = Vec::new();
    for table in ESSENTIAL_TABLES {
        let query = format!("SELECT COUNT(*) FROM {}", table);
        if sqlx::query(&query).fetch_one(db).await.is_err() {
            missing.push(table);
        }
    }

    if missing.is_empty() {
        CheckResult::pass(
            "database_schema",
            format!("Database schema valid ({} tables)", ESSENTIAL_TABLES.len()),
        )
    } else {
        CheckResult::fail("database_schema", "Missing essential database tables", true)
            .with_details(format!("Missing: {}", missing.join(", ")))
    }
}

async fn check_package_catalogue(db: &DbPool) -> CheckResult {
    match Package::count(db).await {
        Ok(0) => CheckResult::fail(
            "package_catalogue",
            "No packages yet; the home page will be empty",
            false,
        ),
        Ok(n) => CheckResult::pass("package_catalogue", format!("{} packages available", n)),
        Err(e) => CheckResult::fail("package_catalogue", "Failed to count packages", false)
            .with_details(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_pass() {
        let result = CheckResult::pass("test", "Test passed");
        assert!(result.passed);
        assert!(!result.critical);
        assert_eq!(result.name, "test");
    }

    #[test]
    fn test_check_result_fail() {
        let result = CheckResult::fail("test", "Test failed", true);
        assert!(!result.passed);
        assert!(result.critical);
    }

    #[test]
    fn test_startup_check_report_critical_failure() {
        let checks = vec![
            CheckResult::pass("check1", "ok"),
            CheckResult::fail("check2", "fail", true),
        ];
        let report = StartupCheckReport::new(checks);
        assert!(!report.all_passed);
        assert!(!report.all_critical_passed);
        assert!(report.summary.contains("1 critical failures"));
    }

    #[test]
    fn test_non_critical_failure_still_starts() {
        let checks = vec![
            CheckResult::pass("check1", "ok"),
            CheckResult::fail("check2", "warn", false),
        ];
        let report = StartupCheckReport::new(checks);
        assert!(!report.all_passed);
        assert!(report.all_critical_passed);
    }

    #[test]
    fn test_placeholder_firebase_is_a_warning() {
        let config = Config::default();
        let check = check_firebase_client(&config);
        assert!(!check.passed);
        assert!(!check.critical);
        assert!(check.details.is_some());
    }

    #[tokio::test]
    async fn test_database_checks() {
        let pool = db::test_pool().await;
        let report = run_startup_checks(&Config::default(), &pool).await;
        assert!(report.all_critical_passed);

        let catalogue = report
            .checks
            .iter()
            .find(|c| c.name == "package_catalogue")
            .unwrap();
        assert!(!catalogue.passed);

        db::seed_demo_packages(&pool).await.unwrap();
        assert!(check_package_catalogue(&pool).await.passed);
    }
}
