//! Command-line interface.
//!
//! With no subcommand the binary starts the web server. Subcommands:
//! - `config show|check` - print or validate the resolved configuration
//! - `db check|migrate|seed` - database maintenance
//! - `firebase client-config|service-account|snippet` - print Firebase settings

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::db;
use crate::startup;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "apni-holidays")]
#[command(author, version, about = "Apni Holidays travel site", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "APNI_CONFIG", default_value = "apniholidays.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Skip startup self-checks (for development only)
    #[arg(long)]
    pub skip_checks: bool,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Print Firebase settings
    #[command(subcommand)]
    Firebase(FirebaseCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration with secrets masked
    Show,
    /// Validate configuration and report warnings
    Check,
}

/// Database subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Test the database connection
    Check,
    /// Apply pending migrations
    Migrate,
    /// Insert the demo packages into an empty catalogue
    Seed,
}

/// Firebase subcommands
#[derive(Subcommand, Debug)]
pub enum FirebaseCommands {
    /// Web client config as JSON
    ClientConfig,
    /// Admin SDK service account as JSON
    ServiceAccount {
        /// Print the private key instead of masking it
        #[arg(long)]
        reveal: bool,
    },
    /// HTML snippet that initialises the browser SDK
    Snippet,
}

/// Run a subcommand. Returns `Ok(false)` when there is none and the server should start.
pub async fn run_command(cli: &Cli, config: &Config) -> Result<bool> {
    match &cli.command {
        Some(Commands::Config(ConfigCommands::Show)) => cmd_config_show(cli, config),
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli, config)?,
        Some(Commands::Db(DbCommands::Check)) => cmd_db_check(config).await?,
        Some(Commands::Db(DbCommands::Migrate)) => cmd_db_migrate(config).await?,
        Some(Commands::Db(DbCommands::Seed)) => cmd_db_seed(config).await?,
        Some(Commands::Firebase(FirebaseCommands::ClientConfig)) => {
            println!("{}", serde_json::to_string_pretty(&config.firebase.client)?);
        }
        Some(Commands::Firebase(FirebaseCommands::ServiceAccount { reveal })) => {
            let mut account = config.firebase.service_account().clone();
            if !reveal {
                account.private_key = mask(&account.private_key);
            }
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Some(Commands::Firebase(FirebaseCommands::Snippet)) => {
            print!("{}", config.firebase.sdk_snippet());
        }
        None => return Ok(false),
    }
    Ok(true)
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn mask(secret: &str) -> String {
    if secret.starts_with("your-") {
        secret.to_string()
    } else {
        "****".to_string()
    }
}

fn cmd_config_show(cli: &Cli, config: &Config) {
    let source = if cli.config.exists() {
        cli.config.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };

    println!("=== Configuration ({}) ===", source);
    println!();
    println!("Environment:    {}", config.environment.as_str());
    println!();
    println!("Server:");
    println!("  Address:      {}", config.bind_address());
    println!("  Site name:    {}", config.server.site_name);
    println!();
    println!("Database:");
    println!("  DSN:          {}", config.database.dsn());
    println!("  URL:          {}", config.database.redacted_url());
    println!("  Username:     {}", config.database.username);
    println!("  Pool size:    {}", config.pool.max_connections);
    println!("  Demo seed:    {}", enabled(config.pool.seed_demo_data));
    println!();
    println!("Firebase:");
    println!("  Project:      {}", config.firebase.client.project_id);
    println!("  Auth domain:  {}", config.firebase.client.auth_domain);
    println!("  Client email: {}", config.firebase.service_account.client_email);
    println!();
    println!("Auth:");
    println!("  Session days: {}", config.auth.session_days);
    println!("  Admin emails: {}", config.auth.admin_emails.len());
    println!("  Secure cookie: {}", enabled(config.auth.secure_cookies));
    println!();
    println!("Rate limiting:  {}", enabled(config.rate_limit.enabled));
    println!(
        "Logging:        {} ({:?})",
        config.logging.level, config.logging.format
    );
}

fn cmd_config_check(cli: &Cli, config: &Config) -> Result<()> {
    if cli.config.exists() {
        println!("Checking configuration file: {}", cli.config.display());
    } else {
        println!(
            "[!!] Configuration file not found: {} (defaults and environment are used)",
            cli.config.display()
        );
    }
    println!();

    let report = startup::StartupCheckReport::new(startup::config_checks(config));
    for check in &report.checks {
        let marker = if check.passed { "[OK]" } else { "[!]" };
        println!("{} {}: {}", marker, check.name, check.message);
        if let Some(details) = &check.details {
            println!("     {}", details);
        }
    }
    println!();
    println!("{}", report.summary);

    if !report.all_critical_passed {
        anyhow::bail!("Invalid configuration");
    }
    Ok(())
}

async fn cmd_db_check(config: &Config) -> Result<()> {
    println!("Connecting to {}", config.database.redacted_url());
    let pool = db::connect(&config.database, &config.pool).await?;
    if db::test_connection(&pool).await {
        println!("[OK] Database connection successful");
        Ok(())
    } else {
        anyhow::bail!(db::CONNECTION_FAILED_MESSAGE)
    }
}

async fn cmd_db_migrate(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database, &config.pool).await?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    println!("[OK] Migrations applied");
    Ok(())
}

async fn cmd_db_seed(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database, &config.pool).await?;
    let inserted = db::seed_demo_packages(&pool).await?;
    if inserted == 0 {
        println!("Catalogue already has packages, nothing seeded");
    } else {
        println!("[OK] Seeded {} demo packages", inserted);
    }
    Ok(())
}
