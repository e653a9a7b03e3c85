//! GroupSave - command-line client for group savings
//!
//! Main entry point for the GroupSave CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod navigator;

use commands::{account, auth, dashboard, group, notifications, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// GroupSave - save together with the people you trust
#[derive(Parser)]
#[command(name = "groupsave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// API base URL
    #[arg(long, global = true, env = "GROUPSAVE_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the stored session
    #[arg(long, global = true, env = "GROUPSAVE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login(auth::LoginArgs),

    /// Sign out and clear the stored session
    Logout,

    /// Show the stored session
    Status,

    /// Create an account
    Register(account::RegisterArgs),

    /// Confirm an email address with the code that was sent to it
    VerifyEmail(account::VerifyEmailArgs),

    /// Password recovery
    Password(account::PasswordArgs),

    /// Show your groups and counters
    Dashboard(dashboard::DashboardArgs),

    /// Group operations
    Group(group::GroupArgs),

    /// Notification inbox
    Notifications(notifications::NotificationsArgs),

    /// Keep the session alive in the foreground and watch for expiry
    Watch(watch::WatchArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = groupsave_config::load_config(None)?;
    let config = loaded.config;

    // Initialize tracing: console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "groupsave=debug,groupsave_client=debug,groupsave_session=debug,groupsave_config=debug,info"
            .to_string()
    } else {
        config
            .log_level()
            .unwrap_or("groupsave=info,groupsave_client=warn,groupsave_session=warn,warn")
            .to_string()
    };

    let (file_layer, _guard) = if config.log_to_file() {
        let log_dir = groupsave_config::user_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "groupsave.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "groupsave=trace,groupsave_client=trace,groupsave_session=trace,groupsave_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.sources, "Configuration loaded");

    let api_url = cli.api_url.unwrap_or_else(|| config.api_url());
    let data_dir = cli
        .data_dir
        .or_else(|| config.data_dir())
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory; pass --data-dir"))?;

    let ctx = commands::Context {
        config,
        api_url,
        data_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Login(args) => auth::login(args, &ctx).await,
        Commands::Logout => auth::logout(&ctx).await,
        Commands::Status => auth::status(&ctx).await,
        Commands::Register(args) => account::register(args, &ctx).await,
        Commands::VerifyEmail(args) => account::verify_email(args, &ctx).await,
        Commands::Password(args) => account::password(args, &ctx).await,
        Commands::Dashboard(args) => dashboard::run(args, &ctx).await,
        Commands::Group(args) => group::run(args, &ctx).await,
        Commands::Notifications(args) => notifications::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
    }
}
