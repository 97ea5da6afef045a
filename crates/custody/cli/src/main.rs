//! Custody CLI - operate a multisig wallet kept in a local state file
//!
//! Owners submit, confirm, revoke and execute proposals against the wallet;
//! accepted dispatches are appended to the state file's outbox for a
//! downstream process to carry out.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;
mod state;

use crate::commands::{lifecycle, query, replay};
use crate::config::CustodyConfig;
use crate::output::OutputFormat;
use crate::state::Session;

/// Custody CLI application
#[derive(Parser)]
#[command(name = "custody")]
#[command(about = "Multisig custodial wallet", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CUSTODY_CONFIG")]
    config: Option<String>,

    /// Wallet state file
    #[arg(short, long, default_value = "custody-state.json")]
    state: PathBuf,

    /// Log level (overrides the configured level)
    #[arg(long)]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create a wallet from the configured owners and quorum
    Init {
        /// Replace an existing state file
        #[arg(long)]
        force: bool,
    },

    #[command(flatten)]
    Lifecycle(lifecycle::LifecycleCommands),

    #[command(flatten)]
    Query(query::QueryCommands),

    /// Apply a JSON-lines operation log
    Replay {
        /// Log file, one operation per line
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        CustodyConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Logs go to stderr so JSON results on stdout stay parseable
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let format = OutputFormat::from_flag(cli.json);

    match cli.command {
        Commands::Init { force } => {
            let mut session = Session::create(&cli.state, &config, force)?;
            session.save()?;
            let wallet = session.wallet();
            output::print_single(
                &serde_json::json!({
                    "state": cli.state.display().to_string(),
                    "owners": wallet.list_owners(),
                    "quorum": wallet.quorum(),
                    "settings": wallet.settings(),
                }),
                format,
                || {
                    format!(
                        "Initialised {} ({}-of-{})",
                        cli.state.display(),
                        wallet.quorum(),
                        wallet.list_owners().len()
                    )
                },
            )
        }
        Commands::Lifecycle(command) => lifecycle::execute(command, &cli.state, format),
        Commands::Query(command) => query::execute(command, &cli.state, format),
        Commands::Replay { file } => replay::execute(&file, &cli.state, format),
    }
}
