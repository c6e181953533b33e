//! LDAP to Harbor sync tool
//!
//! Imports LDAP users and creates LDAP groups in Harbor so they can be used in
//! project membership without manual provisioning.

// ldapsynctool/src/main.rs
mod config;
mod directory;
mod errors;
mod harbor;
mod sync;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use config::{AppConfig, CliArgs, load_raw_config};
use log::warn;
use std::process::ExitCode;

/// Main entry point for the sync tool
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // A missing .env is fine; the env fallbacks may come from the real environment.
    dotenv::dotenv().ok();

    let args = CliArgs::parse();
    let raw_config = load_raw_config(&args).context("Failed to load application configuration")?;

    let Some(app_config) = AppConfig::from_sources(&args, &raw_config) else {
        print_usage()?;
        return Ok(());
    };
    init_logging(app_config.verbose);

    if !app_config.unknown_sync_types.is_empty() {
        for token in &app_config.unknown_sync_types {
            warn!("unknown sync type {:?}", token);
        }
        print_usage()?;
    }

    println!("🚀 Starting LDAP sync against {}", app_config.harbor.url);
    sync::run_sync_flow(&app_config).await?;
    println!("✅ Sync completed successfully.");
    Ok(())
}

/// `RUST_LOG` still wins over this when it is set.
fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,ldapsynctool=debug"
    } else {
        "info"
    }
}

fn init_logging(verbose: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(verbose)))
        .format_target(false)
        .init();
}

fn print_usage() -> Result<()> {
    CliArgs::command()
        .print_help()
        .context("Failed to print usage")
}
