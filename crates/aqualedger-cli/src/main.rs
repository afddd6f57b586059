//! AquaLedger CLI - log catches offline and sync them from the terminal

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::common::{load_settings, resolve_config_path, resolve_db_path};
use crate::commands::{add, completions, list, log, queue, show, status, sync, transition};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aqualedger=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Commands::Completions { shell, output } = &cli.command {
        return completions::run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path)?;
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Add { species, weight } => add::run_add(&species, weight, &db_path).await?,
        Commands::Log { text } => log::run_log(&text, &db_path).await?,
        Commands::List {
            status,
            inventory,
            limit,
            json,
        } => list::run_list(status, inventory, limit, json, &db_path).await?,
        Commands::Show { id, json } => show::run_show(id, json, &db_path).await?,
        Commands::Transition {
            id,
            status,
            force,
            reason,
        } => {
            let force_reason = if force { reason.as_deref() } else { None };
            transition::run_transition(id, status, force_reason, &db_path).await?;
        }
        Commands::Sync { command, watch } => match command {
            None => {
                let settings = load_settings(config_path.as_deref())?;
                sync::run_sync(watch, &settings, &db_path).await?;
            }
            Some(SyncCommands::Detect) => {
                let settings = load_settings(config_path.as_deref())?;
                sync::run_sync_detect(&settings, &db_path).await?;
            }
            Some(SyncCommands::Conflicts { json }) => {
                sync::run_sync_conflicts(json, &db_path).await?;
            }
            Some(SyncCommands::Resolve { id, keep }) => {
                sync::run_sync_resolve(id, keep, &db_path).await?;
            }
        },
        Commands::Queue {
            status,
            limit,
            json,
        } => queue::run_queue(status, limit, json, &db_path).await?,
        Commands::Status { json } => {
            let settings = load_settings(config_path.as_deref())?;
            status::run_status(json, &settings, &db_path).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
