//! mysched CLI - conference session bookmarks and reservations
//!
//! Every action is recorded locally first and reaches other devices on the
//! next `mysched sync`.

mod cli;
mod commands;
mod config;
mod error;


use clap::{CommandFactory, Parser};
use mysched_core::ReservationStatus;

use crate::cli::{Cli, Commands, ConfigCommands, SyncCommands};
use crate::commands::completions::run_completions;
use crate::commands::config::{run_config_init, run_config_show};
use crate::commands::export::{run_export, run_import};
use crate::commands::list::run_list;
use crate::commands::session::{run_feedback, run_set_bookmark, run_set_reservation, run_show};
use crate::commands::sync::{run_sync, run_sync_conflicts};
use crate::config::{config_path, env_var, CliConfig, Overrides};
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
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mysched=info")),
        )
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let overrides = Overrides {
        db_path: cli.db_path,
        account: cli.account,
        tie_break: cli.tie_break.map(Into::into),
    };
    let config_path = config_path(env_var)?;

    if let Commands::Config {
        command:
            ConfigCommands::Init {
                remote,
                remote_token,
            },
    } = command
    {
        run_config_init(&config_path, &overrides, remote, remote_token)?;
        return Ok(());
    }

    let config = CliConfig::load_from_path(&config_path).map_err(CliError::Config)?;
    let settings = config.resolve(&overrides, env_var)?;
    tracing::debug!(
        "Using database {} for account '{}'",
        settings.db_path.display(),
        settings.account
    );

    match command {
        Commands::Bookmark { session_id } => {
            run_set_bookmark(&session_id, true, &settings).await?;
        }
        Commands::Unbookmark { session_id } => {
            run_set_bookmark(&session_id, false, &settings).await?;
        }
        Commands::Reserve { session_id } => {
            run_set_reservation(&session_id, ReservationStatus::Reserved, &settings).await?;
        }
        Commands::Waitlist { session_id } => {
            run_set_reservation(&session_id, ReservationStatus::Waitlisted, &settings).await?;
        }
        Commands::Unreserve { session_id } => {
            run_set_reservation(&session_id, ReservationStatus::Deleted, &settings).await?;
        }
        Commands::Feedback { session_id } => {
            run_feedback(&session_id, &settings).await?;
        }
        Commands::Show { session_id, json } => {
            run_show(&session_id, json, &settings).await?;
        }
        Commands::List { all, json } => run_list(all, json, &settings).await?,
        Commands::Sync {
            command: Some(SyncCommands::Conflicts { limit, json }),
            ..
        } => run_sync_conflicts(limit, json, &settings).await?,
        Commands::Sync {
            remote,
            command: None,
        } => {
            run_sync(remote.as_deref(), &settings).await?;
        }
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &settings).await?;
        }
        Commands::Import { path } => {
            run_import(&path, &settings).await?;
        }
        Commands::Config {
            command: ConfigCommands::Show { json },
        } => run_config_show(&settings, &config_path, json)?,
        Commands::Config {
            command: ConfigCommands::Init { .. },
        }
        | Commands::Completions { .. } => {}
    }

    Ok(())
}
