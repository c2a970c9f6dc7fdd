//! Polis CLI - Command-line interface for policy document ingestion.

use clap::Parser;
use polis_cli::commands;
use polis_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries command output only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> polis_cli::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Override profile if specified
    if let Some(profile_name) = cli.profile {
        config.switch_profile(profile_name)?;
    }

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Profile(args) => {
            commands::execute_profile(args, &mut config, &formatter).await?;
        }
        Command::Ingest(args) => {
            commands::execute_ingest(args, &config, &formatter).await?;
        }
        cmd => {
            // Commands that work directly on the database
            let mut store = commands::open_store(config.get_active_profile()?)?;

            match cmd {
                Command::List(args) => commands::execute_list(args, &store, &formatter).await?,
                Command::Show(args) => commands::execute_show(args, &store, &formatter).await?,
                Command::Account(args) => commands::execute_account(args, &mut store, &formatter).await?,
                Command::Refresh(args) => commands::execute_refresh(args, &config, &mut store, &formatter).await?,
                Command::Profile(_) | Command::Ingest(_) => unreachable!(),
            }
        }
    }

    Ok(())
}
