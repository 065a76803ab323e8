//! services/client/src/bin/researchmate.rs

use clap::Parser;
use client_lib::{
    cli::{commands, Cli},
    config::Config,
    error::CliError,
    state::AppState,
};
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(api = %config.api_base_url, "Configuration loaded.");

    // --- 2. Wire Adapters and Controllers ---
    let state = AppState::from_config(config)?;

    // --- 3. Run the Command ---
    let mut input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    commands::run(&state, cli.command, &mut input, &mut out).await
}
