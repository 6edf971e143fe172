mod cli;
mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = pd_auth::settings::load(cli.global.config.as_deref(), cli.global.overrides())
        .context("Failed to load configuration")?;

    logging::init_logging(&config.loglevel);
    tracing::debug!(?config, "Configuration loaded");

    commands::run(cli.command, &config).await
}
