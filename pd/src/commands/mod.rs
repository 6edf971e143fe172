mod auth;
mod services;
mod users;

use anyhow::Result;
use pd_auth::Config;
use serde_json::Value;

use crate::cli::{AuthCommand, Command, ServiceCommand, UserCommand};

/// Dispatch a parsed command against the merged configuration.
pub async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Auth { action } => match action {
            AuthCommand::Login { port, no_browser } => auth::login(config, port, !no_browser).await,
            AuthCommand::Status => auth::status(config),
        },
        Command::User { action } => match action {
            UserCommand::Me => users::me(config).await,
        },
        Command::Service { action } => match action {
            ServiceCommand::List { query, limit } => services::list(config, query, limit).await,
        },
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
