use clap::{Args, Parser, Subcommand};
use pd_auth::login::DEFAULT_CALLBACK_PORT;
use pd_auth::{ConfigValues, OAuthApplicationType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pd", version, about = "PagerDuty command line client")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command; each one overrides the config file.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file to read instead of ~/.pd.yml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// PagerDuty REST API token
    #[arg(long, global = true)]
    pub authtoken: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub loglevel: Option<String>,

    /// OAuth application type (classic or scoped)
    #[arg(long, global = true)]
    pub oauth_type: Option<OAuthApplicationType>,

    #[arg(long, global = true)]
    pub client_id: Option<String>,

    #[arg(long, global = true)]
    pub client_secret: Option<String>,

    /// OAuth scope; repeat or separate with commas
    #[arg(long = "scope", global = true, value_delimiter = ',')]
    pub scopes: Vec<String>,

    /// Where the OAuth token is stored (default ~/.pd-token.json)
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> ConfigValues {
        ConfigValues {
            authtoken: self.authtoken.clone(),
            loglevel: self.loglevel.clone(),
            oauth_type: self.oauth_type,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: self.scopes.clone(),
            token_file: self.token_file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage OAuth authentication
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },
    /// Inspect users
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Inspect services
    Service {
        #[command(subcommand)]
        action: ServiceCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Log in through the browser and store the OAuth token
    Login {
        /// Local port for the OAuth redirect
        #[arg(long, default_value_t = DEFAULT_CALLBACK_PORT)]
        port: u16,

        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Show which credential is in use and the stored token's state
    Status,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Show the user owning the credential
    Me,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// List services
    List {
        /// Filter services by name
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },
}
