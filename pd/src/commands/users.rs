use anyhow::{Context, Result};
use pagerduty_api::Request;
use pd_auth::Config;

use super::print_json;

pub async fn me(config: &Config) -> Result<()> {
    let client = pd_auth::build_client(config)?;
    let response = client
        .send(Request::users().me())
        .await
        .context("Failed to fetch current user")?;

    print_json(&serde_json::to_value(&response.user)?)
}
