use anyhow::{Context, Result};
use pagerduty_api::Request;
use pd_auth::Config;

use super::print_json;

pub async fn list(config: &Config, query: Option<String>, limit: Option<u32>) -> Result<()> {
    let client = pd_auth::build_client(config)?;

    let mut request = Request::services().list();
    if let Some(query) = query {
        request = request.query(query);
    }
    if let Some(limit) = limit {
        request = request.limit(limit);
    }

    let response = client
        .send(request)
        .await
        .context("Failed to list services")?;
    tracing::debug!(
        count = response.services.len(),
        more = response.pagination.more,
        "Fetched services"
    );

    print_json(&serde_json::to_value(&response.services)?)
}
