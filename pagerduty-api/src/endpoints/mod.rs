pub mod services;
pub mod users;

use serde::{Deserialize, Serialize};

/// Compact reference to another PagerDuty resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: Option<String>,
    #[serde(rename = "self")]
    pub self_url: Option<String>,
    pub html_url: Option<String>,
}

/// Classic offset pagination fields present on list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub more: bool,
    pub total: Option<u32>,
}
