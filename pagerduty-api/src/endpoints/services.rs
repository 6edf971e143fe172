use super::{Pagination, Reference};
use crate::macros::setter;
use crate::request::{Request, RequestData};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub html_url: Option<String>,
    pub escalation_policy: Option<Reference>,
    #[serde(default)]
    pub teams: Vec<Reference>,
}

// Requests

#[derive(Default, Debug, Clone, Serialize)]
pub struct ListServices {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
}

impl ListServices {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt query: String);
    setter!(opt limit: u32);
    setter!(opt offset: u32);
}

impl Request for ListServices {
    type Data = Self;
    type Response = ServicesResponse;

    fn endpoint(&self) -> Cow<'_, str> {
        "/services".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Query(self)
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesResponse {
    pub services: Vec<Service>,
    #[serde(flatten)]
    pub pagination: Pagination,
}
