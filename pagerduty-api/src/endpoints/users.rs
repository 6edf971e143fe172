use super::Reference;
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub time_zone: Option<String>,
    pub role: Option<String>,
    pub job_title: Option<String>,
    pub html_url: Option<String>,
    #[serde(default)]
    pub teams: Vec<Reference>,
}

// Requests

/// `GET /users/me`, the user that owns the OAuth token.
#[derive(Default, Debug, Clone, Serialize)]
pub struct GetCurrentUser;

impl GetCurrentUser {
    pub fn new() -> Self {
        Self
    }
}

impl Request for GetCurrentUser {
    type Data = ();
    type Response = UserResponse;

    fn endpoint(&self) -> Cow<'_, str> {
        "/users/me".into()
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}
