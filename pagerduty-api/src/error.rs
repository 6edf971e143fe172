use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum PagerDutyApiError {
    PagerDuty(StatusCode, ErrorDetail),
    Credential(String),
    Http(reqwest::Error),
}

impl PagerDutyApiError {
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(response) => PagerDutyApiError::PagerDuty(status, response.error),
            Err(_) => PagerDutyApiError::PagerDuty(
                status,
                ErrorDetail {
                    code: None,
                    message: body.trim().to_string(),
                    errors: Vec::new(),
                },
            ),
        }
    }
}

impl From<reqwest::Error> for PagerDutyApiError {
    fn from(value: reqwest::Error) -> Self {
        PagerDutyApiError::Http(value)
    }
}

impl std::fmt::Display for PagerDutyApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PagerDutyApiError::Http(e) => write!(f, "HTTP error: {}", e),
            PagerDutyApiError::Credential(msg) => write!(f, "Credential error: {}", msg),
            PagerDutyApiError::PagerDuty(status, detail) => {
                write!(f, "({}) {}", status, detail.message)?;
                if !detail.errors.is_empty() {
                    write!(f, ": {}", detail.errors.join("; "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PagerDutyApiError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
}
