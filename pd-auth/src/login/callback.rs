use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::AuthError;

pub const CALLBACK_PATH: &str = "/callback";

/// How long a stopping listener may take to drain before its task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>pd: Authentication Successful</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding-top: 80px;">
<h2>Authentication successful</h2>
<p>You can close this window and return to your terminal.</p>
</body>
</html>"#;

const ERROR_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>pd: Authentication Error</title></head>
<body style="font-family: system-ui, sans-serif; text-align: center; padding-top: 80px;">
<h2>Authentication failed</h2>
<p><code>{ERROR}</code></p>
<p>Please close this window and try again from your terminal.</p>
</body>
</html>"#;

/// Verdict of one login attempt's redirect wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    ProviderError {
        error: String,
        description: Option<String>,
    },
    TimedOut,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
    expected_state: Arc<str>,
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn error_page(message: &str) -> Html<String> {
    Html(ERROR_HTML_TEMPLATE.replace("{ERROR}", &escape_html(message)))
}

async fn oauth_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<String>) {
    // Error redirects carrying a foreign state must not end the attempt.
    let state_mismatch = params
        .state
        .as_deref()
        .is_some_and(|received| received != &*state.expected_state);

    let (outcome, page) = if let Some(error) = params.error {
        if state_mismatch {
            tracing::warn!("OAuth error callback with mismatched state, ignoring request");
            return (StatusCode::BAD_REQUEST, error_page("State mismatch"));
        }
        tracing::warn!(
            error = %error,
            description = ?params.error_description,
            "OAuth callback error"
        );
        let message = match &params.error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error.clone(),
        };
        (
            CallbackOutcome::ProviderError {
                error,
                description: params.error_description,
            },
            error_page(&message),
        )
    } else if let Some(code) = params.code.filter(|code| !code.is_empty()) {
        if params.state.as_deref() != Some(&*state.expected_state) {
            tracing::warn!("OAuth callback state mismatch, ignoring request");
            return (StatusCode::BAD_REQUEST, error_page("State mismatch"));
        }
        (
            CallbackOutcome::Code(code),
            Html(SUCCESS_HTML.to_string()),
        )
    } else {
        return (
            StatusCode::BAD_REQUEST,
            error_page("Missing authorization code"),
        );
    };

    match state.sender.lock().await.take() {
        Some(sender) => {
            let _ = sender.send(outcome);
        }
        None => tracing::debug!("OAuth callback already handled, ignoring"),
    }

    (StatusCode::OK, page)
}

/// Local listener serving exactly one login attempt.
///
/// The listener is released on every path: after [`CallbackServer::wait`]
/// returns, or when the server is dropped early.
pub struct CallbackServer {
    local_addr: SocketAddr,
    outcome_rx: Option<oneshot::Receiver<CallbackOutcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    pub async fn bind(port: u16, expected_state: &str) -> Result<Self, AuthError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|source| AuthError::ListenerBindFailed { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AuthError::ListenerBindFailed { port, source })?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route(CALLBACK_PATH, get(oauth_callback))
            .layer(TraceLayer::new_for_http())
            .with_state(CallbackState {
                sender: Arc::new(Mutex::new(Some(outcome_tx))),
                expected_state: Arc::from(expected_state),
            });

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                tracing::warn!(error = %e, "OAuth callback server failed");
            }
        });

        tracing::debug!(%local_addr, "OAuth callback listener started");

        Ok(Self {
            local_addr,
            outcome_rx: Some(outcome_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Wait for a code, a provider error or the timeout, whichever comes first,
    /// then stop the listener.
    pub async fn wait(mut self, timeout: Duration) -> CallbackOutcome {
        let outcome = match self.outcome_rx.take() {
            Some(outcome_rx) => match tokio::time::timeout(timeout, outcome_rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => {
                    tracing::warn!("OAuth callback listener stopped before a redirect arrived");
                    CallbackOutcome::TimedOut
                }
                Err(_) => CallbackOutcome::TimedOut,
            },
            None => CallbackOutcome::TimedOut,
        };

        self.shutdown().await;
        outcome
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                tracing::warn!("OAuth callback server did not stop in time, aborting");
                abort.abort();
            }
        }

        tracing::debug!(local_addr = %self.local_addr, "OAuth callback listener stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
