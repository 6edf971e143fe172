use axum::{extract::State, http::StatusCode, routing::post, Form, Json, Router};
use pd_auth::login::{self, LoginOptions, PendingLogin};
use pd_auth::{AuthError, OAuthApplicationType, OAuthEndpoints, TokenStore};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Captured = Arc<Mutex<Option<HashMap<String, String>>>>;

/// Fake token endpoint recording the form it was called with.
async fn spawn_token_server(status: StatusCode) -> (String, Captured) {
    async fn token(
        State((status, captured)): State<(StatusCode, Captured)>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        *captured.lock().unwrap() = Some(form);
        if status.is_success() {
            (
                status,
                Json(json!({
                    "access_token": "access-abc",
                    "token_type": "bearer",
                    "expires_in": 3600,
                    "refresh_token": "refresh-xyz",
                })),
            )
        } else {
            (
                status,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "authorization code expired",
                })),
            )
        }
    }

    let captured: Captured = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route("/oauth/token", post(token))
        .with_state((status, captured.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), captured)
}

fn options(dir: &TempDir, token_base: &str) -> LoginOptions {
    LoginOptions {
        app_type: OAuthApplicationType::Scoped,
        client_id: "client-123".to_string(),
        client_secret: SecretString::from("shh".to_string()),
        scopes: vec!["users.read".to_string(), "services.read".to_string()],
        token_file: dir.path().join("token.json"),
        port: 0,
        open_browser: false,
        timeout: Duration::from_secs(10),
        endpoints: OAuthEndpoints {
            auth_url: "https://identity.example.com/oauth/authorize".to_string(),
            token_url: format!("{}/oauth/token", token_base),
        },
    }
}

fn state_of(pending: &PendingLogin) -> String {
    let url = url::Url::parse(pending.authorization_url()).unwrap();
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

async fn redirect(port: u16, query: &str) -> (StatusCode, String) {
    let response = reqwest::get(format!("http://127.0.0.1:{}/callback?{}", port, query))
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

async fn port_is_free(port: u16) -> bool {
    for _ in 0..50 {
        if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn token_file_exists(dir: &TempDir) -> bool {
    dir.path().join("token.json").exists()
}

#[tokio::test]
async fn successful_login_persists_token() {
    let dir = TempDir::new().unwrap();
    let (token_base, captured) = spawn_token_server(StatusCode::OK).await;

    let pending = login::start(options(&dir, &token_base)).await.unwrap();
    let port = pending.port();
    let state = state_of(&pending);
    let redirect_url = pending.redirect_url().to_string();
    assert_eq!(redirect_url, format!("http://localhost:{}/callback", port));

    let finish = tokio::spawn(pending.finish());
    let (status, body) = redirect(port, &format!("code=auth-code-1&state={}", state)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Authentication successful"));

    let token = finish.await.unwrap().unwrap();
    assert_eq!(token.access_token, "access-abc");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-xyz"));
    assert_eq!(token.client_id, "client-123");
    assert_eq!(token.scopes, vec!["users.read", "services.read"]);
    assert!(token.expiry.is_some());

    let form = captured.lock().unwrap().clone().unwrap();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "auth-code-1");
    assert_eq!(form["client_id"], "client-123");
    assert_eq!(form["client_secret"], "shh");
    assert_eq!(form["redirect_uri"], redirect_url);

    let stored = TokenStore::new(dir.path().join("token.json"))
        .load_token()
        .unwrap();
    assert_eq!(stored, token);
    assert!(port_is_free(port).await);
}

#[tokio::test]
async fn mismatched_state_is_rejected_and_flow_keeps_waiting() {
    let dir = TempDir::new().unwrap();
    let (token_base, _) = spawn_token_server(StatusCode::OK).await;

    let pending = login::start(options(&dir, &token_base)).await.unwrap();
    let port = pending.port();
    let state = state_of(&pending);
    let finish = tokio::spawn(pending.finish());

    let (status, _) = redirect(port, "code=forged&state=not-the-state").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = redirect(port, &format!("state={}", state)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = redirect(port, &format!("code=real&state={}", state)).await;
    assert_eq!(status, StatusCode::OK);

    let token = finish.await.unwrap().unwrap();
    assert_eq!(token.access_token, "access-abc");
}

#[tokio::test]
async fn provider_error_fails_without_writing_a_token() {
    let dir = TempDir::new().unwrap();
    let (token_base, captured) = spawn_token_server(StatusCode::OK).await;

    let pending = login::start(options(&dir, &token_base)).await.unwrap();
    let port = pending.port();
    let finish = tokio::spawn(pending.finish());

    let (status, body) = redirect(
        port,
        "error=access_denied&error_description=user+cancelled",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("access_denied: user cancelled"));

    match finish.await.unwrap() {
        Err(AuthError::OAuthProviderError { error, description }) => {
            assert_eq!(error, "access_denied");
            assert_eq!(description.as_deref(), Some("user cancelled"));
        }
        other => panic!("expected provider error, got {:?}", other),
    }

    assert!(captured.lock().unwrap().is_none());
    assert!(!token_file_exists(&dir));
    assert!(port_is_free(port).await);
}

#[tokio::test]
async fn error_with_foreign_state_does_not_end_the_attempt() {
    let dir = TempDir::new().unwrap();
    let (token_base, _) = spawn_token_server(StatusCode::OK).await;

    let pending = login::start(options(&dir, &token_base)).await.unwrap();
    let port = pending.port();
    let state = state_of(&pending);
    let finish = tokio::spawn(pending.finish());

    let (status, _) = redirect(port, "error=access_denied&state=someone-else").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = redirect(port, &format!("code=real&state={}", state)).await;
    assert_eq!(status, StatusCode::OK);

    let token = finish.await.unwrap().unwrap();
    assert_eq!(token.access_token, "access-abc");
}

#[tokio::test]
async fn error_with_matching_state_ends_the_attempt() {
    let dir = TempDir::new().unwrap();
    let (token_base, _) = spawn_token_server(StatusCode::OK).await;

    let pending = login::start(options(&dir, &token_base)).await.unwrap();
    let port = pending.port();
    let state = state_of(&pending);
    let finish = tokio::spawn(pending.finish());

    let (status, _) = redirect(port, &format!("error=access_denied&state={}", state)).await;
    assert_eq!(status, StatusCode::OK);

    assert!(matches!(
        finish.await.unwrap(),
        Err(AuthError::OAuthProviderError { .. })
    ));
    assert!(!token_file_exists(&dir));
}

#[tokio::test]
async fn timeout_releases_the_listener() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir, "http://127.0.0.1:9");
    opts.timeout = Duration::from_millis(200);

    let pending = login::start(opts).await.unwrap();
    let port = pending.port();

    match pending.finish().await {
        Err(AuthError::AuthTimeout(timeout)) => {
            assert_eq!(timeout, Duration::from_millis(200))
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    assert!(!token_file_exists(&dir));
    assert!(port_is_free(port).await);
}

#[tokio::test]
async fn failed_exchange_writes_no_token() {
    let dir = TempDir::new().unwrap();
    let (token_base, _) = spawn_token_server(StatusCode::BAD_REQUEST).await;

    let pending = login::start(options(&dir, &token_base)).await.unwrap();
    let port = pending.port();
    let state = state_of(&pending);
    let finish = tokio::spawn(pending.finish());

    redirect(port, &format!("code=stale&state={}", state)).await;

    assert!(matches!(
        finish.await.unwrap(),
        Err(AuthError::TokenExchangeFailed(_))
    ));
    assert!(!token_file_exists(&dir));
}

#[tokio::test]
async fn occupied_port_fails_to_bind() {
    let dir = TempDir::new().unwrap();
    let held = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = held.local_addr().unwrap().port();

    let mut opts = options(&dir, "http://127.0.0.1:9");
    opts.port = port;

    match login::start(opts).await {
        Err(AuthError::ListenerBindFailed { port: failed, .. }) => assert_eq!(failed, port),
        Err(other) => panic!("expected bind failure, got {:?}", other),
        Ok(_) => panic!("expected bind failure"),
    }
}

#[tokio::test]
async fn missing_credentials_are_reported_before_binding() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir, "http://127.0.0.1:9");
    opts.client_secret = SecretString::from(String::new());
    opts.scopes.clear();

    match login::start(opts).await {
        Err(AuthError::MissingOAuthCredentials { missing }) => {
            assert_eq!(missing, vec!["client-secret", "scope"])
        }
        Err(other) => panic!("expected missing credentials, got {:?}", other),
        Ok(_) => panic!("expected missing credentials"),
    }
}

#[tokio::test]
async fn scopes_are_validated_against_the_application_type() {
    let dir = TempDir::new().unwrap();
    let mut opts = options(&dir, "http://127.0.0.1:9");
    opts.app_type = OAuthApplicationType::Classic;

    assert!(matches!(
        login::start(opts).await,
        Err(AuthError::InvalidScope { .. })
    ));
}
