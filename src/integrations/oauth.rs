//! Installed-app OAuth flow for Google APIs
//!
//! Consent URL -> one-shot local callback listener -> code exchange.

use std::path::Path;

use reqwest::Url;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::gmail::GmailError;

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const MAX_REQUEST_HEAD: usize = 8 * 1024;

const COMPLETION_PAGE: &str =
    "The authentication flow has completed. You may close this window.";

/// Client secret as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Read the `installed` (or `web`) section of a client secret file
pub fn load_client_secret(path: &Path) -> Result<ClientSecret, GmailError> {
    if !path.exists() {
        return Err(GmailError::CredentialsNotFound(path.display().to_string()));
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| GmailError::Credentials(e.to_string()))?;
    let file: ClientSecretFile = serde_json::from_str(&raw)
        .map_err(|e| GmailError::Credentials(e.to_string()))?;

    file.installed
        .or(file.web)
        .ok_or_else(|| GmailError::Credentials("missing 'installed' or 'web' section".to_string()))
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/", port)
}

/// Consent URL the operator opens in a browser
pub fn authorization_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, GmailError> {
    Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", GMAIL_READONLY_SCOPE),
            ("state", state),
            ("access_type", "offline"),
        ],
    )
    .map_err(|e| GmailError::Credentials(format!("invalid auth_uri: {}", e)))
}

/// Pull `code` out of the callback request line, checking `state`
pub fn parse_callback(request_line: &str, expected_state: &str) -> Result<String, GmailError> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| GmailError::Callback("malformed request line".to_string()))?;

    let url = Url::parse(&format!("http://localhost{}", target))
        .map_err(|e| GmailError::Callback(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(GmailError::Callback(format!("authorization denied: {}", value))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(GmailError::StateMismatch);
    }
    code.ok_or_else(|| GmailError::Callback("callback had no code".to_string()))
}

/// Accept one redirect on `listener` and return the authorization code
pub async fn wait_for_callback(
    listener: &TcpListener,
    expected_state: &str,
) -> Result<String, GmailError> {
    let (mut stream, peer) = listener
        .accept()
        .await
        .map_err(|e| GmailError::Callback(e.to_string()))?;
    tracing::debug!("OAuth callback connection from {}", peer);

    let mut head = Vec::with_capacity(1024);
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| GmailError::Callback(e.to_string()))?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&head);
    let request_line = text.lines().next().unwrap_or_default();
    let result = parse_callback(request_line, expected_state);

    let body = match &result {
        Ok(_) => COMPLETION_PAGE.to_string(),
        Err(e) => format!("Authorization failed: {}", e),
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("Failed to answer OAuth callback: {}", e);
    }

    result
}

/// Trade an authorization code for an access token
pub async fn exchange_code(
    http: &reqwest::Client,
    secret: &ClientSecret,
    code: &str,
    redirect_uri: &str,
) -> Result<String, GmailError> {
    let resp = http
        .post(&secret.token_uri)
        .form(&[
            ("code", code),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| GmailError::Network(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GmailError::Api { status: status.as_u16(), body });
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| GmailError::Parse(e.to_string()))?;
    Ok(token.access_token)
}

/// Write the consent prompt for the operator
pub fn announce_consent_url<W: std::io::Write>(url: &Url, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Please visit this URL to authorize this application: {}", url)?;
    out.flush()
}

/// Full interactive authorization; returns an access token
pub async fn authorize(
    http: &reqwest::Client,
    secret: &ClientSecret,
    port: u16,
) -> Result<String, GmailError> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| GmailError::Callback(format!("cannot listen on port {}: {}", port, e)))?;

    let redirect = redirect_uri(port);
    let state = uuid::Uuid::new_v4().simple().to_string();
    let url = authorization_url(secret, &redirect, &state)?;

    if let Err(e) = announce_consent_url(&url, &mut std::io::stdout()) {
        tracing::warn!("Could not print consent URL: {}", e);
    }
    tracing::info!("Waiting for Gmail consent on {}", redirect);

    if let Err(e) = webbrowser::open(url.as_str()) {
        tracing::warn!("Could not open a browser for Gmail consent: {}", e);
    }

    let code = wait_for_callback(&listener, &state).await?;
    exchange_code(http, secret, &code, &redirect).await
}
