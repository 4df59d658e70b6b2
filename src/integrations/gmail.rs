//! Gmail mail source
//!
//! Authorizes interactively, lists the most recent messages and extracts
//! subject + plain-text body. Any failure for the batch is logged and
//! reported as an empty mailbox.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

use super::oauth;
use crate::models::FetchedEmail;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

pub const NO_SUBJECT: &str = "No Subject";
pub const NO_BODY: &str = "No Body Available";

/// Gmail bodies are URL-safe base64, padded or not
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("credential file not found at {0}")]
    CredentialsNotFound(String),

    #[error("invalid credential file: {0}")]
    Credentials(String),

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("OAuth callback failed: {0}")]
    Callback(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("Gmail API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Source of recent emails to analyze
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Most recent messages; empty when authorization or fetching fails
    async fn fetch_recent(&self) -> Vec<FetchedEmail>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

pub mod api {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct GmailMessage {
        pub id: String,
        pub payload: Option<MessagePayload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub parts: Option<Vec<MessagePart>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct MessageBody {
        pub data: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub mime_type: Option<String>,
        pub body: Option<MessageBody>,
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// `Subject` header, or the placeholder
pub fn extract_subject(payload: Option<&api::MessagePayload>) -> String {
    payload
        .and_then(|p| p.headers.as_ref())
        .and_then(|headers| headers.iter().find(|h| h.name == "Subject"))
        .map(|h| h.value.clone())
        .unwrap_or_else(|| NO_SUBJECT.to_string())
}

/// First top-level `text/plain` part, decoded; otherwise the placeholder
pub fn extract_body(payload: Option<&api::MessagePayload>) -> String {
    let part = payload
        .and_then(|p| p.parts.as_ref())
        .and_then(|parts| {
            parts
                .iter()
                .find(|part| part.mime_type.as_deref() == Some("text/plain"))
        });

    let Some(part) = part else {
        return NO_BODY.to_string();
    };

    let data = part
        .body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .unwrap_or_default();

    match GMAIL_BASE64.decode(data) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("Undecodable message body: {}", e);
            NO_BODY.to_string()
        }
    }
}

pub fn to_fetched_email(message: &api::GmailMessage) -> FetchedEmail {
    let payload = message.payload.as_ref();
    FetchedEmail {
        subject: extract_subject(payload),
        body: extract_body(payload),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub credentials_path: PathBuf,
    pub redirect_port: u16,
    pub max_results: u32,
}

pub struct GmailSource {
    config: GmailConfig,
    base_url: String,
    http: reqwest::Client,
}

impl GmailSource {
    pub fn new(config: GmailConfig) -> Self {
        Self {
            config,
            base_url: GMAIL_API_BASE.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point the API calls at another host (a mirror or a local stand-in)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn authenticate(&self) -> Result<String, GmailError> {
        let secret = oauth::load_client_secret(&self.config.credentials_path)?;
        oauth::authorize(&self.http, &secret, self.config.redirect_port).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<T, GmailError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GmailError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GmailError::Api { status: status.as_u16(), body });
        }

        resp.json().await.map_err(|e| GmailError::Parse(e.to_string()))
    }

    /// List and fetch the newest messages with an access token
    pub async fn fetch_with_token(&self, token: &str) -> Result<Vec<FetchedEmail>, GmailError> {
        let list_url = format!(
            "{}/messages?maxResults={}",
            self.base_url, self.config.max_results
        );
        let listing: api::ListMessagesResponse = self.get_json(&list_url, token).await?;

        let refs = listing.messages.unwrap_or_default();
        let mut emails = Vec::with_capacity(refs.len());
        for msg in refs {
            let url = format!("{}/messages/{}", self.base_url, msg.id);
            let message: api::GmailMessage = self.get_json(&url, token).await?;
            tracing::debug!("Fetched Gmail message {}", message.id);
            emails.push(to_fetched_email(&message));
        }
        Ok(emails)
    }

    /// Fetch with a token; any failure in the batch yields an empty list
    pub async fn fetch_or_empty(&self, token: &str) -> Vec<FetchedEmail> {
        match self.fetch_with_token(token).await {
            Ok(emails) if emails.is_empty() => {
                tracing::info!("No emails found");
                emails
            }
            Ok(emails) => {
                tracing::info!("Fetched {} emails", emails.len());
                emails
            }
            Err(e) => {
                tracing::error!("Gmail API error: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MailSource for GmailSource {
    async fn fetch_recent(&self) -> Vec<FetchedEmail> {
        let token = match self.authenticate().await {
            Ok(token) => {
                tracing::info!("Gmail authentication successful");
                token
            }
            Err(e) => {
                tracing::error!("Gmail authentication failed: {}", e);
                return Vec::new();
            }
        };

        self.fetch_or_empty(&token).await
    }
}
