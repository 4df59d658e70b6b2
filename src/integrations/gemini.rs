//! Google Gemini narrative client
//!
//! Asks Gemini (`generateContent`) for a short phishing/emotion write-up.
//! Any failure is logged and reported as "no narrative".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("response contained no text")]
    EmptyResponse,
}

/// Source of free-text narrative analysis
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Narrative for one email, or `None` when unavailable
    async fn narrate(&self, subject: &str, body: &str) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fixed prompt template
    pub fn build_prompt(subject: &str, body: &str) -> String {
        format!(
            "Analyze this email for phishing attempts and emotional tone.\n\
             Provide a concise analysis in this format:\n\
             \n\
             Phishing Likelihood: [Low/Medium/High]\n\
             Emotional Tone: [Primary Emotion]\n\
             Analysis: [2-3 sentence explanation]\n\
             \n\
             Email Subject: {}\n\
             Email Body: {}\n",
            subject, body
        )
    }

    /// Send a prompt and return the concatenated candidate text
    pub async fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NarrativeError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrativeError::Api { status: status.as_u16(), body });
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| NarrativeError::Parse(e.to_string()))?;

        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, NarrativeError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or(NarrativeError::EmptyResponse)?;

    let text = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .concat();
    if text.trim().is_empty() {
        return Err(NarrativeError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl NarrativeProvider for GeminiClient {
    async fn narrate(&self, subject: &str, body: &str) -> Option<String> {
        let prompt = Self::build_prompt(subject, body);
        match self.generate(&prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Gemini analysis failed: {}", e);
                None
            }
        }
    }
}
