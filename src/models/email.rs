//! Email analysis model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Request body for `/analyze_email`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailInput {
    pub subject: String,
    pub body: String,
}

/// Coarse bucketing of the phishing probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        if score > 0.75 {
            ConfidenceTier::High
        } else if score > 0.5 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhishingResult {
    pub result: String,
    pub score: f64,
    pub confidence: ConfidenceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionBreakdown {
    pub primary: EmotionScore,
    pub top_emotions: Vec<EmotionScore>,
    /// Rounded probabilities in the model's class order
    pub all_emotions: IndexMap<String, f64>,
}

/// Where the narrative came from, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSource {
    pub source: String,
    pub content: Option<String>,
}

impl AnalysisSource {
    pub const GEMINI: &'static str = "Gemini AI";
    pub const LOCAL: &'static str = "Local Models";

    /// Empty narratives count as absent
    pub fn from_narrative(narrative: Option<String>) -> Self {
        match narrative.filter(|text| !text.is_empty()) {
            Some(text) => Self {
                source: Self::GEMINI.to_string(),
                content: Some(text),
            },
            None => Self {
                source: Self::LOCAL.to_string(),
                content: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: AnalysisSource,
    pub phishing: PhishingResult,
    pub emotions: EmotionBreakdown,
}

/// Subject and plain-text body pulled from a mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedEmail {
    pub subject: String,
    pub body: String,
}

impl From<FetchedEmail> for EmailInput {
    fn from(email: FetchedEmail) -> Self {
        Self {
            subject: email.subject,
            body: email.body,
        }
    }
}

/// One entry of the batch result list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Analyzed(Box<AnalysisResponse>),
    Failed { error: String },
}

/// Response body for `/fetch_and_analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchResponse {
    Results { results: Vec<BatchOutcome> },
    Empty { message: String },
}

impl FetchResponse {
    pub fn no_emails() -> Self {
        FetchResponse::Empty {
            message: "No emails found.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(ConfidenceTier::from_score(0.0), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_score(0.5), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_score(0.5001), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(0.75), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(0.7501), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(1.0), ConfidenceTier::High);
    }

    #[test]
    fn test_source_selection() {
        let local = AnalysisSource::from_narrative(None);
        assert_eq!(local.source, "Local Models");
        assert!(local.content.is_none());

        let empty = AnalysisSource::from_narrative(Some(String::new()));
        assert_eq!(empty.source, "Local Models");

        let gemini = AnalysisSource::from_narrative(Some("Looks risky".into()));
        assert_eq!(gemini.source, "Gemini AI");
        assert_eq!(gemini.content.as_deref(), Some("Looks risky"));
    }

    #[test]
    fn test_no_emails_shape() {
        let body = serde_json::to_value(FetchResponse::no_emails()).unwrap();
        assert_eq!(body, serde_json::json!({"message": "No emails found."}));
    }

    #[test]
    fn test_failed_outcome_shape() {
        let outcome = BatchOutcome::Failed { error: "500: Analysis failed: boom".into() };
        assert_eq!(
            serde_json::to_value(outcome).unwrap(),
            serde_json::json!({"error": "500: Analysis failed: boom"})
        );
    }
}
