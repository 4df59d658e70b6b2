//! Email analysis pipeline
//!
//! preprocess -> vectorize (per-document fit) -> phishing + emotion
//! classifiers -> scored response blocks.

pub mod classifier;
pub mod lemmatizer;
pub mod preprocess;
pub mod scorer;
pub mod stopwords;
pub mod vectorizer;

use std::sync::Arc;
use thiserror::Error;

use classifier::{ModelError, ProbabilisticClassifier};
use vectorizer::{TfidfVectorizer, VectorizeError};
use crate::models::{AnalysisResponse, AnalysisSource, EmailInput, EmotionBreakdown, PhishingResult};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Vectorize(#[from] VectorizeError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{0} classifier returned no probabilities")]
    EmptyPrediction(&'static str),
}

/// Local scores for one email
#[derive(Debug, Clone)]
pub struct LocalScores {
    pub phishing: PhishingResult,
    pub emotions: EmotionBreakdown,
}

/// Holds both classifiers; immutable after startup
pub struct EmailAnalyzer {
    phishing: Arc<dyn ProbabilisticClassifier>,
    emotion: Arc<dyn ProbabilisticClassifier>,
    vectorizer: TfidfVectorizer,
}

impl EmailAnalyzer {
    pub fn new(
        phishing: Arc<dyn ProbabilisticClassifier>,
        emotion: Arc<dyn ProbabilisticClassifier>,
    ) -> Self {
        Self {
            phishing,
            emotion,
            vectorizer: TfidfVectorizer::default(),
        }
    }

    pub fn phishing_model(&self) -> &dyn ProbabilisticClassifier {
        self.phishing.as_ref()
    }

    pub fn emotion_model(&self) -> &dyn ProbabilisticClassifier {
        self.emotion.as_ref()
    }

    /// Run both classifiers on one email
    pub fn score(&self, input: &EmailInput) -> Result<LocalScores, AnalysisError> {
        let text = preprocess::combine(&input.subject, &input.body);
        let processed = preprocess::preprocess_text(&text);

        let features = self.vectorizer.vectorize(&processed)?;
        tracing::debug!(
            "Vectorized email: {} fitted columns, width {}",
            features.fitted_width,
            features.len()
        );

        let phishing_proba = self.phishing.predict_proba(&features)?;
        let emotion_proba = self.emotion.predict_proba(&features)?;

        let phishing = scorer::phishing_verdict(&phishing_proba)
            .ok_or(AnalysisError::EmptyPrediction("phishing"))?;
        let emotions = scorer::emotion_breakdown(self.emotion.classes(), &emotion_proba)
            .ok_or(AnalysisError::EmptyPrediction("emotion"))?;

        Ok(LocalScores { phishing, emotions })
    }

    /// Score locally and attach the optional narrative
    pub fn analyze(
        &self,
        input: &EmailInput,
        narrative: Option<String>,
    ) -> Result<AnalysisResponse, AnalysisError> {
        let scores = self.score(input)?;
        Ok(AnalysisResponse {
            analysis: AnalysisSource::from_narrative(narrative),
            phishing: scores.phishing,
            emotions: scores.emotions,
        })
    }
}
