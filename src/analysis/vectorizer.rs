//! Feature Vectorizer
//!
//! TF-IDF over unigrams and bigrams, fitted on the single document being
//! scored. The fitted vocabulary is sorted lexicographically, so column `i`
//! means "the i-th term of *this* document", not a term the classifiers were
//! trained on. Output is always [`FEATURE_WIDTH`] wide.

use std::collections::BTreeMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stopwords::VECTORIZER_STOPWORDS;

/// Width every classifier input must have
pub const FEATURE_WIDTH: usize = 5000;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w\w+\b").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorizeError {
    #[error("empty vocabulary; perhaps the documents only contain stop words")]
    EmptyVocabulary,
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Fixed-width classifier input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Number of leading columns that came from the fitted vocabulary
    pub fitted_width: usize,
    values: Vec<f32>,
}

impl FeatureVector {
    /// Create from fitted values; pads with zeros or truncates to [`FEATURE_WIDTH`]
    pub fn from_vec(mut values: Vec<f32>) -> Self {
        let fitted_width = values.len().min(FEATURE_WIDTH);
        values.resize(FEATURE_WIDTH, 0.0);
        Self { fitted_width, values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// VECTORIZER
// ============================================================================

/// Vocabulary and weights produced by one fit
#[derive(Debug, Clone)]
pub struct FittedDocument {
    /// Terms in column order
    pub vocabulary: Vec<String>,
    /// L2-normalized TF-IDF weight per term
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    ngram_range: (usize, usize),
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self {
            max_features: FEATURE_WIDTH,
            ngram_range: (1, 2),
        }
    }
}

impl TfidfVectorizer {
    pub fn new(max_features: usize, ngram_range: (usize, usize)) -> Self {
        Self { max_features, ngram_range }
    }

    /// Tokenize, drop stop words, emit n-grams
    pub fn analyze(&self, document: &str) -> Vec<String> {
        let lowered = document.to_lowercase();
        let tokens: Vec<&str> = TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !VECTORIZER_STOPWORDS.contains(t))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n.max(1)..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }

    /// Fit on one document and return its TF-IDF row
    pub fn fit_transform(&self, document: &str) -> Result<FittedDocument, VectorizeError> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for term in self.analyze(document) {
            *counts.entry(term).or_insert(0) += 1;
        }

        if counts.is_empty() {
            return Err(VectorizeError::EmptyVocabulary);
        }

        if counts.len() > self.max_features {
            // Keep the most frequent terms; ties go to the earlier term
            let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
            ranked.truncate(self.max_features);
            counts = ranked.into_iter().collect();
        }

        // Smoothed idf with a single document: ln((1 + 1) / (1 + 1)) + 1
        let n_documents = 1.0f64;
        let document_frequency = 1.0f64;
        let idf = ((1.0 + n_documents) / (1.0 + document_frequency)).ln() + 1.0;

        let raw: Vec<f64> = counts.values().map(|&c| c as f64 * idf).collect();
        let norm = raw.iter().map(|w| w * w).sum::<f64>().sqrt();

        Ok(FittedDocument {
            vocabulary: counts.into_keys().collect(),
            weights: raw.iter().map(|w| (w / norm) as f32).collect(),
        })
    }

    /// Fit, then pad to the classifier width
    pub fn vectorize(&self, document: &str) -> Result<FeatureVector, VectorizeError> {
        let fitted = self.fit_transform(document)?;
        Ok(FeatureVector::from_vec(fitted.weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unigrams_and_bigrams_sorted() {
        let v = TfidfVectorizer::default();
        let fitted = v.fit_transform("win free prize click").unwrap();
        assert_eq!(
            fitted.vocabulary,
            vec![
                "click", "free", "free prize", "prize", "prize click",
                "win", "win free",
            ]
        );
    }

    #[test]
    fn test_row_is_l2_normalized() {
        let v = TfidfVectorizer::default();
        let fitted = v.fit_transform("alert alert account locked").unwrap();
        let norm: f32 = fitted.weights.iter().map(|w| w * w).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let alert = fitted.vocabulary.iter().position(|t| t == "alert").unwrap();
        let locked = fitted.vocabulary.iter().position(|t| t == "locked").unwrap();
        assert!((fitted.weights[alert] - 2.0 * fitted.weights[locked]).abs() < 1e-5);
    }

    #[test]
    fn test_short_tokens_and_stop_words_skipped() {
        let v = TfidfVectorizer::default();
        let terms = v.analyze("a x we verify bill account");
        // bigrams are built after stop word removal
        assert_eq!(terms, vec!["verify", "account", "verify account"]);
    }

    #[test]
    fn test_empty_vocabulary() {
        let v = TfidfVectorizer::default();
        assert_eq!(v.vectorize("").unwrap_err(), VectorizeError::EmptyVocabulary);
        assert_eq!(
            v.vectorize("please call").unwrap_err().to_string(),
            "empty vocabulary; perhaps the documents only contain stop words"
        );
    }

    #[test]
    fn test_always_full_width() {
        let v = TfidfVectorizer::default();
        let vector = v.vectorize("urgent payment required").unwrap();
        assert_eq!(vector.len(), FEATURE_WIDTH);
        assert_eq!(vector.fitted_width, 5);
        assert!(vector.as_slice()[5..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let v = TfidfVectorizer::new(2, (1, 1));
        let fitted = v.fit_transform("zeta zeta alpha beta beta beta").unwrap();
        assert_eq!(fitted.vocabulary, vec!["beta", "zeta"]);
    }

    #[test]
    fn test_long_document_capped() {
        let words: Vec<String> = (0..4000).map(|i| format!("w{:05}", i)).collect();
        let vector = TfidfVectorizer::default().vectorize(&words.join(" ")).unwrap();
        assert_eq!(vector.len(), FEATURE_WIDTH);
        assert_eq!(vector.fitted_width, FEATURE_WIDTH);
    }

    #[test]
    fn test_from_vec_truncates() {
        let vector = FeatureVector::from_vec(vec![1.0; FEATURE_WIDTH + 10]);
        assert_eq!(vector.len(), FEATURE_WIDTH);
    }
}
