//! Text Preprocessor
//!
//! Normalizes raw `subject body` text before vectorization:
//! lowercase, keep ASCII letters and whitespace, drop stopwords,
//! lemmatize, rejoin with single spaces.

use once_cell::sync::Lazy;
use regex::Regex;

use super::lemmatizer::lemmatize;
use super::stopwords::PREPROCESS_STOPWORDS;

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z\s]").expect("static regex")
});

/// Build the raw text fed to the preprocessor
pub fn combine(subject: &str, body: &str) -> String {
    format!("{} {}", subject, body)
}

/// Normalize text. Never fails; empty input yields an empty string.
pub fn preprocess_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let letters_only = NON_ALPHA.replace_all(&lowered, "");

    letters_only
        .split_whitespace()
        .filter(|word| !PREPROCESS_STOPWORDS.contains(word))
        .map(lemmatize)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_email() {
        let text = combine("Win a free prize", "Click here now");
        assert_eq!(preprocess_text(&text), "win free prize click");
    }

    #[test]
    fn test_strips_punctuation_and_digits() {
        assert_eq!(
            preprocess_text("Your ACCOUNT #1234 was SUSPENDED!!!"),
            "account suspended"
        );
    }

    #[test]
    fn test_apostrophes_are_removed_before_stopwords() {
        // "don't" becomes "dont", which is not in the list
        assert_eq!(preprocess_text("don't wait"), "dont wait");
    }

    #[test]
    fn test_non_ascii_letters_dropped() {
        assert_eq!(preprocess_text("café naïve"), "caf nave");
    }

    #[test]
    fn test_empty_and_stopword_only() {
        assert_eq!(preprocess_text(""), "");
        assert_eq!(preprocess_text("   \n\t "), "");
        assert_eq!(preprocess_text("the and of it"), "");
    }

    #[test]
    fn test_stopwords_ending_in_s_survive_lemmatization() {
        assert_eq!(preprocess_text("Perhaps always"), "perhaps always");
        assert_eq!(preprocess_text("Always verify"), "always verify");
    }

    #[test]
    fn test_vectorizer_stopwords_still_drop_after_preprocessing() {
        use crate::analysis::vectorizer::{TfidfVectorizer, VectorizeError};

        let vectorizer = TfidfVectorizer::default();
        assert!(matches!(
            vectorizer.fit_transform(&preprocess_text("Perhaps always")),
            Err(VectorizeError::EmptyVocabulary)
        ));

        let fitted = vectorizer
            .fit_transform(&preprocess_text("Always verify"))
            .unwrap();
        assert_eq!(fitted.vocabulary, vec!["verify".to_string()]);
    }

    #[test]
    fn test_single_space_join() {
        assert_eq!(preprocess_text("  urgent\n\n\tpayments  "), "urgent payment");
    }
}
