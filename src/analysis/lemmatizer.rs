//! Noun Lemmatizer
//!
//! WordNet-style noun lemmatization without a dictionary: an irregular
//! exception table first, then words that only look plural, then
//! inflectional suffix rules guarded against the common false positives
//! (`class`, `virus`, `analysis`, ...).

use std::collections::{HashMap, HashSet};
use once_cell::sync::Lazy;

use super::stopwords::{PREPROCESS_STOPWORDS, VECTORIZER_STOPWORDS};

static NOUN_EXCEPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("children", "child"),
        ("men", "man"),
        ("women", "woman"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("mice", "mouse"),
        ("geese", "goose"),
        ("oxen", "ox"),
        ("lice", "louse"),
        ("data", "datum"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
        ("analyses", "analysis"),
        ("crises", "crisis"),
        ("theses", "thesis"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("lives", "life"),
        ("wives", "wife"),
        ("knives", "knife"),
        ("leaves", "leaf"),
        ("halves", "half"),
        ("selves", "self"),
        ("wolves", "wolf"),
        ("thieves", "thief"),
        ("shelves", "shelf"),
        ("buses", "bus"),
        ("gases", "gas"),
        ("quizzes", "quiz"),
        ("movies", "movie"),
        ("cookies", "cookie"),
        ("calories", "calorie"),
    ]
    .into_iter()
    .collect()
});

/// Nouns that end in `s` without being plural
static INVARIANT_NOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "news", "series", "species", "thanks", "means", "headquarters",
        "physics", "mathematics", "economics", "politics", "ethics",
        "lens", "bias", "atlas", "canvas", "alias", "chaos", "christmas",
        "diabetes",
    ]
    .into_iter()
    .collect()
});

/// Endings that look plural but are not (`glass`, `virus`, `basis`)
const SINGULAR_ENDINGS: [&str; 3] = ["ss", "us", "is"];

fn is_invariant(word: &str) -> bool {
    INVARIANT_NOUNS.contains(word)
        || PREPROCESS_STOPWORDS.contains(word)
        || VECTORIZER_STOPWORDS.contains(word)
}

/// Lemmatize a single lowercase token as a noun
pub fn lemmatize(word: &str) -> String {
    if let Some(lemma) = NOUN_EXCEPTIONS.get(word) {
        return (*lemma).to_string();
    }

    if word.len() <= 3 || is_invariant(word) {
        return word.to_string();
    }

    if word.len() > 4 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }

    // "es" follows a real sibilant: boxes, matches, wishes, classes, buzzes
    for suffix in ["ches", "shes", "xes", "sses", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    // prizes, houses, causes: the "e" belongs to the stem
    if word.ends_with('s') && !SINGULAR_ENDINGS.iter().any(|e| word.ends_with(e)) {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}
