//! Result scoring: turns raw class probabilities into response blocks

use indexmap::IndexMap;

use super::classifier::ClassLabel;
use crate::models::{ConfidenceTier, EmotionBreakdown, EmotionScore, PhishingResult};

/// Class index that maps to the "Phishing" label
pub const PHISHING_CLASS_INDEX: usize = 1;

/// Number of ranked emotions returned
pub const TOP_EMOTIONS: usize = 3;

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Index of the highest probability; first index wins ties
fn argmax(proba: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &p) in proba.iter().enumerate() {
        match best {
            Some(b) if proba[b] >= p => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Phishing verdict from binary class probabilities
pub fn phishing_verdict(proba: &[f64]) -> Option<PhishingResult> {
    let predicted = argmax(proba)?;
    let score = proba[predicted];

    Some(PhishingResult {
        result: if predicted == PHISHING_CLASS_INDEX {
            "Phishing".to_string()
        } else {
            "Not Phishing".to_string()
        },
        score: round4(score),
        confidence: ConfidenceTier::from_score(score),
    })
}

/// Top `n` classes by probability, highest first; on ties the later class comes first
pub fn top_emotions(classes: &[ClassLabel], proba: &[f64], n: usize) -> Vec<EmotionScore> {
    let mut order: Vec<usize> = (0..proba.len().min(classes.len())).collect();
    order.sort_by(|&a, &b| proba[a].total_cmp(&proba[b]));

    order
        .into_iter()
        .rev()
        .take(n)
        .map(|i| EmotionScore {
            emotion: classes[i].to_string(),
            score: proba[i],
        })
        .collect()
}

/// Primary, top-3 and full (rounded) distribution
pub fn emotion_breakdown(classes: &[ClassLabel], proba: &[f64]) -> Option<EmotionBreakdown> {
    let ranked = top_emotions(classes, proba, TOP_EMOTIONS);
    let primary = ranked.first()?.clone();

    let all_emotions: IndexMap<String, f64> = classes
        .iter()
        .zip(proba)
        .map(|(label, &p)| (label.to_string(), round4(p)))
        .collect();

    Some(EmotionBreakdown {
        primary,
        top_emotions: ranked,
        all_emotions,
    })
}
