//! Classifier Engine
//!
//! Loads the exported phishing and emotion estimators from disk and exposes
//! them behind one trait so the scorer does not care which kind was trained.
//!
//! Model file format (JSON):
//!
//! ```text
//! { "kind": "logistic_regression", "classes": [0, 1],
//!   "coef": [[...5000...]], "intercept": [...],
//!   "multi_class": "multinomial" }            // or "ovr"; optional
//!
//! { "kind": "multinomial_nb", "classes": ["anger", "joy", ...],
//!   "class_log_prior": [...], "feature_log_prob": [[...5000...], ...] }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::vectorizer::{FeatureVector, FEATURE_WIDTH};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model has no classes")]
    NoClasses,

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("X has {actual} features, but model is expecting {expected} features as input.")]
    FeatureCount { expected: usize, actual: usize },
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Class label as exported by the trainer (strings or integers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Integer(i64),
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Integer(v) => write!(f, "{}", v),
            ClassLabel::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ClassLabel {
    fn from(value: &str) -> Self {
        ClassLabel::Text(value.to_string())
    }
}

impl From<i64> for ClassLabel {
    fn from(value: i64) -> Self {
        ClassLabel::Integer(value)
    }
}

/// How a multi-class logistic regression turns decision scores into probabilities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    /// Softmax over all decision scores
    #[default]
    Multinomial,
    /// One-vs-rest: a sigmoid per class, then normalized
    Ovr,
}

/// On-disk representation of a fitted estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelFile {
    LogisticRegression {
        classes: Vec<ClassLabel>,
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
        #[serde(default)]
        multi_class: MultiClass,
    },
    MultinomialNb {
        classes: Vec<ClassLabel>,
        class_log_prior: Vec<f32>,
        feature_log_prob: Vec<Vec<f32>>,
    },
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Read-only probabilistic classifier shared across requests
pub trait ProbabilisticClassifier: Send + Sync {
    fn kind(&self) -> &'static str;
    fn classes(&self) -> &[ClassLabel];
    fn n_features(&self) -> usize;

    /// One probability per class, in `classes()` order, summing to 1
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError>;
}

fn check_rows(rows: &[Vec<f32>]) -> Result<usize, ModelError> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if width == 0 {
        return Err(ModelError::Shape("weight matrix is empty".to_string()));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(ModelError::Shape(format!(
            "row {} has {} columns, expected {}",
            i,
            row.len(),
            width
        )));
    }
    Ok(width)
}

fn check_input(expected: usize, features: &FeatureVector) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::FeatureCount { expected, actual: features.len() });
    }
    Ok(())
}

fn dot(weights: &[f32], features: &[f32]) -> f64 {
    weights
        .iter()
        .zip(features)
        .map(|(&w, &x)| w as f64 * x as f64)
        .sum()
}

/// Normalize log-likelihoods into probabilities (log-sum-exp)
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn sigmoid(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

/// Independent per-class sigmoids rescaled to sum to 1
fn ovr_normalize(scores: &[f64]) -> Vec<f64> {
    let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
    let sum: f64 = probs.iter().sum();
    if sum == 0.0 {
        return vec![1.0 / probs.len() as f64; probs.len()];
    }
    probs.into_iter().map(|p| p / sum).collect()
}

// ============================================================================
// LOGISTIC REGRESSION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    classes: Vec<ClassLabel>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    n_features: usize,
    multi_class: MultiClass,
}

impl LogisticRegression {
    pub fn new(
        classes: Vec<ClassLabel>,
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
    ) -> Result<Self, ModelError> {
        if classes.is_empty() {
            return Err(ModelError::NoClasses);
        }
        if classes.len() < 2 {
            return Err(ModelError::Shape("logistic regression needs at least 2 classes".to_string()));
        }
        let n_features = check_rows(&coef)?;

        // Binary models carry a single row
        let expected_rows = if classes.len() == 2 { 1 } else { classes.len() };
        if coef.len() != expected_rows {
            return Err(ModelError::Shape(format!(
                "{} classes need {} coefficient rows, found {}",
                classes.len(),
                expected_rows,
                coef.len()
            )));
        }
        if intercept.len() != expected_rows {
            return Err(ModelError::Shape(format!(
                "expected {} intercepts, found {}",
                expected_rows,
                intercept.len()
            )));
        }

        Ok(Self {
            classes,
            coef,
            intercept,
            n_features,
            multi_class: MultiClass::default(),
        })
    }

    pub fn with_multi_class(mut self, multi_class: MultiClass) -> Self {
        self.multi_class = multi_class;
        self
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        check_input(self.n_features, features)?;
        let x = features.as_slice();

        let decision: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, &b)| dot(row, x) + b as f64)
            .collect();

        if decision.len() == 1 {
            let p = sigmoid(decision[0]);
            return Ok(vec![1.0 - p, p]);
        }

        Ok(match self.multi_class {
            MultiClass::Multinomial => softmax(&decision),
            MultiClass::Ovr => ovr_normalize(&decision),
        })
    }
}

// ============================================================================
// MULTINOMIAL NAIVE BAYES
// ============================================================================

#[derive(Debug, Clone)]
pub struct MultinomialNb {
    classes: Vec<ClassLabel>,
    class_log_prior: Vec<f32>,
    feature_log_prob: Vec<Vec<f32>>,
    n_features: usize,
}

impl MultinomialNb {
    pub fn new(
        classes: Vec<ClassLabel>,
        class_log_prior: Vec<f32>,
        feature_log_prob: Vec<Vec<f32>>,
    ) -> Result<Self, ModelError> {
        if classes.is_empty() {
            return Err(ModelError::NoClasses);
        }
        let n_features = check_rows(&feature_log_prob)?;

        if feature_log_prob.len() != classes.len() || class_log_prior.len() != classes.len() {
            return Err(ModelError::Shape(format!(
                "{} classes, {} priors, {} likelihood rows",
                classes.len(),
                class_log_prior.len(),
                feature_log_prob.len()
            )));
        }

        Ok(Self { classes, class_log_prior, feature_log_prob, n_features })
    }
}

impl ProbabilisticClassifier for MultinomialNb {
    fn kind(&self) -> &'static str {
        "multinomial_nb"
    }

    fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        check_input(self.n_features, features)?;
        let x = features.as_slice();

        let joint: Vec<f64> = self
            .feature_log_prob
            .iter()
            .zip(&self.class_log_prior)
            .map(|(row, &prior)| dot(row, x) + prior as f64)
            .collect();

        Ok(softmax(&joint))
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl ModelFile {
    /// Build the classifier and check it accepts full-width feature vectors
    pub fn into_classifier(self) -> Result<Arc<dyn ProbabilisticClassifier>, ModelError> {
        let classifier: Arc<dyn ProbabilisticClassifier> = match self {
            ModelFile::LogisticRegression { classes, coef, intercept, multi_class } => {
                Arc::new(LogisticRegression::new(classes, coef, intercept)?.with_multi_class(multi_class))
            }
            ModelFile::MultinomialNb { classes, class_log_prior, feature_log_prob } => {
                Arc::new(MultinomialNb::new(classes, class_log_prior, feature_log_prob)?)
            }
        };

        if classifier.n_features() != FEATURE_WIDTH {
            return Err(ModelError::Shape(format!(
                "model expects {} features, vectorizer produces {}",
                classifier.n_features(),
                FEATURE_WIDTH
            )));
        }

        Ok(classifier)
    }
}

/// Load a classifier from a JSON model file
pub fn load_classifier(path: &Path) -> Result<Arc<dyn ProbabilisticClassifier>, ModelError> {
    tracing::info!("Loading model from: {}", path.display());

    let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let file: ModelFile = serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let classifier = file.into_classifier()?;
    tracing::info!(
        "Loaded {} model with {} classes",
        classifier.kind(),
        classifier.classes().len()
    );
    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels(names: &[&str]) -> Vec<ClassLabel> {
        names.iter().map(|&n| ClassLabel::from(n)).collect()
    }

    fn unit_vector(width: usize, hot: usize) -> FeatureVector {
        let mut values = vec![0.0; width];
        values[hot] = 1.0;
        FeatureVector::from_vec(values)
    }

    #[test]
    fn test_binary_logistic_sigmoid() {
        let mut row = vec![0.0; FEATURE_WIDTH];
        row[0] = 2.0;
        let model = LogisticRegression::new(
            vec![0i64.into(), 1i64.into()],
            vec![row],
            vec![-1.0],
        )
        .unwrap();

        let proba = model.predict_proba(&unit_vector(FEATURE_WIDTH, 0)).unwrap();
        let expected = 1.0 / (1.0 + (-1.0f64).exp());
        assert_eq!(proba.len(), 2);
        assert!((proba[1] - expected).abs() < 1e-9);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_multiclass_softmax() {
        let rows = vec![vec![0.0; FEATURE_WIDTH]; 3];
        let model = LogisticRegression::new(
            labels(&["anger", "joy", "sadness"]),
            rows,
            vec![0.0, 1.0, 0.0],
        )
        .unwrap();

        let proba = model.predict_proba(&unit_vector(FEATURE_WIDTH, 7)).unwrap();
        let sum: f64 = proba.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(proba[1] > proba[0]);
        assert!((proba[0] - proba[2]).abs() < 1e-12);
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let rows = vec![vec![0.0; FEATURE_WIDTH]; 3];
        let intercept = vec![0.0, 1.0, -1.0];
        let softmax_model =
            LogisticRegression::new(labels(&["anger", "joy", "sadness"]), rows.clone(), intercept.clone())
                .unwrap();
        let ovr_model = LogisticRegression::new(labels(&["anger", "joy", "sadness"]), rows, intercept)
            .unwrap()
            .with_multi_class(MultiClass::Ovr);

        let x = unit_vector(FEATURE_WIDTH, 0);
        let ovr = ovr_model.predict_proba(&x).unwrap();
        let soft = softmax_model.predict_proba(&x).unwrap();

        let raw = [sigmoid(0.0), sigmoid(1.0), sigmoid(-1.0)];
        let total: f64 = raw.iter().sum();
        for (p, r) in ovr.iter().zip(raw) {
            assert!((p - r / total).abs() < 1e-12);
        }
        assert!((ovr.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((ovr[1] - soft[1]).abs() > 1e-3);
    }

    #[test]
    fn test_multi_class_parsed_from_model_file() {
        let ovr: ModelFile = serde_json::from_value(serde_json::json!({
            "kind": "logistic_regression",
            "classes": ["a", "b", "c"],
            "coef": [[0.0], [0.0], [0.0]],
            "intercept": [0.0, 0.0, 0.0],
            "multi_class": "ovr"
        }))
        .unwrap();
        assert!(matches!(
            ovr,
            ModelFile::LogisticRegression { multi_class: MultiClass::Ovr, .. }
        ));

        let default: ModelFile = serde_json::from_value(serde_json::json!({
            "kind": "logistic_regression",
            "classes": [0, 1],
            "coef": [[0.0]],
            "intercept": [0.0]
        }))
        .unwrap();
        assert!(matches!(
            default,
            ModelFile::LogisticRegression { multi_class: MultiClass::Multinomial, .. }
        ));
    }

    #[test]
    fn test_naive_bayes() {
        let mut fear = vec![-10.0; FEATURE_WIDTH];
        fear[3] = -0.5;
        let joy = vec![-10.0; FEATURE_WIDTH];
        let model = MultinomialNb::new(
            labels(&["fear", "joy"]),
            vec![(0.5f32).ln(), (0.5f32).ln()],
            vec![fear, joy],
        )
        .unwrap();

        let proba = model.predict_proba(&unit_vector(FEATURE_WIDTH, 3)).unwrap();
        assert!(proba[0] > 0.99);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let model = LogisticRegression::new(
            vec![0i64.into(), 1i64.into()],
            vec![vec![0.0; 10]],
            vec![0.0],
        )
        .unwrap();
        let err = model.predict_proba(&unit_vector(FEATURE_WIDTH, 0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "X has 5000 features, but model is expecting 10 features as input."
        );
    }

    #[test]
    fn test_shape_validation() {
        assert!(matches!(
            LogisticRegression::new(vec![], vec![vec![0.0]], vec![0.0]),
            Err(ModelError::NoClasses)
        ));
        assert!(matches!(
            LogisticRegression::new(labels(&["a", "b", "c"]), vec![vec![0.0; 4]], vec![0.0]),
            Err(ModelError::Shape(_))
        ));
        assert!(matches!(
            MultinomialNb::new(labels(&["a", "b"]), vec![0.0, 0.0], vec![vec![0.0; 4], vec![0.0; 3]]),
            Err(ModelError::Shape(_))
        ));
    }

    #[test]
    fn test_wrong_width_rejected_at_load() {
        let file = ModelFile::LogisticRegression {
            classes: vec![0i64.into(), 1i64.into()],
            coef: vec![vec![0.0; 100]],
            intercept: vec![0.0],
            multi_class: MultiClass::Multinomial,
        };
        assert!(matches!(file.into_classifier(), Err(ModelError::Shape(_))));
    }

    #[test]
    fn test_load_from_file() {
        let model = serde_json::json!({
            "kind": "multinomial_nb",
            "classes": ["anger", "joy"],
            "class_log_prior": [-0.69, -0.69],
            "feature_log_prob": [vec![-8.0; FEATURE_WIDTH], vec![-8.0; FEATURE_WIDTH]],
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", model).unwrap();

        let classifier = tokio_test::assert_ok!(load_classifier(file.path()));
        assert_eq!(classifier.kind(), "multinomial_nb");
        assert_eq!(classifier.classes(), labels(&["anger", "joy"]).as_slice());
        assert_eq!(classifier.n_features(), FEATURE_WIDTH);
    }

    #[test]
    fn test_integer_labels_parse() {
        let labels: Vec<ClassLabel> = serde_json::from_str(r#"[0, 1, "spam"]"#).unwrap();
        assert_eq!(labels[1], ClassLabel::Integer(1));
        assert_eq!(labels[2].to_string(), "spam");
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let missing = load_classifier(Path::new("/nonexistent/model.json"));
        assert!(matches!(missing, Err(ModelError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(load_classifier(file.path()), Err(ModelError::Parse { .. })));
    }
}
