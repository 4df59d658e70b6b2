//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Scoring path errors
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    // Generic errors
    #[error("{0}")]
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AnalysisFailed(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// `"<status>: <detail>"`, as recorded in batch results
    pub fn summary(&self) -> String {
        format!("{}: {}", self.status_code().as_u16(), self)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();
        tracing::error!("Request failed: {}", detail);

        let body = Json(json!({
            "detail": detail,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::AnalysisFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::vectorizer::VectorizeError;

    #[test]
    fn test_analysis_error_message() {
        let err = AppError::from(AnalysisError::from(VectorizeError::EmptyVocabulary));
        assert_eq!(
            err.to_string(),
            "Analysis failed: empty vocabulary; perhaps the documents only contain stop words"
        );
        assert_eq!(
            err.summary(),
            "500: Analysis failed: empty vocabulary; perhaps the documents only contain stop words"
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::InternalError("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
