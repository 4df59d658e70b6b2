//! Email analysis handlers

use axum::{extract::State, Json};

use crate::{AppState, AppResult, AppError};
use crate::models::{AnalysisResponse, BatchOutcome, EmailInput, FetchResponse};

/// Narrative first, then local scoring off the async runtime
pub async fn run_analysis(state: &AppState, input: EmailInput) -> AppResult<AnalysisResponse> {
    let narrative = match &state.narrator {
        Some(narrator) => narrator.narrate(&input.subject, &input.body).await,
        None => None,
    };

    let analyzer = state.analyzer.clone();
    let result = tokio::task::spawn_blocking(move || analyzer.analyze(&input, narrative))
        .await
        .map_err(|e| AppError::InternalError(format!("scoring task failed: {}", e)))?;

    Ok(result?)
}

/// Analyze one email
pub async fn analyze_email(
    State(state): State<AppState>,
    Json(input): Json<EmailInput>,
) -> AppResult<Json<AnalysisResponse>> {
    let response = run_analysis(&state, input).await?;
    tracing::info!(
        "Analyzed email: {} ({:?}), primary emotion {}",
        response.phishing.result,
        response.phishing.confidence,
        response.emotions.primary.emotion
    );
    Ok(Json(response))
}

/// Fetch recent Gmail messages and analyze each
pub async fn fetch_and_analyze(State(state): State<AppState>) -> Json<FetchResponse> {
    let emails = state.mail.fetch_recent().await;
    if emails.is_empty() {
        return Json(FetchResponse::no_emails());
    }

    let mut results = Vec::with_capacity(emails.len());
    for email in emails {
        match run_analysis(&state, email.into()).await {
            Ok(response) => results.push(BatchOutcome::Analyzed(Box::new(response))),
            Err(e) => {
                tracing::warn!("Batch analysis failed for one message: {}", e);
                results.push(BatchOutcome::Failed { error: e.summary() });
            }
        }
    }

    Json(FetchResponse::Results { results })
}
