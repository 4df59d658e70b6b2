//! Mail Sentinel
//!
//! HTTP service that scores email text for phishing likelihood and emotional
//! tone with two pre-trained classifiers, optionally enriched by a Gemini
//! narrative, plus a Gmail fetch-and-analyze convenience endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MAIL SENTINEL                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────────┐  ┌────────────────┐  │
//! │  │  API      │  │  Analysis         │  │  Integrations  │  │
//! │  │  (Axum)   │─▶│  preprocess       │  │  Gemini        │  │
//! │  │           │  │  vectorize        │  │  Gmail (OAuth) │  │
//! │  │           │  │  classify + score │  │                │  │
//! │  └───────────┘  └───────────────────┘  └────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod handlers;
pub mod integrations;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use analysis::EmailAnalyzer;
use integrations::{MailSource, NarrativeProvider};

/// Shared application state; everything in it is read-only
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub analyzer: Arc<EmailAnalyzer>,
    pub narrator: Option<Arc<dyn NarrativeProvider>>,
    pub mail: Arc<dyn MailSource>,
}

/// CORS for the single configured origin, with credentials
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', cross-origin requests disabled", origin);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/analyze_email", post(handlers::email::analyze_email))
        .route("/fetch_and_analyze", get(handlers::email::fetch_and_analyze))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
