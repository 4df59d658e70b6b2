//! Mail Sentinel server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mail_sentinel::{
    AppState, create_router,
    analysis::{classifier, EmailAnalyzer},
    config::Config,
    integrations::{GeminiClient, GmailConfig, GmailSource, MailSource, NarrativeProvider},
};

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mail_sentinel=debug,tower_http=debug".into());

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    init_tracing(&config);
    tracing::info!("Mail Sentinel starting ({})...", config.environment);

    // Load models; failure here is fatal
    let phishing = classifier::load_classifier(&config.phishing_model_path)
        .context("Model loading failed (phishing)")?;
    let emotion = classifier::load_classifier(&config.emotion_model_path)
        .context("Model loading failed (emotion)")?;

    let analyzer = Arc::new(EmailAnalyzer::new(phishing, emotion));

    let class_names = |c: &dyn classifier::ProbabilisticClassifier| {
        c.classes().iter().map(ToString::to_string).collect::<Vec<_>>()
    };
    tracing::info!("✅ Phishing model classes: {:?}", class_names(analyzer.phishing_model()));
    tracing::info!("✅ Emotion model classes: {:?}", class_names(analyzer.emotion_model()));
    tracing::warn!(
        "Vectorizer is fitted per request; feature columns do not match the training vocabulary"
    );

    let narrator: Option<Arc<dyn NarrativeProvider>> = match &config.gemini_api_key {
        Some(key) if config.gemini_enabled() => {
            let client = GeminiClient::new(key.clone(), config.gemini_model.clone());
            tracing::info!("✅ Gemini AI is enabled ({})", client.model());
            Some(Arc::new(client))
        }
        _ => {
            tracing::warn!("⚠️ GEMINI_API_KEY not found. Gemini AI disabled.");
            None
        }
    };

    let mail: Arc<dyn MailSource> = Arc::new(GmailSource::new(GmailConfig {
        credentials_path: config.gmail_credentials_path.clone(),
        redirect_port: config.gmail_redirect_port,
        max_results: config.gmail_max_results,
    }));

    // Build application state
    let state = AppState {
        config: config.clone(),
        analyzer,
        narrator,
        mail,
    };

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
