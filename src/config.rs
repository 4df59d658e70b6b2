//! Configuration module

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Pre-trained phishing classifier (JSON export)
    pub phishing_model_path: PathBuf,

    /// Pre-trained emotion classifier (JSON export)
    pub emotion_model_path: PathBuf,

    /// Gemini API key; narrative analysis is disabled without it
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    pub gemini_model: String,

    /// OAuth client secret file for Gmail
    pub gmail_credentials_path: PathBuf,

    /// Local port for the OAuth redirect
    pub gmail_redirect_port: u16,

    /// Messages fetched per `/fetch_and_analyze` call
    pub gmail_max_results: u32,

    /// Single origin allowed by CORS
    pub cors_origin: String,

    /// Log output format ("text" or "json")
    pub log_format: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let models_dir = PathBuf::from(lookup("MODELS_DIR").unwrap_or_else(|| "models".to_string()));

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            phishing_model_path: lookup("PHISHING_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| models_dir.join("phishing_model.json")),

            emotion_model_path: lookup("EMOTION_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| models_dir.join("emotion_model.json")),

            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),

            gemini_model: lookup("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash".to_string()),

            gmail_credentials_path: lookup("GMAIL_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("credential.json")),

            gmail_redirect_port: lookup("GMAIL_REDIRECT_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(51295),

            gmail_max_results: lookup("GMAIL_MAX_RESULTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),

            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),

            log_format: lookup("LOG_FORMAT")
                .unwrap_or_else(|| "text".to_string()),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
        }
    }

    pub fn gemini_enabled(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.phishing_model_path, PathBuf::from("models/phishing_model.json"));
        assert_eq!(config.emotion_model_path, PathBuf::from("models/emotion_model.json"));
        assert!(!config.gemini_enabled());
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.gmail_redirect_port, 51295);
        assert_eq!(config.gmail_max_results, 5);
        assert_eq!(config.cors_origin, "http://localhost:3000");
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("MODELS_DIR", "/srv/models"),
            ("EMOTION_MODEL_PATH", "/tmp/emotion.json"),
            ("GEMINI_API_KEY", "secret"),
            ("GMAIL_MAX_RESULTS", "10"),
            ("ENVIRONMENT", "production"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.phishing_model_path, PathBuf::from("/srv/models/phishing_model.json"));
        assert_eq!(config.emotion_model_path, PathBuf::from("/tmp/emotion.json"));
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.gmail_max_results, 10);
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_blank_key_disables_gemini() {
        let config = config_from(&[("GEMINI_API_KEY", "  ")]);
        assert!(!config.gemini_enabled());
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("GMAIL_REDIRECT_PORT", "-1")]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.gmail_redirect_port, 51295);
    }
}
