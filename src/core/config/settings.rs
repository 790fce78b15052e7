use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

fn default_port() -> u16 {
    5001
}

fn default_engine_url() -> String {
    "http://localhost:5005/webhooks/rest/webhook".to_string()
}

fn default_model_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_id() -> String {
    "llama3.2:1b".to_string()
}

fn default_timeout() -> u64 {
    120
}

/// Server settings, loaded from `teller.toml` with env-var overrides.
///
/// Every remote collaborator (conversational engine, model runtime, embedding
/// endpoint, translation service) is configured here; retrieval constants are
/// fixed in the rag module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Webhook URL of the external conversational engine.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,
    /// Base URL of the generative model runtime.
    #[serde(default = "default_model_url")]
    pub model_url: String,
    /// Model identifier passed on every generate call.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Remote embedding endpoint; the deterministic local embedder is used
    /// when unset.
    #[serde(default)]
    pub embedding_url: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    /// Translation service for non-English replies; disabled when unset.
    #[serde(default)]
    pub translation_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: default_port(),
            engine_url: default_engine_url(),
            model_url: default_model_url(),
            model_id: default_model_id(),
            embedding_url: None,
            embedding_model: None,
            translation_url: None,
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Settings {
    /// Reads the TOML config file if present, then applies env overrides.
    /// A missing file falls back to defaults; a malformed file is an error.
    pub fn load(config_path: &Path) -> Result<Self, ApiError> {
        let mut settings = if config_path.exists() {
            let raw = fs::read_to_string(config_path).map_err(ApiError::internal)?;
            toml::from_str(&raw)
                .map_err(|e| ApiError::Internal(format!("invalid config file: {}", e)))?
        } else {
            Settings::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(url) = env::var("TELLER_ENGINE_URL") {
            self.engine_url = url;
        }
        if let Ok(url) = env::var("TELLER_MODEL_URL") {
            self.model_url = url;
        }
        if let Ok(id) = env::var("TELLER_MODEL_ID") {
            self.model_id = id;
        }
        if let Ok(url) = env::var("TELLER_EMBEDDING_URL") {
            self.embedding_url = Some(url);
        }
        if let Ok(url) = env::var("TELLER_TRANSLATION_URL") {
            self.translation_url = Some(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(settings.port, 5001);
        assert_eq!(settings.model_id, "llama3.2:1b");
        assert!(settings.embedding_url.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("teller.toml");
        fs::write(
            &path,
            "port = 6001\nengine_url = \"http://engine:5005/webhooks/rest/webhook\"\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.port, 6001);
        assert_eq!(
            settings.engine_url,
            "http://engine:5005/webhooks/rest/webhook"
        );
        // Untouched fields keep defaults
        assert_eq!(settings.model_url, "http://localhost:11434");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("teller.toml");
        fs::write(&path, "port = \"not a number").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
