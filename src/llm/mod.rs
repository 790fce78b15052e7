//! Generative model runtime client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::RagError;

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run a completion for `prompt` against `model_id` and return the text.
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<String, RagError>;
}

/// Local model runtime speaking the Ollama `/api/generate` format.
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl GenerativeModel for OllamaProvider {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": model_id,
            "prompt": prompt,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::generation)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "model runtime returned {}: {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(RagError::generation)?;
        let response = payload["response"]
            .as_str()
            .ok_or_else(|| RagError::Generation("missing response field".to_string()))?;

        Ok(response.trim().to_string())
    }
}
