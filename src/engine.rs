//! External conversational engine client.
//!
//! The engine answers general (non-banking) chat over a synchronous webhook.
//! A reply is an ordered sequence of parts, each optionally carrying text;
//! parts are concatenated with blank-line separators.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;

pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I couldn't process your request.";

/// One element of the engine's reply array.
#[derive(Debug, Clone, Deserialize)]
pub struct EnginePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// Seam for the general-conversation backend so the router can be exercised
/// without a live engine.
#[async_trait]
pub trait GeneralEngine: Send + Sync {
    /// Forwards a message verbatim; the language tag rides in the metadata
    /// map so the engine can localize its reply.
    async fn send(
        &self,
        sender: &str,
        message: &str,
        language: &str,
    ) -> Result<Vec<EnginePart>, ApiError>;
}

#[derive(Clone)]
pub struct EngineClient {
    webhook_url: String,
    client: Client,
}

impl EngineClient {
    pub fn new(webhook_url: String, client: Client) -> Self {
        Self {
            webhook_url,
            client,
        }
    }
}

#[async_trait]
impl GeneralEngine for EngineClient {
    async fn send(
        &self,
        sender: &str,
        message: &str,
        language: &str,
    ) -> Result<Vec<EnginePart>, ApiError> {
        let body = json!({
            "sender": sender,
            "message": message,
            "metadata": { "language": language },
        });

        let res = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("Error communicating with engine: {}", e)))?;

        if !res.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Error communicating with engine: {}",
                res.status()
            )));
        }

        res.json().await.map_err(ApiError::internal)
    }
}

/// Joins the text-bearing parts in order; an empty or text-free reply
/// degrades to the fixed fallback sentence.
pub fn combine_parts(parts: &[EnginePart]) -> String {
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();

    if texts.is_empty() {
        EMPTY_REPLY_FALLBACK.to_string()
    } else {
        texts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(text: Option<&str>) -> EnginePart {
        EnginePart {
            text: text.map(|t| t.to_string()),
        }
    }

    #[test]
    fn parts_join_in_order_with_blank_lines() {
        let parts = vec![part(Some("Hello!")), part(None), part(Some("How can I help?"))];
        assert_eq!(combine_parts(&parts), "Hello!\n\nHow can I help?");
    }

    #[test]
    fn empty_reply_falls_back() {
        assert_eq!(combine_parts(&[]), EMPTY_REPLY_FALLBACK);
        assert_eq!(combine_parts(&[part(None)]), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn parts_deserialize_with_and_without_text() {
        let raw = r#"[{"text":"Hi"},{"image":"cat.png"}]"#;
        let parts: Vec<EnginePart> = serde_json::from_str(raw).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("Hi"));
        assert!(parts[1].text.is_none());
    }
}
