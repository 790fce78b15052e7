use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::routing::{InboundMessage, RoutedReply};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub language: Option<String>,
}

impl ChatRequest {
    /// Fields arrive optional so a missing one maps to 400 instead of an
    /// axum deserialization rejection.
    fn validate(self) -> Result<InboundMessage, ApiError> {
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing message".to_string()))?;
        let user_id = self
            .user_id
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing user_id".to_string()))?;
        let conversation_id = self
            .conversation_id
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing conversation_id".to_string()))?;

        Ok(InboundMessage {
            user_id,
            conversation_id,
            text: message,
            language: self.language.unwrap_or_else(|| "en".to_string()),
        })
    }
}

fn reply_body(reply: RoutedReply) -> Json<serde_json::Value> {
    Json(json!({
        "response": reply.text,
        "source": reply.source,
        "language": reply.language,
    }))
}

/// Smart routing between the retrieval pipeline and the engine.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = payload.validate()?;
    let reply = state.router.handle(&msg).await?;
    Ok(reply_body(reply))
}

/// Forces the retrieval path regardless of classification.
pub async fn rag_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = payload.validate()?;
    let reply = state.router.handle_rag(&msg).await?;
    Ok(reply_body(reply))
}

/// Forces the external-engine path regardless of classification.
pub async fn force_engine(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = payload.validate()?;
    let reply = state.router.handle_engine(&msg).await?;
    Ok(reply_body(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> ChatRequest {
        ChatRequest {
            message: Some("What is my balance?".to_string()),
            user_id: Some("u1".to_string()),
            conversation_id: Some("c1".to_string()),
            language: None,
        }
    }

    #[test]
    fn validation_fills_language_default() {
        let msg = full_request().validate().unwrap();
        assert_eq!(msg.language, "en");
        assert_eq!(msg.text, "What is my balance?");
    }

    #[test]
    fn missing_or_blank_fields_are_bad_requests() {
        let mut req = full_request();
        req.message = None;
        assert!(matches!(req.validate(), Err(ApiError::BadRequest(_))));

        let mut req = full_request();
        req.user_id = Some("   ".to_string());
        assert!(matches!(req.validate(), Err(ApiError::BadRequest(_))));

        let mut req = full_request();
        req.conversation_id = None;
        assert!(matches!(req.validate(), Err(ApiError::BadRequest(_))));
    }
}
