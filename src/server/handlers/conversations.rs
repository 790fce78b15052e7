use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub conversation_id: Option<String>,
}

fn require(field: Option<String>, name: &str) -> Result<String, ApiError> {
    field
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {}", name)))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require(params.user_id, "user_id")?;
    let conversation_id = require(params.conversation_id, "conversation_id")?;

    let messages = state.history.get_history(&conversation_id).await?;
    let rows: Vec<Value> = messages
        .into_iter()
        .map(|msg| {
            json!({
                "user_message": msg.user_message,
                "bot_response": msg.bot_response,
                "language": msg.language,
                "audio_file": msg.audio_file,
                "source": msg.source,
                "timestamp": msg.timestamp,
            })
        })
        .collect();

    Ok(Json(json!({ "history": rows })))
}

pub async fn new_conversation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require(payload.user_id, "user_id")?;
    let conversation_id = state.history.create_conversation(&user_id).await?;
    Ok(Json(json!({ "conversation_id": conversation_id })))
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = require(params.user_id, "user_id")?;
    let conversations = state.history.list_conversations(&user_id).await?;
    Ok(Json(json!({ "conversations": conversations })))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation_id = require(payload.conversation_id, "conversation_id")?;
    let deleted = state.history.delete_conversation(&conversation_id).await?;
    Ok(Json(json!({
        "status": "deleted",
        "messages_deleted": deleted,
    })))
}
