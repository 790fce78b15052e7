use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::{ApiError, RagError};
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn rag_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let index_ready = state.rag.is_ready().await;
    Json(json!({
        "status": if index_ready { "ready" } else { "not_ready" },
        "documents_loaded": state.rag.document_count().await,
        "index_ready": index_ready,
    }))
}

/// Rebuilds the store and index wholesale from the document directory. An
/// empty document directory is a client-visible condition, not a server fault.
pub async fn reindex(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Reindex requested");

    match state.rag.reindex(&state.paths.docs_dir).await {
        Ok(indexed) => Ok(Json(json!({
            "status": "reindexed",
            "documents_indexed": indexed,
        }))),
        Err(RagError::EmptyStore) => Err(ApiError::BadRequest(
            "No documents available to index".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}
