use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, conversations, status};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/rag_chat", post(chat::rag_chat))
        .route("/force_engine", post(chat::force_engine))
        .route("/history", get(conversations::get_history))
        .route("/new_conversation", post(conversations::new_conversation))
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversation", delete(conversations::delete_conversation))
        .route("/rag_status", get(status::rag_status))
        .route("/reindex", post(status::reindex))
        .route("/health", get(status::health))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
