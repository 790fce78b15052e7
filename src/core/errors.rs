use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced over the HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failures inside the retrieval/generation pipeline.
///
/// Callers can branch on the kind; the router boundary maps all of them to a
/// fixed user-facing fallback so a chat request always gets a reply.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("ingestion failed for {path}: {cause}")]
    Ingestion { path: String, cause: String },
    #[error("document store is empty")]
    EmptyStore,
    #[error("index snapshot unusable: {0}")]
    Snapshot(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("generation failed: {0}")]
    Generation(String),
}

impl RagError {
    pub fn retrieval<E: std::fmt::Display>(err: E) -> Self {
        RagError::Retrieval(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::Generation(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingestion_error_names_the_file() {
        let err = RagError::Ingestion {
            path: "docs/faq.txt".to_string(),
            cause: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ingestion failed for docs/faq.txt: permission denied"
        );
        // Plain data fields; there is no wrapped error to walk.
        assert!(std::error::Error::source(&err).is_none());
    }
}
