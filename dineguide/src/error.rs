use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::v1::response::ApiResponse;

#[derive(Error, Debug)]
pub enum DineError {
    #[error("Storage error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },
}

impl DineError {
    /// Dependency failures are reported to callers as a generic server error.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            DineError::Database(_)
                | DineError::Retrieval(_)
                | DineError::Generation(_)
                | DineError::Embedding(_)
                | DineError::Http(_)
                | DineError::Io(_)
                | DineError::ApiAuth(_)
                | DineError::Internal(_)
                | DineError::Llm(_)
        )
    }
}

impl IntoResponse for DineError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn dependency_failures_are_classified() {
        assert!(DineError::Retrieval("index down".into()).is_dependency_failure());
        assert!(DineError::Generation("bad json".into()).is_dependency_failure());
        assert!(!DineError::NotFound("session".into()).is_dependency_failure());
        assert!(!DineError::Validation("missing".into()).is_dependency_failure());
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let response = DineError::Generation("raw model output".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = DineError::NotFound("gone".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
