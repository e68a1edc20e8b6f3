//! Mapping of analysis failures onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use depscan_analyzer::AnalyzerError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Analyzer(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Analyzer(AnalyzerError::ShutDown) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscan_git::GitError;

    #[test]
    fn test_status_mapping() {
        let missing = ApiError::Analyzer(AnalyzerError::Git(GitError::InvalidName("..".into())));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let down = ApiError::Analyzer(AnalyzerError::ShutDown);
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let lost = ApiError::Analyzer(AnalyzerError::SnapshotMissing { key: "a_b".into() });
        assert_eq!(lost.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
