use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// The service's error taxonomy, mapped onto HTTP statuses. Validation
/// failures are the caller's problem; everything else is ours (or the OCR
/// engine's, whose message is surfaced).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("OCR result not found for id {0}")]
    NotFound(i64),
    #[error("Failed to read upload: {0}")]
    Upload(String),
    #[error("OCR pipeline failed: {0}")]
    Pipeline(#[from] docscan_ocr::PipelineError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upload(_) | ApiError::Pipeline(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!("{message}");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("empty file".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound(7).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Upload("connection reset".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_id() {
        assert_eq!(
            ApiError::NotFound(42).to_string(),
            "OCR result not found for id 42"
        );
    }
}
