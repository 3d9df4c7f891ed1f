use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Transport, HTTP or decoding failure talking to the sensor data service.
    /// The message is shown to the operator as-is.
    #[error("{0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid upload form. The message is shown to the operator as-is.
    #[error("{0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Network(msg) => {
                tracing::warn!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            Self::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;


#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: AppError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn errors_map_to_http_status() {
        assert_eq!(status_of(AppError::Network("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(AppError::Validation("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AppError::BadRequest("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::Storage("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn operator_messages_are_shown_verbatim() {
        assert_eq!(
            AppError::Network("Database unavailable".into()).to_string(),
            "Database unavailable"
        );
        assert_eq!(
            AppError::Validation("Only CSV files are allowed".into()).to_string(),
            "Only CSV files are allowed"
        );
    }
}
