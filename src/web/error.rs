use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ReferenceNotFound(String),
    #[error("{0}")]
    MissingParameter(String),
    #[error("{0}")]
    InvalidParameter(String),
    #[error("invalid id {0}")]
    InvalidId(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("malformed request body: {0}")]
    Decode(String),
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Every failure surfaces the same way: a 400 with a JSON envelope.
        // Callers distinguish errors by message, not by status code.
        let error_message = self.to_string();
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": error_message })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}
