// src/errors.rs
use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("award search returned status {0}")]
    ApiStatus(reqwest::StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("monitor not found: {0}")]
    MonitorNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl EngineError {
    /// HTTP status the management surface reports for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::MonitorNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
