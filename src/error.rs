//! Error types for the adapters around the engine
//!
//! The engine itself never fails; these cover config files, replay logs
//! and the HTTP surface.

use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Replay line parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: missing t=<ms>")]
    MissingTime { line: usize },

    #[error("line {line}: bad value for {key}: {value:?}")]
    BadValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("line {line}: unknown field {key:?}")]
    UnknownField { line: usize, key: String },

    #[error("line {line}: unrecognised token {token:?}")]
    BadToken { line: usize, token: String },
}

/// API errors, rendered as JSON bodies
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("sensor not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ApiError::Config(_) => axum::http::StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
