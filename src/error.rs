use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StylistError>;

#[derive(Debug, Error)]
pub enum StylistError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StylistError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Classify a failed outbound request, keeping client timeouts distinct.
    pub fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout.as_secs())
        } else {
            Self::Http(err)
        }
    }
}

/// Errors surfaced over HTTP. Details stay in the server log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Internal Styling Error")]
    Styling,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Styling => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
