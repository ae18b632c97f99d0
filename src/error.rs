use std::io;
use thiserror::Error;
use serde::{Serialize, Deserialize};

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectuiError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Push transport error: {0}")]
    Transport(String),

    #[error("Locale error: {0}")]
    Locale(String),

    #[error("Invalid post: {0}")]
    InvalidPost(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Anyhow error: {0}")]
    Anyhow(String),
}

impl ConnectuiError {
    /// True when the backend rejected the request because the session is
    /// missing or expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConnectuiError::Api { status: 401, .. } | ConnectuiError::NotAuthenticated)
    }
}

impl From<serde_json::Error> for ConnectuiError {
    fn from(err: serde_json::Error) -> Self {
        ConnectuiError::Json(err.to_string())
    }
}

impl From<io::Error> for ConnectuiError {
    fn from(err: io::Error) -> Self {
        ConnectuiError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for ConnectuiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ConnectuiError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ConnectuiError::Network(err.to_string()),
        }
    }
}

impl From<rust_socketio::Error> for ConnectuiError {
    fn from(err: rust_socketio::Error) -> Self {
        ConnectuiError::Transport(err.to_string())
    }
}

impl From<anyhow::Error> for ConnectuiError {
    fn from(err: anyhow::Error) -> Self {
        ConnectuiError::Anyhow(err.to_string())
    }
}
