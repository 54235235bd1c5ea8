//! Error types for Neuroterm

use thiserror::Error;

/// Result type alias using Neuroterm's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Longest upstream error body kept for diagnostics
const MAX_UPSTREAM_BODY: usize = 500;

/// All possible errors in Neuroterm
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Chat failed: {0}")]
    Chat(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an upstream error, keeping at most [`MAX_UPSTREAM_BODY`] bytes of
    /// the raw provider body.
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_UPSTREAM_BODY {
            let mut end = MAX_UPSTREAM_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
            body.push('…');
        }
        Self::Upstream { status, body }
    }

    /// True for failures the user can fix in the settings panel (missing or
    /// invalid credentials).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ProviderNotConfigured(_) | Self::Config(_))
    }

    /// Human-readable text for terminal error entries.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderNotConfigured(msg) | Self::Config(msg) => msg.clone(),
            Self::Upstream { status, body } => {
                format!("Provider returned {status}: {body}")
            }
            Self::Network(err) => {
                format!("Network failure reaching provider: {err}. Check your connection and retry.")
            }
            other => other.to_string(),
        }
    }
}
