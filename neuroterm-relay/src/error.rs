//! Relay error responses
//!
//! Every failure is caught at the handler boundary and rendered as a
//! structured `{ error, debug }` JSON body. Missing credentials on the chat
//! path are the caller's problem (400); upstream and transport failures are
//! ours (500).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use neuroterm::error::Error;

#[derive(Debug)]
pub struct RelayError {
    status: StatusCode,
    error: String,
    detail: String,
}

impl RelayError {
    pub fn new(status: StatusCode, error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            detail: detail.into(),
        }
    }

    pub fn bad_request(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, detail)
    }

    pub fn internal(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, detail)
    }

    /// Transcription has no client-side key fallback, so a missing credential
    /// is a server misconfiguration there, not a 400.
    pub fn from_transcription(err: Error) -> Self {
        if err.is_configuration() {
            Self::internal(
                "OpenAI API key not configured",
                "OPENAI_API_KEY environment variable missing",
            )
        } else {
            err.into()
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for RelayError {
    fn from(err: Error) -> Self {
        let detail = err.to_string();
        match err {
            Error::ProviderNotConfigured(_) | Error::Config(_) => Self::bad_request(
                "API key required. Please add your API key in the settings panel.",
                detail,
            ),
            Error::BadRequest(message) => Self::bad_request(message, detail),
            Error::Upstream { status, body } => Self::internal(
                format!("Failed to get response: API Error: {status} - {body}"),
                detail,
            ),
            _ => Self::internal(format!("Failed to get response: {err}"), detail),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, error = %self.error, "relay request failed");
        let body = json!({
            "error": self.error,
            "debug": {
                "detail": self.detail,
                "timestamp": Utc::now().to_rfc3339(),
            },
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_chat_credential_maps_to_400() {
        let relay_err: RelayError =
            Error::ProviderNotConfigured("OpenAI API key not set".into()).into();
        assert_eq!(relay_err.status(), StatusCode::BAD_REQUEST);
        assert!(relay_err.error.contains("API key"));
    }

    #[test]
    fn test_missing_transcription_credential_maps_to_500() {
        let relay_err = RelayError::from_transcription(Error::ProviderNotConfigured(
            "OpenAI API key not set".into(),
        ));
        assert_eq!(relay_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_maps_to_500_with_status_in_message() {
        let relay_err: RelayError = Error::upstream(429, "rate limited").into();
        assert_eq!(relay_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(relay_err.error.contains("429"));
    }
}
