//! Relay endpoints
//!
//! Two stateless handlers: chat relay and transcription relay. Credentials
//! resolve server-side first with the client-supplied key as fallback; the
//! normalizer in neuroterm-core does the provider-specific shaping.

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use neuroterm::credentials::CredentialSet;
use neuroterm::providers::{
    ASSUMED_CONFIDENCE, ChatRequest, OpenAiTranscriptionProvider, TranscriptionProvider,
    TranscriptionRequest, chat_provider,
};
use neuroterm::registry;
use neuroterm::types::Turn;

use crate::error::RelayError;

/// Server-held configuration shared by all requests
#[derive(Clone, Default)]
pub struct AppState {
    pub credentials: CredentialSet,
}

impl AppState {
    pub fn from_env() -> Self {
        Self {
            credentials: CredentialSet::from_env(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/transcribe", post(transcribe))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRelayRequest {
    pub message: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub settings: RelaySettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub openai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatRelayResponse {
    pub reply: String,
    pub debug: DebugInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub model: String,
    pub message_length: usize,
    pub reply_length: usize,
    pub timestamp: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRelayRequest>,
) -> Result<Json<ChatRelayResponse>, RelayError> {
    let model = registry::find_or_default(&request.model);
    debug!(model = model.id, message_len = request.message.len(), "chat relay request");

    let client_keys = CredentialSet {
        openai: request.settings.openai_api_key.clone(),
        perplexity: request.settings.perplexity_api_key.clone(),
        anthropic: request.settings.anthropic_api_key.clone(),
    };
    let credentials = state.credentials.with_fallback(&client_keys);

    let mut chat_request = ChatRequest::new(request.message.clone()).with_history(request.history);
    if let Some(max_tokens) = request.settings.max_tokens {
        chat_request = chat_request.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = request.settings.temperature {
        chat_request = chat_request.with_temperature(temperature);
    }
    if let Some(prompt) = request.settings.system_prompt {
        chat_request = chat_request.with_system_prompt(prompt);
    }

    let provider = chat_provider(model, &credentials);
    let reply = provider.send(chat_request).await?;

    info!(model = model.id, reply_len = reply.text.len(), "chat relay completed");
    Ok(Json(ChatRelayResponse {
        debug: DebugInfo {
            model: model.id.to_string(),
            message_length: request.message.len(),
            reply_length: reply.text.len(),
            timestamp: Utc::now().to_rfc3339(),
        },
        reply: reply.text,
    }))
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub confidence: f32,
    pub debug: TranscribeDebugInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeDebugInfo {
    pub audio_size: usize,
    pub transcription_length: usize,
    pub timestamp: String,
}

async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, RelayError> {
    let mut audio: Option<(Vec<u8>, String, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::bad_request("Invalid multipart body", e.to_string()))?
    {
        if field.name() == Some("audio") {
            let file_name = field.file_name().unwrap_or("audio.webm").to_string();
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| RelayError::bad_request("Failed to read audio field", e.to_string()))?
                .to_vec();
            audio = Some((data, file_name, mime));
        }
    }

    // reject before any network call
    let (data, file_name, mime) = audio.ok_or_else(|| {
        RelayError::bad_request(
            "No audio file provided",
            "multipart form did not contain an audio field",
        )
    })?;

    let audio_size = data.len();
    debug!(audio_size, file_name = %file_name, "transcription relay request");

    let provider = OpenAiTranscriptionProvider::new(state.credentials.openai.clone());
    let request = TranscriptionRequest::encoded(data, file_name, mime).with_language("en");
    let response = provider
        .transcribe(request)
        .await
        .map_err(RelayError::from_transcription)?;

    info!(transcript_len = response.text.len(), "transcription relay completed");
    Ok(Json(TranscribeResponse {
        confidence: response.confidence.unwrap_or(ASSUMED_CONFIDENCE),
        debug: TranscribeDebugInfo {
            audio_size,
            transcription_length: response.text.len(),
            timestamp: Utc::now().to_rfc3339(),
        },
        text: response.text,
    }))
}
