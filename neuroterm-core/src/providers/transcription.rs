//! Transcription provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::AudioData;

/// Confidence assigned to transcripts from providers that do not report one
pub const ASSUMED_CONFIDENCE: f32 = 0.95;

/// Audio handed to a transcription provider
#[derive(Debug, Clone)]
pub enum AudioPayload {
    /// Raw 16-bit PCM from a local recorder; packaged as WAV before upload
    Pcm { data: AudioData, sample_rate: u32 },
    /// An already-encoded audio file (e.g. a browser upload), forwarded as-is
    Encoded {
        data: Vec<u8>,
        file_name: String,
        mime: String,
    },
}

impl AudioPayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Pcm { data, .. } => data.len(),
            Self::Encoded { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Request for transcription
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: AudioPayload,
    /// Optional language hint (ISO 639-1 code, e.g., "en")
    pub language: Option<String>,
    /// Optional prompt to guide transcription
    pub prompt: Option<String>,
}

impl TranscriptionRequest {
    pub fn pcm(data: AudioData, sample_rate: u32) -> Self {
        Self {
            audio: AudioPayload::Pcm { data, sample_rate },
            language: None,
            prompt: None,
        }
    }

    pub fn encoded(data: Vec<u8>, file_name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            audio: AudioPayload::Encoded {
                data,
                file_name: file_name.into(),
                mime: mime.into(),
            },
            language: None,
            prompt: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Response from transcription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Transcribed text
    pub text: String,
    /// Confidence score (0.0 - 1.0) if the provider reports one
    pub confidence: Option<f32>,
    /// Detected language if available
    pub language: Option<String>,
}

/// Trait for transcription providers
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Transcribe audio to text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
