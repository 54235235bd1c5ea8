//! OpenAI provider implementations for GPT chat and Whisper transcription

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::registry::ModelDescriptor;
use crate::types::Turn;

use super::chat::{
    ChatProvider, ChatReply, ChatRequest, TokenUsage, build_messages, effective_max_tokens,
    effective_temperature,
};
use super::transcription::{
    AudioPayload, TranscriptionProvider, TranscriptionRequest, TranscriptionResponse,
};

const WHISPER_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const WHISPER_MODEL: &str = "whisper-1";

/// OpenAI GPT chat provider
pub struct OpenAiChatProvider {
    client: Client,
    api_key: Option<String>,
    model: &'static ModelDescriptor,
}

impl OpenAiChatProvider {
    pub fn new(model: &'static ModelDescriptor, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::ProviderNotConfigured(
                "OpenAI API key not set. Add your API key in the apikeys panel.".to_string(),
            )
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Turn>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ChatUsage> for TokenUsage {
    fn from(usage: ChatUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// First choice's message text, per the chat-completion response shape.
fn extract_reply(response: ChatCompletionResponse) -> Result<(String, Option<TokenUsage>)> {
    let usage = response.usage.map(TokenUsage::from);
    let text = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| Error::Chat("No completion returned".to_string()))?;
    Ok((text, usage))
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    fn name(&self) -> &'static str {
        "OpenAI GPT"
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        let api_key = self.api_key()?;

        let body = ChatCompletionRequest {
            model: self.model.wire_model.to_string(),
            messages: build_messages(self.model, &request),
            max_tokens: effective_max_tokens(self.model, &request),
            temperature: effective_temperature(self.model, &request),
            top_p: self.model.top_p,
            frequency_penalty: 0.1,
            presence_penalty: 0.1,
            stream: false,
        };

        debug!(model = self.model.id, "sending chat request to OpenAI");

        let response = self
            .client
            .post(self.model.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error: {} - {}", status, error_text);
            return Err(Error::upstream(status.as_u16(), error_text));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let (text, usage) = extract_reply(completion)?;

        Ok(ChatReply {
            text,
            model: self.model.name.to_string(),
            usage,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI Whisper transcription provider
pub struct OpenAiTranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiTranscriptionProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: WHISPER_MODEL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::ProviderNotConfigured(
                "OpenAI API key not set; transcription is unavailable.".to_string(),
            )
        })
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

#[async_trait]
impl TranscriptionProvider for OpenAiTranscriptionProvider {
    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse> {
        let api_key = self.api_key()?;

        if request.audio.is_empty() {
            return Err(Error::BadRequest("empty audio payload".to_string()));
        }

        let (bytes, file_name, mime) = match request.audio {
            // raw PCM is wrapped in a WAV container for the API
            AudioPayload::Pcm { data, sample_rate } => (
                pcm_to_wav(&data, sample_rate, 1),
                "audio.wav".to_string(),
                "audio/wav".to_string(),
            ),
            AudioPayload::Encoded {
                data,
                file_name,
                mime,
            } => (data, file_name, mime),
        };

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|e| Error::Transcription(format!("Failed to create form part: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("temperature", "0.2");

        if let Some(lang) = &request.language {
            form = form.text("language", lang.clone());
        }

        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }

        debug!("sending transcription request to OpenAI Whisper");

        let response = self
            .client
            .post(WHISPER_ENDPOINT)
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Whisper API error: {} - {}", status, error_text);
            return Err(Error::upstream(status.as_u16(), error_text));
        }

        let whisper: WhisperResponse = response.json().await?;

        Ok(TranscriptionResponse {
            text: whisper.text,
            confidence: None, // Whisper doesn't provide confidence
            language: whisper.language,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Convert raw PCM data to WAV format
pub(crate) fn pcm_to_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
    let block_align = channels * bits_per_sample / 8;
    let data_size = pcm.len() as u32;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + pcm.len());

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&file_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(pcm);

    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_pcm_to_wav() {
        // 1 second of silence at 16kHz mono
        let pcm = vec![0u8; 32000]; // 16000 samples * 2 bytes
        let wav = pcm_to_wav(&pcm, 16000, 1);

        // check RIFF header
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        // total size should be 44 header + 32000 data
        assert_eq!(wav.len(), 44 + 32000);
    }

    #[test]
    fn test_extract_reply_first_choice() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let (text, usage) = extract_reply(response).unwrap();
        assert_eq!(text, "first");
        assert_eq!(usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_extract_reply_empty_choices() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(extract_reply(response).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let model = registry::find("gpt-3.5-turbo").unwrap();
        let provider = OpenAiChatProvider::new(model, None);
        assert!(!provider.is_configured());

        let err = provider.send(ChatRequest::new("hello")).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.user_message().contains("API key"));
    }

    #[tokio::test]
    async fn test_transcription_missing_key_fails_before_network() {
        let provider = OpenAiTranscriptionProvider::new(None);
        let err = provider
            .transcribe(TranscriptionRequest::pcm(vec![0u8; 64], 16000))
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
