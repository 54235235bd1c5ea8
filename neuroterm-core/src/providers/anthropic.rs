//! Anthropic Claude chat provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::registry::ModelDescriptor;
use crate::types::{Role, Turn};

use super::chat::{
    ChatProvider, ChatReply, ChatRequest, TokenUsage, effective_max_tokens, effective_temperature,
    system_prompt, window_history,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude chat provider
pub struct AnthropicChatProvider {
    client: Client,
    api_key: Option<String>,
    model: &'static ModelDescriptor,
}

impl AnthropicChatProvider {
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
                "Anthropic API key not set. Add your API key in the apikeys panel.".to_string(),
            )
        })
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Turn>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Messages-API turn list: windowed history plus the user message. The system
/// prompt travels in its own top-level field, so system turns never appear.
fn build_turns(model: &ModelDescriptor, request: &ChatRequest) -> Vec<Turn> {
    let window = window_history(&request.history, model.history_window);
    let mut messages: Vec<Turn> = window
        .iter()
        .filter(|t| t.role != Role::System)
        .cloned()
        .collect();
    messages.push(Turn::new(Role::User, request.message.clone()));
    messages
}

/// First text content block, per the messages-API response shape.
fn extract_reply(response: MessageResponse) -> Result<(String, Option<TokenUsage>)> {
    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.input_tokens + u.output_tokens,
    });

    let text = response
        .content
        .into_iter()
        .find(|block| block.content_type == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| Error::Chat("No text content returned".to_string()))?;

    Ok((text, usage))
}

#[async_trait]
impl ChatProvider for AnthropicChatProvider {
    fn name(&self) -> &'static str {
        "Anthropic Claude"
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        let api_key = self.api_key()?;

        let body = MessageRequest {
            model: self.model.wire_model.to_string(),
            max_tokens: effective_max_tokens(self.model, &request),
            system: system_prompt(self.model, &request).to_string(),
            messages: build_turns(self.model, &request),
            temperature: effective_temperature(self.model, &request),
            top_p: self.model.top_p,
        };

        debug!(model = self.model.id, "sending chat request to Anthropic");

        let response = self
            .client
            .post(self.model.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Anthropic API error: {} - {}", status, error_text);
            return Err(Error::upstream(status.as_u16(), error_text));
        }

        let message: MessageResponse = response.json().await?;
        let (text, usage) = extract_reply(message)?;

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
