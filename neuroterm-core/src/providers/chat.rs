//! Chat provider trait and shared normalization rules

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::ModelDescriptor;
use crate::types::{Role, Turn};

/// Provider-agnostic request for one chat completion
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The new user message
    pub message: String,
    /// Prior conversation, oldest first
    pub history: Vec<Turn>,
    /// User-requested token budget; the model floor still applies
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Overrides the model family persona when non-empty
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            max_tokens: None,
            temperature: None,
            system_prompt: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Normalized reply from any provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Reply text, with any citation list already appended
    pub text: String,
    /// Display name of the model that answered
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for chat providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Send one chat request and return the normalized reply
    async fn send(&self, request: ChatRequest) -> Result<ChatReply>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}

/// Keep only the most recent `window` turns, in original order. Older turns
/// are dropped silently as a token-budget trade-off.
pub fn window_history(history: &[Turn], window: usize) -> &[Turn] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}

/// The single system prompt for a request: the user's settings override when
/// non-empty, the model family persona otherwise.
pub fn system_prompt<'a>(model: &'a ModelDescriptor, request: &'a ChatRequest) -> &'a str {
    match request.system_prompt.as_deref() {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => model.system_prompt,
    }
}

/// Token budget actually sent: the request's (or the model default), raised
/// to the model floor so replies are never truncated below it.
pub fn effective_max_tokens(model: &ModelDescriptor, request: &ChatRequest) -> u32 {
    request.max_tokens.unwrap_or(model.max_tokens).max(model.token_floor)
}

pub fn effective_temperature(model: &ModelDescriptor, request: &ChatRequest) -> f32 {
    request.temperature.unwrap_or(model.temperature)
}

/// Assemble the chat-completions message list: one system turn, the windowed
/// history, then the new user message.
pub fn build_messages(model: &ModelDescriptor, request: &ChatRequest) -> Vec<Turn> {
    let window = window_history(&request.history, model.history_window);
    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(Turn::new(Role::System, system_prompt(model, request)));
    messages.extend_from_slice(window);
    messages.push(Turn::new(Role::User, request.message.clone()));
    messages
}
