//! Provider abstraction layer for chat and transcription services
//!
//! One implementation per provider family; the tagged [`ProviderKind`] on the
//! model descriptor selects which wire shape a request is normalized into.

mod anthropic;
mod chat;
mod openai;
mod perplexity;
mod transcription;

pub use anthropic::AnthropicChatProvider;
pub use chat::{
    ChatProvider, ChatReply, ChatRequest, TokenUsage, build_messages, effective_max_tokens,
    effective_temperature, system_prompt, window_history,
};
pub use openai::{OpenAiChatProvider, OpenAiTranscriptionProvider};
pub use perplexity::PerplexityChatProvider;
pub use transcription::{
    ASSUMED_CONFIDENCE, AudioPayload, TranscriptionProvider, TranscriptionRequest,
    TranscriptionResponse,
};

use crate::credentials::CredentialSet;
use crate::registry::{ModelDescriptor, ProviderKind};

/// Build the chat provider for a model, with the credential for its family.
pub fn chat_provider(
    model: &'static ModelDescriptor,
    credentials: &CredentialSet,
) -> Box<dyn ChatProvider> {
    let api_key = credentials
        .for_provider(model.provider)
        .map(|key| key.to_string());
    match model.provider {
        ProviderKind::OpenAi => Box::new(OpenAiChatProvider::new(model, api_key)),
        ProviderKind::Perplexity => Box::new(PerplexityChatProvider::new(model, api_key)),
        ProviderKind::Anthropic => Box::new(AnthropicChatProvider::new(model, api_key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_chat_provider_selected_by_family() {
        let creds = CredentialSet {
            perplexity: Some("pplx-key".into()),
            ..Default::default()
        };

        let provider = chat_provider(registry::find("perplexity").unwrap(), &creds);
        assert_eq!(provider.name(), "Perplexity");
        assert!(provider.is_configured());

        let provider = chat_provider(registry::find("gpt-4").unwrap(), &creds);
        assert_eq!(provider.name(), "OpenAI GPT");
        assert!(!provider.is_configured());

        let provider = chat_provider(registry::find("claude").unwrap(), &creds);
        assert_eq!(provider.name(), "Anthropic Claude");
    }
}
