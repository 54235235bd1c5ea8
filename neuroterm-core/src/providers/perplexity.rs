//! Perplexity search-augmented chat provider
//!
//! Same chat-completions wire shape as OpenAI plus search controls; responses
//! may carry a citation list which is appended to the reply body.

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

/// Perplexity chat provider
pub struct PerplexityChatProvider {
    client: Client,
    api_key: Option<String>,
    model: &'static ModelDescriptor,
}

impl PerplexityChatProvider {
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
                "Perplexity API key not set. Add your API key in the apikeys panel.".to_string(),
            )
        })
    }
}

#[derive(Debug, Serialize)]
struct SonarRequest {
    model: String,
    messages: Vec<Turn>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    return_citations: bool,
    return_images: bool,
    search_domain_filter: Vec<String>,
    search_recency_filter: String,
}

#[derive(Debug, Deserialize)]
struct SonarResponse {
    choices: Vec<SonarChoice>,
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default)]
    usage: Option<SonarUsage>,
}

#[derive(Debug, Deserialize)]
struct SonarChoice {
    message: SonarMessage,
}

#[derive(Debug, Deserialize)]
struct SonarMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SonarUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Citations arrive either as bare URL strings or as objects with a url field
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Citation {
    Url(String),
    Object { url: String },
}

impl Citation {
    fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Object { url } => url,
        }
    }
}

/// First choice's text with the numbered source list appended when citations
/// are present.
fn extract_reply(response: SonarResponse) -> Result<(String, Option<TokenUsage>)> {
    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let mut text = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| Error::Chat("No completion returned".to_string()))?;

    if !response.citations.is_empty() {
        text.push_str("\n\nSources:\n");
        let sources: Vec<String> = response
            .citations
            .iter()
            .enumerate()
            .map(|(i, citation)| format!("[{}] {}", i + 1, citation.url()))
            .collect();
        text.push_str(&sources.join("\n"));
    }

    Ok((text, usage))
}

#[async_trait]
impl ChatProvider for PerplexityChatProvider {
    fn name(&self) -> &'static str {
        "Perplexity"
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        let api_key = self.api_key()?;

        let body = SonarRequest {
            model: self.model.wire_model.to_string(),
            messages: build_messages(self.model, &request),
            max_tokens: effective_max_tokens(self.model, &request),
            temperature: effective_temperature(self.model, &request),
            top_p: self.model.top_p,
            return_citations: true,
            return_images: false,
            search_domain_filter: vec!["perplexity.ai".to_string()],
            search_recency_filter: "month".to_string(),
        };

        debug!(model = self.model.id, "sending chat request to Perplexity");

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
            error!("Perplexity API error: {} - {}", status, error_text);
            return Err(Error::upstream(status.as_u16(), error_text));
        }

        let sonar: SonarResponse = response.json().await?;
        let (text, usage) = extract_reply(sonar)?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_citations_appended_as_numbered_sources() {
        let raw = r#"{
            "choices": [{"message": {"content": "The answer."}}],
            "citations": ["https://a.example/one", {"url": "https://b.example/two"}]
        }"#;
        let response: SonarResponse = serde_json::from_str(raw).unwrap();
        let (text, _) = extract_reply(response).unwrap();
        assert!(text.starts_with("The answer."));
        assert!(text.contains("Sources:"));
        assert!(text.contains("[1] https://a.example/one"));
        assert!(text.contains("[2] https://b.example/two"));
    }

    #[test]
    fn test_no_citations_leaves_reply_untouched() {
        let raw = r#"{"choices": [{"message": {"content": "Plain reply"}}]}"#;
        let response: SonarResponse = serde_json::from_str(raw).unwrap();
        let (text, _) = extract_reply(response).unwrap();
        assert_eq!(text, "Plain reply");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let model = registry::find("perplexity").unwrap();
        let provider = PerplexityChatProvider::new(model, None);
        let err = provider.send(ChatRequest::new("hello")).await.unwrap_err();
        assert!(err.is_configuration());
    }
}
