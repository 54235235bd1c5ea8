//! Static catalog of supported AI models
//!
//! Pure data, loaded once. Call sites that receive an unknown model id fall
//! back to [`DEFAULT_MODEL_ID`] instead of surfacing a hard error.

use serde::Serialize;

/// Provider family a model belongs to. The family decides the wire shape the
/// normalizer speaks and which credential slot applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Perplexity,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: &'static [ProviderKind] = &[
        ProviderKind::OpenAi,
        ProviderKind::Perplexity,
        ProviderKind::Anthropic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Perplexity => "Perplexity",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding the server-side fallback credential
    pub fn env_key(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Perplexity => "PERPLEXITY_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Immutable description of one selectable model
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: ProviderKind,
    pub endpoint: &'static str,
    /// Model string sent on the wire (differs from the terminal-facing id)
    pub wire_model: &'static str,
    pub max_tokens: u32,
    /// Minimum token budget sent regardless of the user's setting
    pub token_floor: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Most recent turns included per request
    pub history_window: usize,
    pub description: &'static str,
    /// Family persona prepended as the single system turn
    pub system_prompt: &'static str,
}

/// Model used whenever an unknown id is requested
pub const DEFAULT_MODEL_ID: &str = "gpt-3.5-turbo";

const GPT35_PROMPT: &str = "You are ChatGPT, a helpful AI assistant created by OpenAI. \
     Be conversational and engaging while staying professional, provide concrete examples, \
     explain your reasoning, and build on the conversation naturally.";

const GPT4_PROMPT: &str = "You are GPT-4, an advanced AI assistant with strong reasoning \
     across technical, creative, and analytical domains. Give thorough, well-reasoned \
     answers, break complex topics into clear components, and offer multiple perspectives \
     when they matter.";

const PERPLEXITY_PROMPT: &str = "You are Perplexity, a research-focused AI assistant with \
     live web search. Be thorough and evidence-based, cite sources for factual claims, and \
     explain not just what is true but why it is true.";

const CLAUDE_PROMPT: &str = "You are Claude, an AI assistant made by Anthropic. Be direct, \
     thoughtful, and genuinely useful; admit uncertainty rather than guessing.";

const MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        provider: ProviderKind::OpenAi,
        endpoint: "https://api.openai.com/v1/chat/completions",
        wire_model: "gpt-3.5-turbo-1106",
        max_tokens: 2000,
        token_floor: 1000,
        temperature: 0.9,
        top_p: 0.95,
        history_window: 20,
        description: "Fast general-purpose chat model",
        system_prompt: GPT35_PROMPT,
    },
    ModelDescriptor {
        id: "gpt-4",
        name: "GPT-4",
        provider: ProviderKind::OpenAi,
        endpoint: "https://api.openai.com/v1/chat/completions",
        wire_model: "gpt-4-1106-preview",
        max_tokens: 4000,
        token_floor: 2000,
        temperature: 0.8,
        top_p: 0.95,
        history_window: 20,
        description: "Deep reasoning and complex analysis",
        system_prompt: GPT4_PROMPT,
    },
    ModelDescriptor {
        id: "perplexity",
        name: "Perplexity Sonar",
        provider: ProviderKind::Perplexity,
        endpoint: "https://api.perplexity.ai/chat/completions",
        wire_model: "llama-3.1-sonar-large-128k-online",
        max_tokens: 3000,
        token_floor: 2000,
        temperature: 0.3,
        top_p: 0.9,
        history_window: 15,
        description: "Search-augmented answers with citations",
        system_prompt: PERPLEXITY_PROMPT,
    },
    ModelDescriptor {
        id: "claude",
        name: "Claude Sonnet",
        provider: ProviderKind::Anthropic,
        endpoint: "https://api.anthropic.com/v1/messages",
        wire_model: "claude-sonnet-4-20250514",
        max_tokens: 4096,
        token_floor: 1024,
        temperature: 0.7,
        top_p: 0.9,
        history_window: 20,
        description: "Balanced reasoning via the Anthropic messages API",
        system_prompt: CLAUDE_PROMPT,
    },
];

/// All registered models
pub fn all() -> &'static [ModelDescriptor] {
    MODELS
}

/// Look up a model by id
pub fn find(id: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.id == id)
}

/// Look up a model, falling back to the default descriptor on unknown ids
pub fn find_or_default(id: &str) -> &'static ModelDescriptor {
    find(id).unwrap_or_else(|| {
        tracing::debug!(requested = id, fallback = DEFAULT_MODEL_ID, "unknown model id");
        find(DEFAULT_MODEL_ID).expect("default model is registered")
    })
}
