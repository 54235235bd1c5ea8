//! Core types used throughout Neuroterm

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry;

/// Unique identifier for terminal messages
pub type MessageId = Uuid;

/// Audio data as raw bytes (16-bit PCM)
pub type AudioData = Vec<u8>;

/// Kind of a terminal history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    System,
    Ai,
    Error,
    Success,
    Voice,
}

/// Optional metadata attached to a terminal message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Display name of the model that produced the reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Speech recognition confidence (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Total tokens reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

/// A single terminal history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl TerminalMessage {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Ai, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, content)
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Success, content)
    }

    pub fn voice(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Voice, content)
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Role of a conversation turn on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of conversation in provider wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Map terminal history to wire turns. Only user and AI entries carry
/// conversational content; system, error, success, and voice entries are
/// terminal-local.
pub fn conversation_turns(history: &[TerminalMessage]) -> Vec<Turn> {
    history
        .iter()
        .filter_map(|entry| match entry.kind {
            MessageKind::User => Some(Turn::new(Role::User, entry.content.clone())),
            MessageKind::Ai => Some(Turn::new(Role::Assistant, entry.content.clone())),
            _ => None,
        })
        .collect()
}

/// User-tunable generation settings (the terminal's "MCP" panel). Changes
/// apply to the next outgoing request only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub selected_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            selected_model: registry::DEFAULT_MODEL_ID.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: String::new(),
        }
    }
}

impl GenerationSettings {
    /// Clamp tunables into their documented ranges.
    pub fn normalized(mut self) -> Self {
        self.temperature = self.temperature.clamp(0.0, 1.0);
        self.max_tokens = self.max_tokens.max(1);
        self
    }
}
