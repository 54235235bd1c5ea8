//! Terminal command dispatcher
//!
//! Classifies submitted input as a built-in command or a chat message. One
//! boolean guard (`processing`) keeps at most one chat request in flight per
//! terminal session; submissions while busy are rejected, not queued.
//! Built-ins run synchronously against local state and never touch the
//! network.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialSet, redact};
use crate::error::{Error, Result};
use crate::providers::{ChatProvider, ChatReply, ChatRequest, chat_provider};
use crate::registry::{self, ModelDescriptor, ProviderKind};
use crate::types::{
    GenerationSettings, MessageMetadata, TerminalMessage, Turn, conversation_turns,
};

/// Built-in commands, matched case-insensitively against trimmed input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Clear,
    Settings,
    ApiKeys,
    Mcp,
    Voice,
    Models,
    Scan,
}

impl Command {
    pub const ALL: &'static [Command] = &[
        Command::Help,
        Command::Status,
        Command::Clear,
        Command::Settings,
        Command::ApiKeys,
        Command::Mcp,
        Command::Voice,
        Command::Models,
        Command::Scan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Status => "status",
            Self::Clear => "clear",
            Self::Settings => "settings",
            Self::ApiKeys => "apikeys",
            Self::Mcp => "mcp",
            Self::Voice => "voice",
            Self::Models => "models",
            Self::Scan => "scan",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Self::Help => "show this list",
            Self::Status => "session status and provider readiness",
            Self::Clear => "wipe the terminal history",
            Self::Settings => "toggle the settings panel",
            Self::ApiKeys => "toggle the API key panel",
            Self::Mcp => "toggle the model control panel",
            Self::Voice => "toggle voice capture",
            Self::Models => "list available models",
            Self::Scan => "probe configured providers",
        }
    }

    /// Exact, case-insensitive match; anything else is a chat message.
    pub fn parse(input: &str) -> Option<Command> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| input.eq_ignore_ascii_case(cmd.name()))
    }
}

/// UI panel toggle flags flipped by built-in commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelState {
    pub settings: bool,
    pub apikeys: bool,
    pub mcp: bool,
    pub voice: bool,
}

/// Outcome of one submission
#[derive(Debug)]
pub enum Dispatch {
    /// Empty after trim; nothing happened
    Ignored,
    /// A request is already in flight; nothing happened
    Rejected,
    /// Built-in executed synchronously
    Command(Command),
    /// User turn appended, request pending; drive it with `resolve_chat`
    Chat(ChatTicket),
}

/// Handle for an accepted chat submission. Only `submit` creates one, so a
/// pending request always corresponds to exactly one optimistic user entry.
/// The context is snapshotted at submit time: settings edits made while the
/// request is in flight do not touch it.
#[derive(Debug)]
pub struct ChatTicket {
    context: ChatContext,
}

impl ChatTicket {
    pub fn message(&self) -> &str {
        &self.context.message
    }
}

/// Everything a backend needs for one chat call; passed explicitly so no
/// backend depends on ambient state.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub message: String,
    pub model: &'static ModelDescriptor,
    pub history: Vec<Turn>,
    pub settings: GenerationSettings,
    pub credentials: CredentialSet,
}

/// Where chat messages go: straight to a provider, or through the relay
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, context: ChatContext) -> Result<ChatReply>;
}

/// Calls the provider normalizer in-process with client-held keys
pub struct DirectBackend;

#[async_trait]
impl ChatBackend for DirectBackend {
    async fn send(&self, context: ChatContext) -> Result<ChatReply> {
        let provider: Box<dyn ChatProvider> = chat_provider(context.model, &context.credentials);
        let mut request = ChatRequest::new(context.message)
            .with_history(context.history)
            .with_max_tokens(context.settings.max_tokens)
            .with_temperature(context.settings.temperature);
        if !context.settings.system_prompt.trim().is_empty() {
            request = request.with_system_prompt(context.settings.system_prompt);
        }
        provider.send(request).await
    }
}

#[derive(Debug, Serialize)]
struct RelayChatRequest {
    message: String,
    model: String,
    history: Vec<Turn>,
    settings: RelayChatSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayChatSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    perplexity_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anthropic_api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayChatOk {
    reply: String,
}

#[derive(Debug, Deserialize)]
struct RelayChatErr {
    #[serde(default)]
    error: String,
}

/// Posts chat requests to the relay, which injects server-held keys
pub struct RelayBackend {
    client: Client,
    endpoint: String,
}

impl RelayBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for RelayBackend {
    async fn send(&self, context: ChatContext) -> Result<ChatReply> {
        let settings = &context.settings;
        let body = RelayChatRequest {
            message: context.message,
            model: context.model.id.to_string(),
            history: context.history,
            settings: RelayChatSettings {
                openai_api_key: context.credentials.openai.clone(),
                perplexity_api_key: context.credentials.perplexity.clone(),
                anthropic_api_key: context.credentials.anthropic.clone(),
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
                system_prompt: (!settings.system_prompt.trim().is_empty())
                    .then(|| settings.system_prompt.clone()),
            },
        };

        debug!(endpoint = %self.endpoint, model = context.model.id, "posting chat to relay");
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RelayChatErr>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return if status.as_u16() == 400 {
                Err(Error::ProviderNotConfigured(message))
            } else {
                Err(Error::upstream(status.as_u16(), message))
            };
        }

        let ok: RelayChatOk = response.json().await?;
        Ok(ChatReply {
            text: ok.reply,
            model: context.model.name.to_string(),
            usage: None,
        })
    }
}

/// One terminal session: history, tunables, panel flags, and the processing
/// guard.
pub struct Terminal {
    settings: GenerationSettings,
    credentials: CredentialSet,
    backend: Arc<dyn ChatBackend>,
    history: Vec<TerminalMessage>,
    panels: PanelState,
    pending_input: String,
    processing: bool,
}

impl Terminal {
    pub fn new(
        settings: GenerationSettings,
        credentials: CredentialSet,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            settings: settings.normalized(),
            credentials,
            backend,
            history: Vec::new(),
            panels: PanelState::default(),
            pending_input: String::new(),
            processing: false,
        }
    }

    pub fn history(&self) -> &[TerminalMessage] {
        &self.history
    }

    pub fn processing(&self) -> bool {
        self.processing
    }

    pub fn panels(&self) -> PanelState {
        self.panels
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Replace the tunables; takes effect from the next submission.
    pub fn set_settings(&mut self, settings: GenerationSettings) {
        self.settings = settings.normalized();
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn set_credentials(&mut self, credentials: CredentialSet) {
        self.credentials = credentials;
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, input: impl Into<String>) {
        self.pending_input = input.into();
    }

    pub fn take_pending_input(&mut self) -> String {
        std::mem::take(&mut self.pending_input)
    }

    /// Record a finished voice transcript: it lands in the pending input and
    /// as a voice history entry, but is never auto-submitted.
    pub fn accept_transcript(&mut self, text: impl Into<String>, confidence: f32) {
        let text = text.into();
        self.history.push(
            TerminalMessage::voice(text.clone()).with_metadata(MessageMetadata {
                confidence: Some(confidence),
                ..Default::default()
            }),
        );
        self.pending_input = text;
    }

    /// Classify and act on one line of input.
    pub fn submit(&mut self, input: &str) -> Dispatch {
        if self.processing {
            debug!("submission rejected: request in flight");
            return Dispatch::Rejected;
        }

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Dispatch::Ignored;
        }

        if let Some(command) = Command::parse(trimmed) {
            self.run_command(command);
            return Dispatch::Command(command);
        }

        // anything that is not a command is chat; snapshot the context before
        // the optimistic user entry joins the history
        let context = ChatContext {
            message: trimmed.to_string(),
            model: registry::find_or_default(&self.settings.selected_model),
            history: conversation_turns(&self.history),
            settings: self.settings.clone(),
            credentials: self.credentials.clone(),
        };
        self.history.push(TerminalMessage::user(trimmed));
        self.processing = true;
        Dispatch::Chat(ChatTicket { context })
    }

    /// Drive an accepted chat submission to completion. Appends exactly one
    /// AI entry on success or one error entry on failure; the optimistic user
    /// entry stays either way.
    pub async fn resolve_chat(&mut self, ticket: ChatTicket) -> TerminalMessage {
        let context = ticket.context;
        let model = context.model;

        let result = self.backend.send(context).await;
        self.processing = false;

        let entry = match result {
            Ok(reply) => {
                info!(model = model.id, "chat reply received");
                let tokens = reply.usage.as_ref().map(|u| u.total_tokens);
                TerminalMessage::ai(reply.text).with_metadata(MessageMetadata {
                    model: Some(reply.model),
                    confidence: None,
                    tokens,
                })
            }
            Err(err) => {
                warn!(model = model.id, "chat failed: {err}");
                TerminalMessage::error(err.user_message())
            }
        };

        self.history.push(entry.clone());
        entry
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Help => {
                let mut lines = vec!["Available commands:".to_string()];
                for cmd in Command::ALL {
                    lines.push(format!("  {:<9} {}", cmd.name(), cmd.summary()));
                }
                self.history.push(TerminalMessage::system(lines.join("\n")));
            }
            Command::Status => {
                let text = self.status_text();
                self.history.push(TerminalMessage::system(text));
            }
            Command::Clear => {
                self.history.clear();
            }
            Command::Settings => {
                self.panels.settings = !self.panels.settings;
                self.push_toggle_note("settings panel", self.panels.settings);
            }
            Command::ApiKeys => {
                self.panels.apikeys = !self.panels.apikeys;
                self.push_toggle_note("API key panel", self.panels.apikeys);
            }
            Command::Mcp => {
                self.panels.mcp = !self.panels.mcp;
                self.push_toggle_note("model control panel", self.panels.mcp);
            }
            Command::Voice => {
                self.panels.voice = !self.panels.voice;
                self.push_toggle_note("voice capture", self.panels.voice);
            }
            Command::Models => {
                let mut lines = vec!["Available models:".to_string()];
                for model in registry::all() {
                    lines.push(format!(
                        "  {:<14} {:<16} {:<11} {}",
                        model.id,
                        model.name,
                        model.provider.label(),
                        model.description
                    ));
                }
                self.history.push(TerminalMessage::system(lines.join("\n")));
            }
            Command::Scan => {
                let text = self.scan_text();
                self.history.push(TerminalMessage::success(text));
            }
        }
    }

    fn push_toggle_note(&mut self, what: &str, on: bool) {
        let state = if on { "opened" } else { "closed" };
        self.history
            .push(TerminalMessage::system(format!("{what} {state}")));
    }

    fn key_display(&self, kind: ProviderKind) -> String {
        self.credentials
            .for_provider(kind)
            .map(redact)
            .unwrap_or_else(|| "not set".to_string())
    }

    fn status_text(&self) -> String {
        let model = registry::find_or_default(&self.settings.selected_model);
        format!(
            "model: {} ({})\n\
             temperature: {:.2}  max tokens: {}\n\
             keys: openai {} | perplexity {} | anthropic {}\n\
             history: {} entries  processing: {}",
            model.name,
            model.id,
            self.settings.temperature,
            self.settings.max_tokens,
            self.key_display(ProviderKind::OpenAi),
            self.key_display(ProviderKind::Perplexity),
            self.key_display(ProviderKind::Anthropic),
            self.history.len(),
            if self.processing { "yes" } else { "no" },
        )
    }

    fn scan_text(&self) -> String {
        let mut lines = vec!["scanning providers...".to_string()];
        let mut ready = 0;
        for kind in ProviderKind::ALL {
            let endpoint = registry::all()
                .iter()
                .find(|m| m.provider == *kind)
                .map(|m| m.endpoint)
                .unwrap_or("-");
            let configured = self.credentials.for_provider(*kind).is_some();
            if configured {
                ready += 1;
            }
            lines.push(format!(
                "  {:<11} {:<48} key {}",
                kind.label(),
                endpoint,
                if configured { "present" } else { "missing" }
            ));
        }
        lines.push(format!("{} providers, {ready} ready", ProviderKind::ALL.len()));
        lines.join("\n")
    }
}
