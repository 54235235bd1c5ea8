//! Integration tests for the terminal dispatcher
//!
//! A scripted backend stands in for the network; built-in commands must never
//! reach it, and the processing guard must keep at most one request in
//! flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use neuroterm::credentials::CredentialSet;
use neuroterm::dispatch::{ChatBackend, ChatContext, DirectBackend, Dispatch, Terminal};
use neuroterm::error::{Error, Result};
use neuroterm::providers::ChatReply;
use neuroterm::types::{GenerationSettings, MessageKind};

struct MockBackend {
    calls: AtomicUsize,
    fail_with: Option<fn() -> Error>,
}

impl MockBackend {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
        })
    }

    fn failing(factory: fn() -> Error) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(factory),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn send(&self, context: ChatContext) -> Result<ChatReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(factory) = self.fail_with {
            return Err(factory());
        }
        Ok(ChatReply {
            text: format!("echo: {}", context.message),
            model: context.model.name.to_string(),
            usage: None,
        })
    }
}

fn terminal_with(backend: Arc<MockBackend>) -> Terminal {
    Terminal::new(
        GenerationSettings::default(),
        CredentialSet::default(),
        backend,
    )
}

fn kinds(terminal: &Terminal) -> Vec<MessageKind> {
    terminal.history().iter().map(|m| m.kind).collect()
}

#[tokio::test]
async fn builtin_commands_never_touch_the_network() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    for name in ["help", "status", "clear", "settings", "apikeys", "mcp", "voice", "models", "scan"] {
        match terminal.submit(name) {
            Dispatch::Command(_) => {}
            other => panic!("{name} should be a command, got {other:?}"),
        }
        assert!(!terminal.processing(), "{name} must return to idle");
    }

    assert_eq!(backend.calls(), 0);
    assert!(!kinds(&terminal).contains(&MessageKind::Ai));
}

#[tokio::test]
async fn help_lists_the_core_commands() {
    let mut terminal = terminal_with(MockBackend::ok());
    terminal.submit("help");

    let entry = terminal.history().last().unwrap();
    assert_eq!(entry.kind, MessageKind::System);
    for name in ["help", "status", "clear"] {
        assert!(entry.content.contains(name), "help output missing {name}");
    }
}

#[tokio::test]
async fn clear_empties_history_unconditionally() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    for _ in 0..3 {
        if let Dispatch::Chat(ticket) = terminal.submit("hello") {
            terminal.resolve_chat(ticket).await;
        }
    }
    terminal.submit("status");
    assert!(terminal.history().len() >= 7);

    terminal.submit("CLEAR");
    assert!(terminal.history().is_empty());

    // clearing an already-empty terminal is fine too
    terminal.submit("clear");
    assert!(terminal.history().is_empty());
}

#[tokio::test]
async fn empty_input_is_ignored_entirely() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    for input in ["", "   ", "\t", "\n"] {
        match terminal.submit(input) {
            Dispatch::Ignored => {}
            other => panic!("expected Ignored, got {other:?}"),
        }
    }

    assert!(terminal.history().is_empty());
    assert!(!terminal.processing());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn submissions_while_processing_are_rejected() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    let ticket = match terminal.submit("first message") {
        Dispatch::Chat(ticket) => ticket,
        other => panic!("expected chat, got {other:?}"),
    };
    assert!(terminal.processing());
    let len_before = terminal.history().len();

    // chat, command, and empty submissions are all no-ops while busy
    assert!(matches!(terminal.submit("second message"), Dispatch::Rejected));
    assert!(matches!(terminal.submit("clear"), Dispatch::Rejected));
    assert_eq!(terminal.history().len(), len_before);
    assert_eq!(backend.calls(), 0);

    terminal.resolve_chat(ticket).await;
    assert!(!terminal.processing());
    assert_eq!(backend.calls(), 1);

    // idle again: submissions flow
    assert!(matches!(terminal.submit("third"), Dispatch::Chat(_)));
}

#[tokio::test]
async fn chat_appends_user_then_ai_with_model_metadata() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    let ticket = match terminal.submit("hello") {
        Dispatch::Chat(ticket) => ticket,
        other => panic!("expected chat, got {other:?}"),
    };

    // the user entry is appended optimistically, before resolution
    assert_eq!(kinds(&terminal), vec![MessageKind::User]);
    assert_eq!(terminal.history()[0].content, "hello");

    terminal.resolve_chat(ticket).await;

    assert_eq!(kinds(&terminal), vec![MessageKind::User, MessageKind::Ai]);
    let reply = &terminal.history()[1];
    assert!(!reply.content.is_empty());
    assert_eq!(
        reply.metadata.as_ref().unwrap().model.as_deref(),
        Some("GPT-3.5 Turbo")
    );
}

#[tokio::test]
async fn chat_failure_appends_error_and_keeps_user_entry() {
    let backend = MockBackend::failing(|| Error::upstream(500, "provider melted"));
    let mut terminal = terminal_with(backend.clone());

    let ticket = match terminal.submit("hello") {
        Dispatch::Chat(ticket) => ticket,
        other => panic!("expected chat, got {other:?}"),
    };
    terminal.resolve_chat(ticket).await;

    assert_eq!(kinds(&terminal), vec![MessageKind::User, MessageKind::Error]);
    assert_eq!(terminal.history()[0].content, "hello");
    assert!(!terminal.processing());
}

#[tokio::test]
async fn missing_credential_yields_error_entry_mentioning_api_key() {
    // the direct backend with an empty credential set fails before any
    // network call, so this is safe to run offline
    let mut terminal = Terminal::new(
        GenerationSettings::default(),
        CredentialSet::default(),
        Arc::new(DirectBackend),
    );

    let ticket = match terminal.submit("hello") {
        Dispatch::Chat(ticket) => ticket,
        other => panic!("expected chat, got {other:?}"),
    };
    let entry = terminal.resolve_chat(ticket).await;

    assert_eq!(entry.kind, MessageKind::Error);
    assert!(entry.content.contains("API key"), "got: {}", entry.content);
    assert!(!kinds(&terminal).contains(&MessageKind::Ai));
}

#[tokio::test]
async fn panel_commands_toggle_observable_state() {
    let mut terminal = terminal_with(MockBackend::ok());
    assert!(!terminal.panels().settings);

    terminal.submit("settings");
    assert!(terminal.panels().settings);
    terminal.submit("settings");
    assert!(!terminal.panels().settings);

    terminal.submit("apikeys");
    terminal.submit("mcp");
    terminal.submit("voice");
    let panels = terminal.panels();
    assert!(panels.apikeys && panels.mcp && panels.voice);
}

#[tokio::test]
async fn command_match_is_exact_so_sentences_are_chat() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    match terminal.submit("help me write a poem") {
        Dispatch::Chat(ticket) => {
            terminal.resolve_chat(ticket).await;
        }
        other => panic!("expected chat, got {other:?}"),
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn transcript_fills_pending_input_without_submitting() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    terminal.accept_transcript("run diagnostics", 0.92);

    assert_eq!(terminal.pending_input(), "run diagnostics");
    assert_eq!(kinds(&terminal), vec![MessageKind::Voice]);
    assert_eq!(backend.calls(), 0);
    assert!(!terminal.processing());

    // submission is a separate, explicit step
    let input = terminal.take_pending_input();
    assert!(matches!(terminal.submit(&input), Dispatch::Chat(_)));
}

#[tokio::test]
async fn settings_changes_apply_to_next_request_only() {
    let backend = MockBackend::ok();
    let mut terminal = terminal_with(backend.clone());

    let ticket = match terminal.submit("hi") {
        Dispatch::Chat(ticket) => ticket,
        other => panic!("expected chat, got {other:?}"),
    };

    // switch models mid-flight; the in-flight request keeps its snapshot
    let mut settings = terminal.settings().clone();
    settings.selected_model = "gpt-4".to_string();
    terminal.set_settings(settings);

    let entry = terminal.resolve_chat(ticket).await;
    assert_eq!(
        entry.metadata.unwrap().model.as_deref(),
        Some("GPT-3.5 Turbo")
    );

    let ticket = match terminal.submit("again") {
        Dispatch::Chat(ticket) => ticket,
        other => panic!("expected chat, got {other:?}"),
    };
    let entry = terminal.resolve_chat(ticket).await;
    assert_eq!(entry.metadata.unwrap().model.as_deref(), Some("GPT-4"));
}
