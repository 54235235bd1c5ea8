//! Neuroterm REPL
//!
//! Drives one terminal session over stdin. Chat goes through the relay when
//! NEUROTERM_RELAY_URL is set, straight to the providers otherwise. The
//! `voice` command records from the microphone when the audio-io feature is
//! enabled. Exit with ctrl-d.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use neuroterm::credentials::CredentialSet;
use neuroterm::dispatch::{ChatBackend, Command, DirectBackend, Dispatch, RelayBackend, Terminal};
use neuroterm::providers::OpenAiTranscriptionProvider;
use neuroterm::storage::Storage;
use neuroterm::types::{GenerationSettings, MessageKind, TerminalMessage};
use neuroterm::voice::{CaptureOutput, VoiceCapture};

const BANNER: &str = "NEUROTERM v0.1 :: neural chat terminal\ntype 'help' for commands";

fn render(entry: &TerminalMessage) -> String {
    let prefix = match entry.kind {
        MessageKind::User => ">",
        MessageKind::System => "::",
        MessageKind::Ai => "ai:",
        MessageKind::Error => "err:",
        MessageKind::Success => "ok:",
        MessageKind::Voice => "mic:",
    };
    match entry.metadata.as_ref().and_then(|m| m.model.as_deref()) {
        Some(model) => format!("{prefix} [{model}] {}", entry.content),
        None => format!("{prefix} {}", entry.content),
    }
}

fn make_capture() -> VoiceCapture {
    #[cfg(feature = "audio-io")]
    {
        match neuroterm::audio::Recorder::new() {
            Ok(recorder) => return VoiceCapture::new(Box::new(recorder)),
            Err(err) => eprintln!(":: no microphone: {err}"),
        }
    }
    VoiceCapture::unsupported()
}

async fn handle_voice_toggle(terminal: &mut Terminal, capture: &mut VoiceCapture) {
    if terminal.panels().voice {
        capture.start();
        if let Some(err) = &capture.state().error {
            println!(":: voice: {err}");
        }
        return;
    }

    let Some(output) = capture.stop() else {
        return;
    };
    match output {
        CaptureOutput::Transcript { text, confidence } => {
            terminal.accept_transcript(text, confidence);
        }
        CaptureOutput::Audio { data, sample_rate } => {
            let provider =
                OpenAiTranscriptionProvider::new(terminal.credentials().openai.clone());
            if let Some(text) = capture.transcribe_with(&provider, data, sample_rate).await {
                let confidence = capture.state().confidence;
                terminal.accept_transcript(text, confidence);
            } else if let Some(err) = &capture.state().error {
                println!(":: voice: {err}");
            }
        }
    }
    if !terminal.pending_input().is_empty() {
        println!(
            ":: transcript ready (press enter to send): {}",
            terminal.pending_input()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("neuroterm=warn")),
        )
        .init();

    // env keys first, stored overrides on top
    let mut credentials = CredentialSet::from_env();
    let mut settings = GenerationSettings::default();
    if let Ok(path) = std::env::var("NEUROTERM_DB") {
        let storage = Storage::open(&path)?;
        if let Some(stored) = storage.load_credentials()? {
            credentials = stored.with_fallback(&credentials);
        }
        if let Some(stored) = storage.load_generation_settings()? {
            settings = stored;
        }
    }

    let backend: Arc<dyn ChatBackend> = match std::env::var("NEUROTERM_RELAY_URL") {
        Ok(url) => Arc::new(RelayBackend::new(format!(
            "{}/api/chat",
            url.trim_end_matches('/')
        ))),
        Err(_) => Arc::new(DirectBackend),
    };

    let mut terminal = Terminal::new(settings, credentials, backend);
    let mut capture = make_capture();

    println!("{BANNER}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };

        // an empty line submits a pending voice transcript, if any
        let input = if line.trim().is_empty() && !terminal.pending_input().is_empty() {
            terminal.take_pending_input()
        } else {
            line
        };

        let before = terminal.history().len();
        match terminal.submit(&input) {
            Dispatch::Ignored => {}
            Dispatch::Rejected => println!(":: busy, previous request still running"),
            Dispatch::Command(command) => {
                for entry in &terminal.history()[before.min(terminal.history().len())..] {
                    println!("{}", render(entry));
                }
                if command == Command::Voice {
                    handle_voice_toggle(&mut terminal, &mut capture).await;
                }
            }
            Dispatch::Chat(ticket) => {
                println!(":: thinking...");
                let entry = terminal.resolve_chat(ticket).await;
                println!("{}", render(&entry));
            }
        }
    }

    Ok(())
}
