//! Neuroterm - neural chat terminal engine
//!
//! A themed chat terminal core with provider abstraction for LLM chat and
//! speech transcription, a command dispatcher, voice capture, and locally
//! persisted settings. The sibling relay binary exposes the same normalizer
//! behind stateless HTTP endpoints.

#[cfg(feature = "audio-io")]
pub mod audio;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod providers;
pub mod registry;
pub mod storage;
pub mod types;
pub mod voice;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main engine components for convenience
pub use credentials::CredentialSet;
pub use dispatch::{ChatBackend, Command, DirectBackend, Dispatch, RelayBackend, Terminal};
pub use providers::{ChatProvider, TranscriptionProvider};
pub use registry::{ModelDescriptor, ProviderKind};
pub use storage::Storage;
pub use voice::VoiceCapture;
