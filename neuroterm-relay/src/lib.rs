//! Neuroterm relay: stateless key-attaching proxy for chat and transcription

pub mod error;
pub mod routes;

pub use routes::{AppState, router};
