//! Voice capture lifecycle
//!
//! A small state machine over a capture capability. Two mutually exclusive
//! modes exist behind the same trait: a continuous recognizer that emits
//! interim/final transcripts itself, and a discrete recorder whose captured
//! audio must be sent to a transcription provider after `stop()`. Completed
//! transcripts land in the terminal's pending input and are never
//! auto-submitted.

use tracing::{debug, warn};

use crate::error::Result;
use crate::providers::{
    ASSUMED_CONFIDENCE, TranscriptionProvider, TranscriptionRequest,
};
use crate::types::AudioData;

/// What a capture device hands back when capture stops
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutput {
    /// Continuous mode: the device already recognized speech
    Transcript { text: String, confidence: f32 },
    /// Recorded mode: raw PCM to submit for transcription
    Audio { data: AudioData, sample_rate: u32 },
}

/// Events emitted by a continuous recognizer while listening
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Interim { text: String, confidence: f32 },
    Final { text: String, confidence: f32 },
    Error(String),
    Ended,
}

/// A capture capability: microphone recorder or speech recognizer
pub trait CaptureDevice {
    fn begin(&mut self) -> Result<()>;
    fn finish(&mut self) -> Result<CaptureOutput>;
}

/// Transient per-capture state, reset on every new start
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceState {
    pub listening: bool,
    pub supported: bool,
    pub transcript: String,
    pub confidence: f32,
    pub error: Option<String>,
}

/// Voice capture session driving one [`CaptureDevice`]
pub struct VoiceCapture {
    device: Option<Box<dyn CaptureDevice>>,
    state: VoiceState,
}

impl VoiceCapture {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device: Some(device),
            state: VoiceState {
                supported: true,
                ..Default::default()
            },
        }
    }

    /// A session with no capture capability; `start()` records the error
    /// instead of listening.
    pub fn unsupported() -> Self {
        Self {
            device: None,
            state: VoiceState::default(),
        }
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening
    }

    /// Begin capture. Missing capability or a device refusal sets the error
    /// field and leaves the session idle; nothing is thrown at the caller.
    pub fn start(&mut self) {
        if self.state.listening {
            return;
        }

        // fresh session state on every capture
        self.state.transcript.clear();
        self.state.confidence = 0.0;
        self.state.error = None;

        match self.device.as_mut() {
            None => {
                self.state.error = Some("voice capture is not supported here".to_string());
            }
            Some(device) => match device.begin() {
                Ok(()) => {
                    self.state.listening = true;
                    debug!("voice capture started");
                }
                Err(err) => {
                    warn!("voice capture failed to start: {err}");
                    self.state.error = Some(err.to_string());
                }
            },
        }
    }

    /// Feed a continuous-recognition event into the session.
    pub fn on_event(&mut self, event: CaptureEvent) {
        if !self.state.listening {
            return;
        }
        match event {
            CaptureEvent::Interim { text, confidence }
            | CaptureEvent::Final { text, confidence } => {
                self.state.transcript = text;
                self.state.confidence = confidence;
            }
            CaptureEvent::Error(message) => {
                self.state.error = Some(message);
                self.state.listening = false;
            }
            CaptureEvent::Ended => {
                self.state.listening = false;
            }
        }
    }

    /// End capture. Continuous mode yields the final transcript directly;
    /// recorded mode yields audio the caller must transcribe (see
    /// [`VoiceCapture::transcribe_with`]).
    pub fn stop(&mut self) -> Option<CaptureOutput> {
        if !self.state.listening {
            return None;
        }
        self.state.listening = false;

        let device = self.device.as_mut()?;
        match device.finish() {
            Ok(CaptureOutput::Transcript { text, confidence }) => {
                self.state.transcript = text.clone();
                self.state.confidence = confidence;
                Some(CaptureOutput::Transcript { text, confidence })
            }
            Ok(output) => Some(output),
            Err(err) => {
                warn!("voice capture failed to stop: {err}");
                self.state.error = Some(err.to_string());
                None
            }
        }
    }

    /// Transcribe recorded audio through a provider and record the result.
    /// The provider reports no real confidence, so the assumed-high fixed
    /// value applies. Returns the transcript text for the pending input.
    pub async fn transcribe_with(
        &mut self,
        provider: &dyn TranscriptionProvider,
        data: AudioData,
        sample_rate: u32,
    ) -> Option<String> {
        let request = TranscriptionRequest::pcm(data, sample_rate).with_language("en");
        match provider.transcribe(request).await {
            Ok(response) => {
                let confidence = response.confidence.unwrap_or(ASSUMED_CONFIDENCE);
                self.state.transcript = response.text.clone();
                self.state.confidence = confidence;
                Some(response.text)
            }
            Err(err) => {
                warn!("transcription failed: {err}");
                self.state.error = Some(err.user_message());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Scripted device standing in for a microphone
    struct ScriptedDevice {
        begin_result: Option<String>, // Some(err) = refuse to start
        output: CaptureOutput,
    }

    impl CaptureDevice for ScriptedDevice {
        fn begin(&mut self) -> Result<()> {
            match self.begin_result.take() {
                Some(err) => Err(Error::Audio(err)),
                None => Ok(()),
            }
        }

        fn finish(&mut self) -> Result<CaptureOutput> {
            Ok(self.output.clone())
        }
    }

    fn recognizer(text: &str, confidence: f32) -> Box<ScriptedDevice> {
        Box::new(ScriptedDevice {
            begin_result: None,
            output: CaptureOutput::Transcript {
                text: text.to_string(),
                confidence,
            },
        })
    }

    #[test]
    fn test_unsupported_start_fails_silently() {
        let mut capture = VoiceCapture::unsupported();
        capture.start();
        assert!(!capture.is_listening());
        assert!(capture.state().error.is_some());
        assert!(!capture.state().supported);
    }

    #[test]
    fn test_permission_denied_sets_error_not_panic() {
        let mut capture = VoiceCapture::new(Box::new(ScriptedDevice {
            begin_result: Some("permission denied".into()),
            output: CaptureOutput::Transcript {
                text: String::new(),
                confidence: 0.0,
            },
        }));
        capture.start();
        assert!(!capture.is_listening());
        assert!(capture.state().error.as_ref().unwrap().contains("permission denied"));
    }

    #[test]
    fn test_continuous_capture_lifecycle() {
        let mut capture = VoiceCapture::new(recognizer("open the pod bay doors", 0.87));
        capture.start();
        assert!(capture.is_listening());
        assert!(capture.state().error.is_none());

        capture.on_event(CaptureEvent::Interim {
            text: "open the".into(),
            confidence: 0.4,
        });
        assert_eq!(capture.state().transcript, "open the");

        let output = capture.stop().unwrap();
        assert_eq!(
            output,
            CaptureOutput::Transcript {
                text: "open the pod bay doors".into(),
                confidence: 0.87
            }
        );
        assert!(!capture.is_listening());
        assert_eq!(capture.state().transcript, "open the pod bay doors");
    }

    #[test]
    fn test_state_resets_on_each_start() {
        let mut capture = VoiceCapture::new(recognizer("second", 0.9));
        capture.start();
        capture.on_event(CaptureEvent::Final {
            text: "first".into(),
            confidence: 0.5,
        });
        capture.on_event(CaptureEvent::Ended);
        assert_eq!(capture.state().transcript, "first");

        capture.start();
        assert_eq!(capture.state().transcript, "");
        assert_eq!(capture.state().confidence, 0.0);
        assert!(capture.state().error.is_none());
    }

    #[test]
    fn test_recognizer_error_stops_listening() {
        let mut capture = VoiceCapture::new(recognizer("x", 0.5));
        capture.start();
        capture.on_event(CaptureEvent::Error("mic disconnected".into()));
        assert!(!capture.is_listening());
        assert!(capture.state().error.is_some());
        // events after the session ended are dropped
        capture.on_event(CaptureEvent::Final {
            text: "ghost".into(),
            confidence: 0.9,
        });
        assert_ne!(capture.state().transcript, "ghost");
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut capture = VoiceCapture::new(recognizer("x", 0.5));
        assert!(capture.stop().is_none());
    }

    #[test]
    fn test_recorded_mode_yields_audio() {
        let mut capture = VoiceCapture::new(Box::new(ScriptedDevice {
            begin_result: None,
            output: CaptureOutput::Audio {
                data: vec![1, 2, 3, 4],
                sample_rate: 16000,
            },
        }));
        capture.start();
        match capture.stop() {
            Some(CaptureOutput::Audio { data, sample_rate }) => {
                assert_eq!(data, vec![1, 2, 3, 4]);
                assert_eq!(sample_rate, 16000);
            }
            other => panic!("expected audio output, got {other:?}"),
        }
    }
}
