//! Microphone recorder using CPAL, behind the `audio-io` feature
//!
//! Discrete capture only: record from the default input device, then hand the
//! buffered PCM to a transcription provider via the voice session.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::voice::{CaptureDevice, CaptureOutput};

/// Records from the default input device into an in-memory buffer
pub struct Recorder {
    device: Device,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    channels: u16,
    sample_rate: u32,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl Recorder {
    /// Create a recorder bound to the default input device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("No input device available".to_string()))?;

        // note: device.name() is deprecated in cpal 0.17+, but works
        #[allow(deprecated)]
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using input device: {}", device_name);

        let supported = device
            .default_input_config()
            .map_err(|e| Error::Audio(format!("No default input config: {e}")))?;

        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.config();
        let channels = stream_config.channels;
        let sample_rate = stream_config.sample_rate.0;

        debug!(
            "Stream config: {:?} (channels: {}, format: {:?})",
            stream_config, channels, sample_format
        );

        Ok(Self {
            device,
            stream_config,
            sample_format,
            channels,
            sample_rate,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    fn build_stream(&self) -> Result<Stream> {
        let err_fn = |err| error!("Audio stream error: {}", err);
        let buffer = Arc::clone(&self.buffer);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.device.build_input_stream(
                &self.stream_config,
                move |data: &[f32], _| buffer.lock().extend_from_slice(data),
                err_fn,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &self.stream_config,
                move |data: &[i16], _| {
                    buffer
                        .lock()
                        .extend(data.iter().map(|&s| f32::from(s) / 32768.0));
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => self.device.build_input_stream(
                &self.stream_config,
                move |data: &[u16], _| {
                    buffer
                        .lock()
                        .extend(data.iter().map(|&s| (f32::from(s) - 32768.0) / 32768.0));
                },
                err_fn,
                None,
            ),
            other => {
                return Err(Error::Audio(format!("Unsupported sample format: {other:?}")));
            }
        };

        stream.map_err(|e| Error::Audio(format!("Failed to build stream: {e}")))
    }

    /// Downmix to mono and convert to 16-bit little-endian PCM
    fn samples_to_pcm(&self, samples: &[f32]) -> Vec<u8> {
        let channels = usize::from(self.channels.max(1));
        let mut pcm = Vec::with_capacity(samples.len() / channels * 2);
        for frame in samples.chunks(channels) {
            let mixed = frame.iter().sum::<f32>() / frame.len() as f32;
            let value = (mixed.clamp(-1.0, 1.0) * 32767.0) as i16;
            pcm.extend_from_slice(&value.to_le_bytes());
        }
        pcm
    }
}

impl CaptureDevice for Recorder {
    fn begin(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.buffer.lock().clear();

        let stream = self.build_stream()?;
        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start stream: {e}")))?;
        self.stream = Some(stream);

        info!("Audio capture started");
        Ok(())
    }

    fn finish(&mut self) -> Result<CaptureOutput> {
        // drop the stream to stop recording
        self.stream = None;

        let samples = std::mem::take(&mut *self.buffer.lock());
        let data = self.samples_to_pcm(&samples);
        info!("Audio capture stopped, {} bytes captured", data.len());

        Ok(CaptureOutput::Audio {
            data,
            sample_rate: self.sample_rate,
        })
    }
}
