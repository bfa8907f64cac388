//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming [`AudioChunk`]s over an mpsc
//! channel.  The returned [`StreamHandle`] is a RAII guard — dropping it
//! stops the underlying cpal stream.
//!
//! The stream runs for the whole process lifetime; chunks only reach the
//! [`CaptureBuffer`] while a session is active, and [`forward_chunks`]
//! stops delivering once the configured maximum duration is exceeded.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::buffer::CaptureBuffer;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.  Appending a
/// chunk to a [`CaptureBuffer`] copies it — the producer may reuse its own
/// memory after the call returns.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// DeviceError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use voxkey::audio::{AudioCapture, AudioChunk};
///
/// let (tx, rx) = mpsc::channel::<AudioChunk>();
/// let capture = AudioCapture::new(16_000, 1).unwrap();
/// let _handle = capture.start(tx).unwrap();
/// // `_handle` keeps the stream alive; drop it to stop capturing.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Sample rate the stream was opened with (Hz).
    sample_rate: u32,
    /// Number of interleaved channels the stream was opened with.
    channels: u16,
}

impl AudioCapture {
    /// Create an [`AudioCapture`] on the system default input device,
    /// requesting `sample_rate`/`channels` directly.
    ///
    /// The transcription model consumes the captured rate as-is (there is no
    /// resampling stage), so the stream is opened at the configured format.
    /// Devices that cannot honour it reject the stream at
    /// [`start`](Self::start) with [`DeviceError::BuildStream`].
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, DeviceError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(DeviceError::NoDevice)?;

        // Query the default config first so a broken device fails here with
        // a clearer error than a stream-build rejection.
        let _ = device.default_input_config()?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start capturing and send [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread; each time the
    /// hardware delivers a buffer the raw `f32` samples are wrapped in an
    /// [`AudioChunk`] and forwarded over the channel.  Send errors (receiver
    /// dropped) are silently ignored so the audio thread never panics.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, DeviceError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// forward_chunks
// ---------------------------------------------------------------------------

/// Spawn the thread that drains captured chunks into the session buffer.
///
/// Runs until the sending side of `rx` is dropped.  While a session is
/// active the chunks are appended to `buffer`; once the session's wall-clock
/// duration reaches `max_duration` further chunks are dropped (the buffer
/// never enforces the cap itself).  Appends while no session is active are
/// no-ops inside the buffer, so this thread needs no recording flag of its
/// own.
pub fn forward_chunks(
    rx: mpsc::Receiver<AudioChunk>,
    buffer: Arc<CaptureBuffer>,
    max_duration: Duration,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("audio-forward".into())
        .spawn(move || {
            let mut capped = false;
            while let Ok(chunk) = rx.recv() {
                match buffer.duration_so_far() {
                    Some(elapsed) if elapsed >= max_duration => {
                        if !capped {
                            log::warn!(
                                "audio: session reached the {}s cap, dropping further chunks",
                                max_duration.as_secs()
                            );
                            capped = true;
                        }
                    }
                    Some(_) => {
                        buffer.append(&chunk);
                    }
                    None => {
                        // Session over; reset the cap warning for the next one.
                        capped = false;
                    }
                }
            }
        })
        .expect("failed to spawn audio-forward thread")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Validity;

    /// `AudioChunk` must be `Send` so it can cross thread boundaries.
    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn audio_chunk_fields() {
        let chunk = AudioChunk {
            samples: vec![0.0_f32; 512],
            sample_rate: 16_000,
            channels: 1,
        };
        assert_eq!(chunk.samples.len(), 512);
        assert_eq!(chunk.sample_rate, 16_000);
        assert_eq!(chunk.channels, 1);
    }

    // ---- forward_chunks (driven by a plain channel, no device needed) ------

    #[test]
    fn forwarder_appends_chunks_to_active_session() {
        let buffer = Arc::new(CaptureBuffer::new(Duration::ZERO));
        let (tx, rx) = mpsc::channel();
        let handle = forward_chunks(rx, Arc::clone(&buffer), Duration::from_secs(300));

        buffer.start().unwrap();
        tx.send(AudioChunk {
            samples: vec![1.0, 2.0],
            sample_rate: 16_000,
            channels: 1,
        })
        .unwrap();
        tx.send(AudioChunk {
            samples: vec![3.0],
            sample_rate: 16_000,
            channels: 1,
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();

        let result = buffer.stop().unwrap();
        assert_eq!(result.samples, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn forwarder_drops_chunks_past_the_cap() {
        let buffer = Arc::new(CaptureBuffer::new(Duration::ZERO));
        let (tx, rx) = mpsc::channel();
        // Zero cap: every chunk of an active session is already past it.
        let handle = forward_chunks(rx, Arc::clone(&buffer), Duration::ZERO);

        buffer.start().unwrap();
        tx.send(AudioChunk {
            samples: vec![1.0; 16],
            sample_rate: 16_000,
            channels: 1,
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();

        let result = buffer.stop().unwrap();
        assert_eq!(result.validity, Validity::NoAudio);
    }

    #[test]
    fn forwarder_ignores_chunks_while_idle() {
        let buffer = Arc::new(CaptureBuffer::new(Duration::ZERO));
        let (tx, rx) = mpsc::channel();
        let handle = forward_chunks(rx, Arc::clone(&buffer), Duration::from_secs(300));

        // No session active — the chunk must vanish.
        tx.send(AudioChunk {
            samples: vec![1.0],
            sample_rate: 16_000,
            channels: 1,
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();

        buffer.start().unwrap();
        assert_eq!(buffer.stop().unwrap().validity, Validity::NoAudio);
    }
}
