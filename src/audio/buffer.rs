//! Session audio accumulation with a two-lock hand-off.
//!
//! [`CaptureBuffer`] collects the [`AudioChunk`]s of one push-to-talk
//! session.  The append path runs on the capture thread and the start/stop
//! path on a control thread, so the two concerns are guarded separately:
//!
//! * `state` (mutex) — owns the active flag and the start timestamp; taken
//!   only by `start`/`stop`/duration queries.
//! * `chunks` (mutex) — owns the chunk list; taken by `append` and by the
//!   draining phase of `stop`.
//!
//! `stop` clears the `accepting` flag *before* taking the chunk lock, so an
//! `append` racing with it either completes fully before the drain or
//! observes the flag and drops the chunk — it is never interleaved with the
//! drain itself, and the capture thread is never blocked on the state lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::capture::AudioChunk;

// ---------------------------------------------------------------------------
// Errors / results
// ---------------------------------------------------------------------------

/// Errors from the capture-buffer state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// `start` was called while a recording is already active.
    #[error("a recording is already active")]
    AlreadyRecording,
}

/// Why a finished recording is usable or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Long enough to transcribe.
    Valid,
    /// Wall-clock duration below the configured minimum.
    TooShort,
    /// No chunks were delivered between start and stop.
    NoAudio,
}

/// The audio of one completed session, drained by [`CaptureBuffer::stop`].
#[derive(Debug, Clone)]
pub struct RecordingResult {
    /// Mono samples in arrival order (multi-channel input is downmixed).
    pub samples: Vec<f32>,
    /// Sample rate of the captured audio in Hz (0 when no audio arrived).
    pub sample_rate: u32,
    /// Wall-clock time between `start` and `stop`.
    ///
    /// This is deliberately *not* derived from the sample count: a stalled
    /// capture source yields less audio than the elapsed time suggests, and
    /// the duration gate measures how long the user held the key.
    pub duration: Duration,
    /// Whether the recording passes the duration gate.
    pub validity: Validity,
}

impl RecordingResult {
    /// Returns `true` when the recording can be handed to transcription.
    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    /// Duration of the actually captured audio, from the sample count.
    pub fn sample_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

// ---------------------------------------------------------------------------
// CaptureBuffer
// ---------------------------------------------------------------------------

struct RecorderState {
    active: bool,
    started_at: Option<Instant>,
}

/// Accumulates streamed audio chunks for at most one session at a time.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use voxkey::audio::{AudioChunk, CaptureBuffer};
///
/// let buffer = CaptureBuffer::new(Duration::ZERO);
/// buffer.start().unwrap();
/// buffer.append(&AudioChunk {
///     samples: vec![0.1, 0.2],
///     sample_rate: 16_000,
///     channels: 1,
/// });
/// let result = buffer.stop().unwrap();
/// assert_eq!(result.samples, vec![0.1, 0.2]);
/// ```
pub struct CaptureBuffer {
    min_duration: Duration,
    state: Mutex<RecorderState>,
    /// Fast gate read by the append path; cleared by `stop` before draining.
    accepting: AtomicBool,
    chunks: Mutex<Vec<AudioChunk>>,
}

impl CaptureBuffer {
    /// Create a buffer whose recordings must last at least `min_duration`
    /// (wall clock) to be tagged [`Validity::Valid`].
    pub fn new(min_duration: Duration) -> Self {
        Self {
            min_duration,
            state: Mutex::new(RecorderState {
                active: false,
                started_at: None,
            }),
            accepting: AtomicBool::new(false),
            chunks: Mutex::new(Vec::new()),
        }
    }

    /// Begin a new session: clear the chunk list, stamp the start time and
    /// open the append gate.
    ///
    /// # Errors
    ///
    /// [`CaptureError::AlreadyRecording`] when a session is active; the
    /// buffer contents of the active session are left untouched.
    pub fn start(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().unwrap();
        if state.active {
            return Err(CaptureError::AlreadyRecording);
        }

        self.chunks.lock().unwrap().clear();
        state.active = true;
        state.started_at = Some(Instant::now());
        self.accepting.store(true, Ordering::Release);
        Ok(())
    }

    /// Append one chunk to the active session (copy semantics — the caller
    /// may reuse its memory after this returns).
    ///
    /// A no-op when no session is active or a `stop` is in progress.  Takes
    /// only the chunk lock, so the capture thread never contends with the
    /// start/stop state lock.
    pub fn append(&self, chunk: &AudioChunk) {
        if !self.accepting.load(Ordering::Acquire) {
            return;
        }
        let mut chunks = self.chunks.lock().unwrap();
        // Re-check under the lock: a concurrent stop() may have closed the
        // gate between the load above and the lock acquisition.
        if !self.accepting.load(Ordering::Acquire) {
            return;
        }
        chunks.push(chunk.clone());
    }

    /// End the active session and drain its audio.
    ///
    /// Concatenates all chunks in arrival order, downmixes interleaved
    /// multi-channel data to mono, and tags the result against the duration
    /// gate.  Returns `None` when no session is active.
    ///
    /// The maximum-duration cap is *not* enforced here — the capture source
    /// stops producing chunks instead (see [`super::forward_chunks`]).
    pub fn stop(&self) -> Option<RecordingResult> {
        let mut state = self.state.lock().unwrap();
        if !state.active {
            return None;
        }
        state.active = false;
        let duration = state
            .started_at
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();

        // Close the gate before draining so no append interleaves with it.
        self.accepting.store(false, Ordering::Release);
        let chunks = std::mem::take(&mut *self.chunks.lock().unwrap());

        if chunks.is_empty() {
            return Some(RecordingResult {
                samples: Vec::new(),
                sample_rate: 0,
                duration,
                validity: Validity::NoAudio,
            });
        }

        let sample_rate = chunks[0].sample_rate;
        let mut samples = Vec::with_capacity(chunks.iter().map(|c| c.samples.len()).sum());
        for chunk in &chunks {
            if chunk.channels > 1 {
                samples.extend(downmix_to_mono(&chunk.samples, chunk.channels));
            } else {
                samples.extend_from_slice(&chunk.samples);
            }
        }

        let validity = if duration >= self.min_duration {
            Validity::Valid
        } else {
            Validity::TooShort
        };

        Some(RecordingResult {
            samples,
            sample_rate,
            duration,
            validity,
        })
    }

    /// Returns `true` while a session is active.
    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    /// Wall-clock time since the active session started, or `None` when
    /// idle.  Used by the capture source for its production cap.
    pub fn duration_so_far(&self) -> Option<Duration> {
        let state = self.state.lock().unwrap();
        if state.active {
            state.started_at.map(|t| t.elapsed())
        } else {
            None
        }
    }
}

/// Average interleaved frames down to a single channel.
fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels.max(1) as usize;
    samples
        .chunks(ch)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
