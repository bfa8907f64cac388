//! Audio capture pipeline — microphone → chunks → session buffer.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → forward_chunks
//!           → CaptureBuffer (append while a session is active)
//! ```
//!
//! [`CaptureBuffer`] is the session-scoped accumulator with the start/stop
//! contract; [`AudioCapture`] wraps the cpal device and streams
//! [`AudioChunk`]s for the whole process lifetime.  The forwarder thread
//! ([`forward_chunks`]) sits between them and enforces the maximum-duration
//! cap so the buffer itself never has to.

pub mod buffer;
pub mod capture;

pub use buffer::{CaptureBuffer, CaptureError, RecordingResult, Validity};
pub use capture::{forward_chunks, AudioCapture, AudioChunk, DeviceError, StreamHandle};
