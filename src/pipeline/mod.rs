//! Session orchestration — the state machine tying hotkey edges, audio
//! capture, transcription and correction together.
//!
//! # Overview
//!
//! ```text
//! HotkeyEdgeDetector ──on_press/on_release──▶ SessionController
//!     │                                           │
//!     │                              CaptureBuffer.start/stop
//!     │                                           │ valid recording
//!     │                              TranscriptionService.infer
//!     │                              CorrectionEngine.apply
//!     │                              TranscriptSink.insert
//!     ▼                                           ▼
//!  (workers)                        SignalHub ──▶ subscribers
//! ```
//!
//! The controller enforces the session invariants: at most one active
//! session, at most one transcription in flight, and a guaranteed return to
//! [`SessionPhase::Idle`] on every outcome.

pub mod controller;
pub mod signal;
pub mod state;

pub use controller::SessionController;
pub use signal::{FinalTranscript, SessionSignal, SignalHub};
pub use state::SessionPhase;
