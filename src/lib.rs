//! voxkey — push-to-talk voice dictation.
//!
//! Hold the configured hotkey to record, release to transcribe; the
//! transcript is corrected against a user dictionary and pasted at the
//! cursor.
//!
//! # Architecture
//!
//! ```text
//! rdev thread ─▶ hotkey::HotkeyEdgeDetector ─▶ pipeline::SessionController
//!                                                 │
//! cpal thread ─▶ audio::CaptureBuffer ◀── start / stop
//!                                                 │ valid recording
//!                                   stt::TranscriptionService (whisper)
//!                                   correct::CorrectionEngine
//!                                   store::HistoryStore
//!                                                 │
//!                              pipeline::SignalHub ─▶ inject::TextInjector
//! ```
//!
//! The library exposes every component; `main.rs` only wires them.  See
//! each module's docs for its contract.

pub mod audio;
pub mod config;
pub mod correct;
pub mod hotkey;
pub mod inject;
pub mod pipeline;
pub mod store;
pub mod stt;
