//! Speech-to-text: model backend boundary and the transcription service.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │               TranscriptionService                          │
//! │   ModelState: Unloaded → Loading → Ready / Failed           │
//! │                                                             │
//! │   load_async ──▶ ModelBackend::load(ModelOptions)           │
//! │                      └─▶ Box<dyn SpeechModel>               │
//! │   infer ──normalize──▶ SpeechModel::infer(samples, rate,    │
//! │                                            language hint)   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`WhisperBackend`] is the production [`ModelBackend`] built on
//! `whisper_rs`.  The service never knows which backend it drives; tests
//! substitute mocks.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxkey::config::{AppConfig, AppPaths};
//! use voxkey::stt::{ModelOptions, TranscriptionService, WhisperBackend};
//!
//! # fn wire(runtime: tokio::runtime::Handle) {
//! let config = AppConfig::default();
//! let options = ModelOptions::from_config(&config.model, &AppPaths::new());
//! let service = Arc::new(TranscriptionService::new(
//!     Arc::new(WhisperBackend),
//!     options,
//!     runtime,
//! ));
//! service.load_async(); // returns immediately; Ready is signalled later
//! # }
//! ```

pub mod backend;
pub mod service;
pub mod whisper;

pub use backend::{InferError, ModelBackend, ModelError, ModelOptions, SpeechModel, Transcript};
pub use service::{ModelState, TranscriptionService};
pub use whisper::WhisperBackend;

// test-only re-exports so other modules' test code can use the doubles
// without reaching into `backend` directly.
#[cfg(test)]
pub use backend::{MockBackend, MockModel};
