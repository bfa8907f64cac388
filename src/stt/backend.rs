//! Model backend boundary: loading and inference contracts.
//!
//! [`ModelBackend`] and [`SpeechModel`] are the two seams between the core
//! pipeline and whatever inference engine actually runs.  Errors are tagged
//! result variants — a backend never panics across this boundary, and the
//! caller can tell recoverable resource pressure apart from a failed
//! inference attempt.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{AppPaths, ModelConfig};

// ---------------------------------------------------------------------------
// ModelOptions
// ---------------------------------------------------------------------------

/// Everything a backend needs to load and run a model.
///
/// `device`, `dtype` and `max_new_tokens` are carried through unmodified;
/// backends ignore the fields they have no use for.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Resolved path of the model file.
    pub model_path: PathBuf,
    /// Inference device hint (e.g. `"cpu"`, `"cuda:0"`).
    pub device: String,
    /// Weight precision hint (e.g. `"float16"`).
    pub dtype: String,
    /// Maximum number of new text tokens per inference.
    pub max_new_tokens: u32,
    /// ISO-639-1 language hint, or `"auto"` for detection.
    pub language: String,
    /// CPU threads handed to the backend.
    pub n_threads: i32,
}

impl ModelOptions {
    /// Resolve options from the model configuration, locating the model file
    /// under the platform models directory.
    pub fn from_config(config: &ModelConfig, paths: &AppPaths) -> Self {
        Self {
            model_path: paths.models_dir.join(format!("{}.bin", config.model)),
            device: config.device.clone(),
            dtype: config.dtype.clone(),
            max_new_tokens: config.max_new_tokens,
            language: config.language.clone(),
            n_threads: optimal_threads(),
        }
    }
}

/// Number of CPU threads to hand to inference, capped at 8 to avoid
/// diminishing returns.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from loading a model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The model file was not found at the resolved path.
    #[error("model not found: {0}")]
    NotFound(String),

    /// The backend failed to initialise the model.
    #[error("model initialisation failed: {0}")]
    Init(String),
}

/// Errors from a single inference call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferError {
    /// The model is not loaded — the call was rejected before any model
    /// work; retry after the service reports Ready.
    #[error("model is not ready")]
    NotReady,

    /// Recoverable resource pressure (e.g. accelerator memory exhaustion).
    /// Transient resources have been released; a later attempt may succeed.
    #[error("inference resources exhausted: {0}")]
    ResourceExhausted(String),

    /// The inference attempt failed; the session should be dropped.
    #[error("inference failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// The output of one successful inference.  Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Raw transcribed text (whitespace-trimmed by the backend).
    pub text: String,
    /// Detected language, or the requested hint when detection is off.
    pub language: String,
}

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

/// A loaded model ready to run blocking inference.
///
/// Implementations must be `Send + Sync`; the service serialises calls, so
/// an implementation may assume no two `infer` calls overlap.  Any per-call
/// state must be acquired and released inside the call — nothing may leak
/// across invocations, on success or failure.
pub trait SpeechModel: Send + Sync {
    /// Transcribe `samples` (mono f32, peak-normalized to `[-1, 1]`).
    fn infer(
        &self,
        samples: &[f32],
        sample_rate: u32,
        language: &str,
    ) -> Result<Transcript, InferError>;
}

/// Factory for [`SpeechModel`]s — the load half of the backend contract.
pub trait ModelBackend: Send + Sync + 'static {
    /// Load a model according to `options`.  Blocking; runs on a worker.
    fn load(&self, options: &ModelOptions) -> Result<Box<dyn SpeechModel>, ModelError>;
}

// Compile-time assertion: the traits must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechModel>, _: Box<dyn ModelBackend>) {}
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// A [`SpeechModel`] double that records what it was asked to do.
#[cfg(test)]
pub struct MockModel {
    response: Result<Transcript, InferError>,
    /// Number of `infer` calls so far.
    pub calls: std::sync::atomic::AtomicUsize,
    /// Samples received by the most recent call.
    pub last_samples: std::sync::Mutex<Vec<f32>>,
    /// Language hint received by the most recent call.
    pub last_language: std::sync::Mutex<String>,
}

#[cfg(test)]
impl MockModel {
    /// A model that always succeeds with `text` (language `"fr"`).
    pub fn ok(text: impl Into<String>) -> Self {
        Self::with_response(Ok(Transcript {
            text: text.into(),
            language: "fr".into(),
        }))
    }

    /// A model that always returns `error`.
    pub fn err(error: InferError) -> Self {
        Self::with_response(Err(error))
    }

    pub fn with_response(response: Result<Transcript, InferError>) -> Self {
        Self {
            response,
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_samples: std::sync::Mutex::new(Vec::new()),
            last_language: std::sync::Mutex::new(String::new()),
        }
    }
}

#[cfg(test)]
impl SpeechModel for MockModel {
    fn infer(
        &self,
        samples: &[f32],
        _sample_rate: u32,
        language: &str,
    ) -> Result<Transcript, InferError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_samples.lock().unwrap() = samples.to_vec();
        *self.last_language.lock().unwrap() = language.to_string();
        self.response.clone()
    }
}

/// A [`ModelBackend`] double built from a factory closure, counting loads.
#[cfg(test)]
pub struct MockBackend {
    factory: Box<dyn Fn() -> Result<Box<dyn SpeechModel>, ModelError> + Send + Sync>,
    pub loads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockBackend {
    /// A backend whose models always transcribe to `text`.
    pub fn ok(text: &str) -> Self {
        let text = text.to_string();
        Self::with(move || Ok(Box::new(MockModel::ok(text.clone())) as Box<dyn SpeechModel>))
    }

    /// A backend that always fails to load.
    pub fn failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::with(move || Err(ModelError::Init(reason.clone())))
    }

    pub fn with(
        factory: impl Fn() -> Result<Box<dyn SpeechModel>, ModelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            loads: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl ModelBackend for MockBackend {
    fn load(&self, _options: &ModelOptions) -> Result<Box<dyn SpeechModel>, ModelError> {
        self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        (self.factory)()
    }
}

#[cfg(test)]
impl ModelOptions {
    /// Minimal options for tests that never touch a real model file.
    pub fn for_tests() -> Self {
        Self {
            model_path: PathBuf::from("/nonexistent/test-model.bin"),
            device: "cpu".into(),
            dtype: "float16".into(),
            max_new_tokens: 512,
            language: "fr".into(),
            n_threads: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
