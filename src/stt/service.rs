//! Model lifecycle and the blocking inference entry point.
//!
//! [`TranscriptionService`] owns the process-wide [`ModelState`]:
//!
//! ```text
//! Unloaded ──load_async──▶ Loading ──▶ Ready
//!                              └─────▶ Failed(reason)
//! Failed ──reload──▶ Unloaded (then load_async)
//! ```
//!
//! Transitions are monotonic; `Failed → Loading` never happens on its own —
//! only the explicit [`reload`](TranscriptionService::reload) entry point
//! leaves `Failed`.  Loading runs on the tokio blocking pool and announces
//! completion through the `on_ready`/`on_error` subscriber lists.
//!
//! [`infer`](TranscriptionService::infer) fails fast with
//! [`InferError::NotReady`] outside `Ready` — no queueing before the model
//! exists.  Concurrent calls are serialised on the model mutex: a second
//! caller waits its turn, it is never dropped and never corrupts the first.

use std::sync::{Arc, Mutex};

use super::backend::{InferError, ModelBackend, ModelOptions, SpeechModel, Transcript};

// ---------------------------------------------------------------------------
// ModelState
// ---------------------------------------------------------------------------

/// Lifecycle phase of the transcription model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    /// No load has been requested yet.
    Unloaded,
    /// A load is running on a worker.
    Loading,
    /// The model is loaded; `infer` is available.
    Ready,
    /// The last load failed; `infer` is rejected until [`TranscriptionService::reload`].
    Failed(String),
}

// ---------------------------------------------------------------------------
// TranscriptionService
// ---------------------------------------------------------------------------

type ReadyFn = Box<dyn Fn() + Send + Sync>;
type ErrorFn = Box<dyn Fn(&str) + Send + Sync>;

/// Owns the model lifecycle and serialises inference.
///
/// Shared as `Arc<TranscriptionService>`; all methods take `&self`.
pub struct TranscriptionService {
    backend: Arc<dyn ModelBackend>,
    options: ModelOptions,
    state: Mutex<ModelState>,
    /// The loaded model.  Doubles as the inference serialisation lock.
    model: Mutex<Option<Box<dyn SpeechModel>>>,
    on_ready: Mutex<Vec<ReadyFn>>,
    on_error: Mutex<Vec<ErrorFn>>,
    runtime: tokio::runtime::Handle,
}

impl TranscriptionService {
    /// Create a service in the `Unloaded` state.
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        options: ModelOptions,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            backend,
            options,
            state: Mutex::new(ModelState::Unloaded),
            model: Mutex::new(None),
            on_ready: Mutex::new(Vec::new()),
            on_error: Mutex::new(Vec::new()),
            runtime,
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register a callback fired (on the loading worker) when the model
    /// reaches `Ready`.
    pub fn subscribe_ready(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_ready.lock().unwrap().push(Box::new(f));
    }

    /// Register a callback fired (on the loading worker) when a load fails.
    pub fn subscribe_error(&self, f: impl Fn(&str) + Send + Sync + 'static) {
        self.on_error.lock().unwrap().push(Box::new(f));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Request an asynchronous model load.  Idempotent: a no-op while
    /// `Loading` or `Ready`, and also while `Failed` — recovering from a
    /// failed load requires the explicit [`reload`](Self::reload).
    pub fn load_async(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                ModelState::Loading | ModelState::Ready => return,
                ModelState::Failed(_) => {
                    log::debug!("stt: load_async ignored in Failed state (use reload)");
                    return;
                }
                ModelState::Unloaded => *state = ModelState::Loading,
            }
        }

        let service = Arc::clone(self);
        self.runtime.spawn_blocking(move || service.run_load());
    }

    /// Drop any failed or loaded model and load again.  A no-op while a
    /// load is already in flight.
    pub fn reload(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == ModelState::Loading {
                return;
            }
            *state = ModelState::Unloaded;
            *self.model.lock().unwrap() = None;
        }
        self.load_async();
    }

    /// Blocking load body; runs on the blocking pool.
    fn run_load(&self) {
        log::info!("stt: loading model {}", self.options.model_path.display());

        match self.backend.load(&self.options) {
            Ok(model) => {
                *self.model.lock().unwrap() = Some(model);
                *self.state.lock().unwrap() = ModelState::Ready;
                log::info!("stt: model ready");
                for f in self.on_ready.lock().unwrap().iter() {
                    f();
                }
            }
            Err(e) => {
                let reason = e.to_string();
                *self.state.lock().unwrap() = ModelState::Failed(reason.clone());
                log::error!("stt: model load failed: {reason}");
                for f in self.on_error.lock().unwrap().iter() {
                    f(&reason);
                }
            }
        }
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> ModelState {
        self.state.lock().unwrap().clone()
    }

    /// Returns `true` when `infer` is available.
    pub fn is_ready(&self) -> bool {
        *self.state.lock().unwrap() == ModelState::Ready
    }

    // -----------------------------------------------------------------------
    // Inference
    // -----------------------------------------------------------------------

    /// Transcribe `samples` (mono f32).  Blocking — may take seconds; call
    /// from a worker, never from an edge-handling thread.
    ///
    /// The samples are peak-normalized to `[-1, 1]` before the model sees
    /// them; silent audio (peak 0) is passed through untouched.  The
    /// configured language hint travels with the call.
    ///
    /// # Errors
    ///
    /// - [`InferError::NotReady`] — state is not `Ready`; no model work done.
    /// - [`InferError::ResourceExhausted`] — recoverable pressure, retry later.
    /// - [`InferError::Failed`] — this attempt is lost; drop the session.
    pub fn infer(&self, samples: &[f32], sample_rate: u32) -> Result<Transcript, InferError> {
        if !self.is_ready() {
            return Err(InferError::NotReady);
        }

        let normalized = normalize_peak(samples);

        let guard = self.model.lock().unwrap();
        let Some(model) = guard.as_ref() else {
            // A reload raced us between the state check and the lock.
            return Err(InferError::NotReady);
        };

        model.infer(&normalized, sample_rate, &self.options.language)
    }
}

/// Scale samples so the absolute peak is 1.0; silence is left untouched to
/// avoid dividing by zero.
fn normalize_peak(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0_f32, |max, s| max.max(s.abs()));
    if peak > 0.0 {
        samples.iter().map(|s| s / peak).collect()
    } else {
        samples.to_vec()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
