//! Production model backend built on `whisper_rs`.
//!
//! [`WhisperBackend`] loads a GGML model file and hands back a
//! [`SpeechModel`] that runs greedy single-pass decoding with the configured
//! language hint.  A fresh `WhisperState` is created for every inference and
//! dropped before the call returns, so nothing leaks across calls and the
//! model itself can be shared without locking.

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::backend::{InferError, ModelBackend, ModelError, ModelOptions, SpeechModel, Transcript};

// ---------------------------------------------------------------------------
// WhisperBackend
// ---------------------------------------------------------------------------

/// Loads Whisper GGML models.
///
/// The `device`, `dtype` and `max_new_tokens` option fields are accepted but
/// ignored — with whisper.cpp the first two are fixed at build time (GPU
/// support is a compile feature, weights keep their file precision) and
/// output length is bounded by the audio window.
pub struct WhisperBackend;

impl ModelBackend for WhisperBackend {
    fn load(&self, options: &ModelOptions) -> Result<Box<dyn SpeechModel>, ModelError> {
        let path = &options.model_path;

        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            ModelError::NotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        log::info!("whisper: loading model {path_str}");
        if options.device != "cpu" {
            log::debug!(
                "whisper: device hint {:?} ignored (selected at build time)",
                options.device
            );
        }

        let ctx_params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| ModelError::Init(e.to_string()))?;

        Ok(Box::new(WhisperModel {
            ctx,
            options: options.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// WhisperModel
// ---------------------------------------------------------------------------

struct WhisperModel {
    ctx: WhisperContext,
    options: ModelOptions,
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send` and `unsafe impl Sync` in whisper-rs — the model
// weights are read-only after loading.  `ModelOptions` is fully owned.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperModel {}
unsafe impl Sync for WhisperModel {}

impl SpeechModel for WhisperModel {
    fn infer(
        &self,
        samples: &[f32],
        sample_rate: u32,
        language: &str,
    ) -> Result<Transcript, InferError> {
        // whisper.cpp consumes 16 kHz mono only; there is no resampling
        // stage in this pipeline, so reject anything else outright.
        if sample_rate != 16_000 {
            return Err(InferError::Failed(format!(
                "whisper requires 16 kHz input, got {sample_rate} Hz"
            )));
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let hint: Option<&str> = if language == "auto" {
            None
        } else {
            Some(language)
        };
        params.set_language(hint);
        params.set_n_threads(self.options.n_threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);

        // Per-call state: created here, dropped on every return path.
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| classify_whisper_error(&e.to_string()))?;

        state
            .full(params, samples)
            .map_err(|e| classify_whisper_error(&e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| InferError::Failed(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| InferError::Failed(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        // whisper-rs does not expose the detected language through this
        // code path; report the requested hint (matching the configured
        // target language, or "auto").
        Ok(Transcript {
            text: text.trim().to_string(),
            language: language.to_string(),
        })
    }
}

/// Sort a whisper.cpp failure into the recoverable/unrecoverable classes.
///
/// whisper-rs surfaces GGML allocation failures only as message text, so the
/// classification is by message content.
fn classify_whisper_error(message: &str) -> InferError {
    let lower = message.to_lowercase();
    if lower.contains("alloc") || lower.contains("memory") || lower.contains("out of") {
        InferError::ResourceExhausted(message.to_string())
    } else {
        InferError::Failed(message.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
