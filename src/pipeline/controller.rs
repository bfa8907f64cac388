//! Session orchestrator — drives the press → record → transcribe → correct
//! → finalize cycle.
//!
//! [`SessionController`] is the [`EdgeHandler`] behind the hotkey detector.
//! Edge callbacks arrive on blocking-pool workers and must return promptly,
//! so the release path only validates the recording and then hands the slow
//! work (inference + correction) to another worker.
//!
//! # Pipeline flow
//!
//! ```text
//! on_press
//!   ├─ model not Ready        → signal notReady, stay Idle
//!   ├─ still processing       → signal alreadyProcessing, stay Idle
//!   └─ buffer.start()         → Recording
//!
//! on_release (ignored unless Recording)
//!   └─ buffer.stop()
//!        ├─ no audio          → signal noAudio, Idle
//!        ├─ too short         → signal tooShort, Idle
//!        └─ valid             → Processing, spawn worker:
//!             infer ──err──▶ signal error, Idle
//!               └─ empty text → signal emptyTranscript, Idle
//!               └─ correct → sink.insert → signal finalized, Idle
//! ```
//!
//! # Concurrency guard
//!
//! `processing` is set when entering `Processing` and cleared only after the
//! completion signal has been emitted, so a press can never start a second
//! transcription before the first one's outcome was observable.  At most one
//! session exists at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{CaptureBuffer, RecordingResult, Validity};
use crate::correct::CorrectionEngine;
use crate::hotkey::EdgeHandler;
use crate::store::TranscriptSink;
use crate::stt::TranscriptionService;

use super::signal::{FinalTranscript, SessionSignal, SignalHub};
use super::state::SessionPhase;

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Orchestrates one push-to-talk session at a time.
///
/// Construct with [`SessionController::new`], wrap in an `Arc`, and hand it
/// to the [`HotkeyEdgeDetector`](crate::hotkey::HotkeyEdgeDetector) as its
/// edge handler.
pub struct SessionController {
    buffer: Arc<CaptureBuffer>,
    service: Arc<TranscriptionService>,
    corrector: Arc<CorrectionEngine>,
    sink: Arc<dyn TranscriptSink>,
    signals: Arc<SignalHub>,
    phase: Arc<Mutex<SessionPhase>>,
    /// Set while a transcription worker is in flight; rejects new presses.
    processing: Arc<AtomicBool>,
    runtime: tokio::runtime::Handle,
}

impl SessionController {
    pub fn new(
        buffer: Arc<CaptureBuffer>,
        service: Arc<TranscriptionService>,
        corrector: Arc<CorrectionEngine>,
        sink: Arc<dyn TranscriptSink>,
        signals: Arc<SignalHub>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            buffer,
            service,
            corrector,
            sink,
            signals,
            phase: Arc::new(Mutex::new(SessionPhase::Idle)),
            processing: Arc::new(AtomicBool::new(false)),
            runtime,
        }
    }

    /// Current phase (for status display and tests).
    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap()
    }

    /// Returns `true` while a transcription worker is in flight.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Edge handling
    // -----------------------------------------------------------------------

    fn handle_press(&self) {
        if !self.service.is_ready() {
            log::info!("session: press rejected, model not ready");
            self.signals.emit(SessionSignal::NotReady);
            return;
        }

        if self.processing.load(Ordering::Acquire) {
            log::info!("session: press rejected, still processing");
            self.signals.emit(SessionSignal::AlreadyProcessing);
            return;
        }

        let mut phase = self.phase.lock().unwrap();
        if *phase != SessionPhase::Idle {
            return;
        }

        match self.buffer.start() {
            Ok(()) => {
                log::debug!("session: recording started");
                *phase = SessionPhase::Recording;
            }
            Err(e) => {
                log::warn!("session: capture start failed: {e}");
            }
        }
    }

    fn handle_release(&self) {
        let mut phase = self.phase.lock().unwrap();
        if *phase != SessionPhase::Recording {
            return;
        }

        let Some(recording) = self.buffer.stop() else {
            *phase = SessionPhase::Idle;
            return;
        };

        match recording.validity {
            Validity::NoAudio => {
                log::info!("session: no audio captured");
                *phase = SessionPhase::Idle;
                drop(phase);
                self.signals.emit(SessionSignal::NoAudio);
            }
            Validity::TooShort => {
                let duration_secs = recording.duration.as_secs_f32();
                log::info!("session: recording too short ({duration_secs:.2}s)");
                *phase = SessionPhase::Idle;
                drop(phase);
                self.signals.emit(SessionSignal::TooShort { duration_secs });
            }
            Validity::Valid => {
                *phase = SessionPhase::Processing;
                self.processing.store(true, Ordering::Release);
                drop(phase);
                self.dispatch_processing(recording);
            }
        }
    }

    /// Hand the slow transcription + correction work to a worker.
    fn dispatch_processing(&self, recording: RecordingResult) {
        let service = Arc::clone(&self.service);
        let corrector = Arc::clone(&self.corrector);
        let sink = Arc::clone(&self.sink);
        let signals = Arc::clone(&self.signals);
        let phase = Arc::clone(&self.phase);
        let processing = Arc::clone(&self.processing);

        self.runtime.spawn_blocking(move || {
            process_session(&recording, &service, &corrector, &sink, &signals);
            // The completion signal is out; only now may a new press start.
            *phase.lock().unwrap() = SessionPhase::Idle;
            processing.store(false, Ordering::Release);
        });
    }
}

impl EdgeHandler for SessionController {
    fn on_press(&self) {
        self.handle_press();
    }

    fn on_release(&self) {
        self.handle_release();
    }
}

// ---------------------------------------------------------------------------
// Processing worker
// ---------------------------------------------------------------------------

/// Transcribe, correct and finalize one valid recording.  Every outcome
/// emits exactly one signal.
fn process_session(
    recording: &RecordingResult,
    service: &TranscriptionService,
    corrector: &CorrectionEngine,
    sink: &Arc<dyn TranscriptSink>,
    signals: &SignalHub,
) {
    let transcript = match service.infer(&recording.samples, recording.sample_rate) {
        Ok(transcript) => transcript,
        Err(e) => {
            log::error!("session: inference failed: {e}");
            signals.emit(SessionSignal::Error {
                reason: e.to_string(),
            });
            return;
        }
    };

    let raw = transcript.text.trim();
    if raw.is_empty() {
        log::info!("session: empty transcript");
        signals.emit(SessionSignal::EmptyTranscript);
        return;
    }

    let corrected = corrector.apply(raw);
    let finalized = FinalTranscript {
        word_count: corrected.split_whitespace().count(),
        text: corrected,
        language: transcript.language,
        duration_secs: recording.duration.as_secs_f32(),
    };

    let id = sink.insert(&finalized);
    log::info!(
        "session: finalized record {id:?} ({} word(s), {:.2}s)",
        finalized.word_count,
        finalized.duration_secs
    );
    signals.emit(SessionSignal::Finalized(finalized));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use crate::stt::{InferError, MockBackend, MockModel, ModelOptions, SpeechModel, Transcript};
    use crate::store::RecordId;
    use std::collections::HashMap;
    use std::sync::mpsc;
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Sink that records every insert.
    struct RecordingSink {
        records: Mutex<Vec<FinalTranscript>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    impl TranscriptSink for RecordingSink {
        fn insert(&self, transcript: &FinalTranscript) -> RecordId {
            let mut records = self.records.lock().unwrap();
            records.push(transcript.clone());
            RecordId(records.len() as u64 - 1)
        }
    }

    /// Model that blocks inside `infer` until the test releases it.
    struct GatedModel {
        started: std::sync::Mutex<mpsc::Sender<()>>,
        gate: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl SpeechModel for GatedModel {
        fn infer(
            &self,
            _samples: &[f32],
            _sample_rate: u32,
            language: &str,
        ) -> Result<Transcript, InferError> {
            self.started.lock().unwrap().send(()).unwrap();
            self.gate
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))
                .expect("gate never opened");
            Ok(Transcript {
                text: "bonjour le monde".into(),
                language: language.into(),
            })
        }
    }

    /// Adapter sharing one `Arc<MockModel>` between test and service.
    struct SharedModel(Arc<MockModel>);

    impl SpeechModel for SharedModel {
        fn infer(
            &self,
            samples: &[f32],
            sample_rate: u32,
            language: &str,
        ) -> Result<Transcript, InferError> {
            self.0.infer(samples, sample_rate, language)
        }
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    struct Harness {
        /// Kept alive so blocking-pool workers can run to completion.
        _rt: tokio::runtime::Runtime,
        controller: Arc<SessionController>,
        buffer: Arc<CaptureBuffer>,
        sink: Arc<RecordingSink>,
        signals_rx: mpsc::Receiver<SessionSignal>,
    }

    impl Harness {
        /// Build a controller around `backend`, optionally loading the model
        /// to Ready before returning.
        fn build(
            backend: MockBackend,
            rules: &[(&str, &str)],
            min_duration: Duration,
            load: bool,
        ) -> Self {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("test runtime");

            let service = Arc::new(TranscriptionService::new(
                Arc::new(backend),
                ModelOptions::for_tests(),
                rt.handle().clone(),
            ));

            if load {
                let (tx, rx) = mpsc::channel();
                service.subscribe_ready(move || {
                    let _ = tx.send(());
                });
                service.load_async();
                rx.recv_timeout(Duration::from_secs(5)).expect("model load");
            }

            let rule_map: HashMap<String, String> = rules
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();

            let buffer = Arc::new(CaptureBuffer::new(min_duration));
            let sink = RecordingSink::new();
            let signals = Arc::new(SignalHub::new());

            let (signal_tx, signals_rx) = mpsc::channel();
            signals.subscribe(move |signal| {
                let _ = signal_tx.send(signal.clone());
            });

            let controller = Arc::new(SessionController::new(
                Arc::clone(&buffer),
                Arc::clone(&service),
                Arc::new(CorrectionEngine::with_rules(rule_map)),
                Arc::clone(&sink) as Arc<dyn TranscriptSink>,
                signals,
                rt.handle().clone(),
            ));

            Self {
                _rt: rt,
                controller,
                buffer,
                sink,
                signals_rx,
            }
        }

        fn ready(backend: MockBackend, rules: &[(&str, &str)]) -> Self {
            Self::build(backend, rules, Duration::ZERO, true)
        }

        fn append_seconds(&self, secs: usize) {
            self.buffer.append(&AudioChunk {
                samples: vec![0.25; 16_000 * secs],
                sample_rate: 16_000,
                channels: 1,
            });
        }

        fn next_signal(&self) -> SessionSignal {
            self.signals_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("signal timed out")
        }

        fn assert_no_signal(&self) {
            assert!(
                self.signals_rx
                    .recv_timeout(Duration::from_millis(200))
                    .is_err(),
                "unexpected signal emitted"
            );
        }

        /// Wait for the processing flag to clear after the completion signal.
        fn wait_idle(&self) {
            for _ in 0..1_000 {
                if !self.controller.is_processing()
                    && self.controller.phase() == SessionPhase::Idle
                {
                    return;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            panic!("controller never returned to Idle");
        }
    }

    // -----------------------------------------------------------------------
    // Readiness / guard rejection
    // -----------------------------------------------------------------------

    #[test]
    fn press_before_model_ready_signals_not_ready() {
        let h = Harness::build(MockBackend::ok("texte"), &[], Duration::ZERO, false);

        h.controller.on_press();

        assert_eq!(h.next_signal(), SessionSignal::NotReady);
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert!(!h.buffer.is_active());
    }

    #[test]
    fn press_while_processing_is_rejected_without_second_session() {
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let started_tx = std::sync::Mutex::new(Some(started_tx));
        let gate_rx = std::sync::Mutex::new(Some(gate_rx));
        let backend = MockBackend::with(move || {
            Ok(Box::new(GatedModel {
                started: std::sync::Mutex::new(
                    started_tx.lock().unwrap().take().expect("single model"),
                ),
                gate: std::sync::Mutex::new(gate_rx.lock().unwrap().take().expect("single model")),
            }) as Box<dyn SpeechModel>)
        });
        let h = Harness::ready(backend, &[]);

        h.controller.on_press();
        h.append_seconds(1);
        h.controller.on_release();

        // Inference is now in flight.
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("inference never started");
        assert_eq!(h.controller.phase(), SessionPhase::Processing);

        // A press during Processing must be rejected without touching the buffer.
        h.controller.on_press();
        assert_eq!(h.next_signal(), SessionSignal::AlreadyProcessing);
        assert!(!h.buffer.is_active());

        // Let the first session finish: exactly one finalized transcript.
        gate_tx.send(()).unwrap();
        assert!(matches!(h.next_signal(), SessionSignal::Finalized(_)));
        h.assert_no_signal();
        h.wait_idle();
        assert_eq!(h.sink.count(), 1);

        // And a fresh press works again.
        h.controller.on_press();
        assert_eq!(h.controller.phase(), SessionPhase::Recording);
    }

    #[test]
    fn release_without_recording_is_a_noop() {
        let h = Harness::ready(MockBackend::ok("texte"), &[]);

        h.controller.on_release();

        h.assert_no_signal();
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
    }

    // -----------------------------------------------------------------------
    // Duration gate
    // -----------------------------------------------------------------------

    #[test]
    fn too_short_recording_skips_inference() {
        let model = Arc::new(MockModel::ok("jamais"));
        let model_clone = Arc::clone(&model);
        let backend = MockBackend::with(move || {
            Ok(Box::new(SharedModel(Arc::clone(&model_clone))) as Box<dyn SpeechModel>)
        });
        // Minimum far above anything the test can reach.
        let h = Harness::build(backend, &[], Duration::from_secs(10), true);

        h.controller.on_press();
        h.append_seconds(1);
        h.controller.on_release();

        match h.next_signal() {
            SessionSignal::TooShort { duration_secs } => assert!(duration_secs < 10.0),
            other => panic!("expected tooShort, got {other:?}"),
        }
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.sink.count(), 0);
    }

    #[test]
    fn empty_recording_signals_no_audio() {
        let h = Harness::ready(MockBackend::ok("texte"), &[]);

        h.controller.on_press();
        h.controller.on_release();

        assert_eq!(h.next_signal(), SessionSignal::NoAudio);
        assert_eq!(h.controller.phase(), SessionPhase::Idle);
        assert_eq!(h.sink.count(), 0);
    }

    // -----------------------------------------------------------------------
    // Happy path
    // -----------------------------------------------------------------------

    #[test]
    fn full_session_finalizes_corrected_transcript() {
        let h = Harness::ready(
            MockBackend::ok("bonjour le monde"),
            &[("bonjour", "Bonjour")],
        );

        h.controller.on_press();
        assert_eq!(h.controller.phase(), SessionPhase::Recording);
        for _ in 0..3 {
            h.append_seconds(1);
        }
        h.controller.on_release();

        match h.next_signal() {
            SessionSignal::Finalized(finalized) => {
                assert_eq!(finalized.text, "Bonjour le monde");
                assert_eq!(finalized.word_count, 3);
                assert_eq!(finalized.language, "fr");
            }
            other => panic!("expected finalized, got {other:?}"),
        }

        h.wait_idle();
        assert_eq!(h.sink.count(), 1);
        let stored = &h.sink.records.lock().unwrap()[0];
        assert_eq!(stored.text, "Bonjour le monde");
    }

    // -----------------------------------------------------------------------
    // Failure paths
    // -----------------------------------------------------------------------

    #[test]
    fn inference_failure_signals_error_and_recovers() {
        let backend = MockBackend::with(|| {
            Ok(Box::new(MockModel::err(InferError::Failed("décodage".into())))
                as Box<dyn SpeechModel>)
        });
        let h = Harness::ready(backend, &[]);

        h.controller.on_press();
        h.append_seconds(1);
        h.controller.on_release();

        match h.next_signal() {
            SessionSignal::Error { reason } => assert!(reason.contains("décodage")),
            other => panic!("expected error, got {other:?}"),
        }
        h.wait_idle();
        assert_eq!(h.sink.count(), 0);

        // The next press starts a fresh session.
        h.controller.on_press();
        assert_eq!(h.controller.phase(), SessionPhase::Recording);
    }

    #[test]
    fn resource_exhaustion_surfaces_and_allows_retry() {
        let backend = MockBackend::with(|| {
            Ok(
                Box::new(MockModel::err(InferError::ResourceExhausted("vram".into())))
                    as Box<dyn SpeechModel>,
            )
        });
        let h = Harness::ready(backend, &[]);

        h.controller.on_press();
        h.append_seconds(1);
        h.controller.on_release();

        assert!(matches!(h.next_signal(), SessionSignal::Error { .. }));
        h.wait_idle();

        h.controller.on_press();
        assert_eq!(h.controller.phase(), SessionPhase::Recording);
    }

    #[test]
    fn whitespace_only_transcript_signals_empty() {
        let h = Harness::ready(MockBackend::ok("   \n  "), &[("x", "y")]);

        h.controller.on_press();
        h.append_seconds(1);
        h.controller.on_release();

        assert_eq!(h.next_signal(), SessionSignal::EmptyTranscript);
        h.wait_idle();
        assert_eq!(h.sink.count(), 0);
    }
}
