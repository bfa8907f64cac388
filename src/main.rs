//! Application entry point — voxkey push-to-talk dictation.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Load the correction dictionary and open the transcript history
//!    (running the retention sweep).
//! 5. Build the [`TranscriptionService`] over the Whisper backend and the
//!    [`SessionController`] with its signal subscribers.
//! 6. Spawn the rdev key-listener thread and start the cpal capture stream.
//! 7. Kick off the background model load.
//! 8. Block until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use voxkey::{
    audio::{forward_chunks, AudioCapture, CaptureBuffer},
    config::{AppConfig, AppPaths},
    correct::Dictionary,
    hotkey::{HotkeyEdgeDetector, KeyListener, TriggerKey},
    inject::TextInjector,
    pipeline::{SessionController, SessionSignal, SignalHub},
    store::{HistoryStore, TranscriptSink},
    stt::{ModelOptions, TranscriptionService, WhisperBackend},
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voxkey starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();

    // 3. Tokio runtime (edge handlers + model load + session processing all
    //    run on its blocking pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4a. Correction dictionary
    let dictionary = Dictionary::open(paths.dictionary_file.clone());
    let corrector = Arc::new(dictionary.load_engine());

    // 4b. Transcript history + retention sweep
    let store = Arc::new(HistoryStore::open(&paths.history_file)?);
    let removed = store.sweep_older_than(config.storage.retention_days);
    if removed > 0 {
        log::info!("history: removed {removed} record(s) past retention");
    }

    // 5a. Transcription service over the Whisper backend
    let options = ModelOptions::from_config(&config.model, &paths);
    let service = Arc::new(TranscriptionService::new(
        Arc::new(WhisperBackend),
        options,
        rt.handle().clone(),
    ));
    {
        let key_name = config.hotkey.trigger_key.clone();
        service.subscribe_ready(move || {
            log::info!("model ready — hold {key_name:?} to dictate");
        });
        service.subscribe_error(|reason| {
            log::error!("model load failed: {reason}");
        });
    }

    // 5b. Session controller + signal subscribers
    let buffer = Arc::new(CaptureBuffer::new(config.min_duration()));
    let signals = Arc::new(SignalHub::new());

    let injector = TextInjector::new();
    signals.subscribe(move |signal| match signal {
        SessionSignal::Finalized(transcript) => {
            if let Err(e) = injector.insert(&transcript.text) {
                log::warn!("inject: paste failed ({e}); transcript left in clipboard");
            }
        }
        SessionSignal::NotReady => log::warn!("model still loading, try again shortly"),
        SessionSignal::AlreadyProcessing => {
            log::warn!("previous dictation still processing")
        }
        SessionSignal::TooShort { duration_secs } => {
            log::info!("recording too short ({duration_secs:.2}s), hold the key longer")
        }
        SessionSignal::NoAudio => log::warn!("no audio captured — is the microphone working?"),
        SessionSignal::EmptyTranscript => log::info!("nothing recognised"),
        SessionSignal::Error { reason } => log::error!("dictation failed: {reason}"),
    });

    let controller = Arc::new(SessionController::new(
        Arc::clone(&buffer),
        Arc::clone(&service),
        corrector,
        Arc::clone(&store) as Arc<dyn TranscriptSink>,
        Arc::clone(&signals),
        rt.handle().clone(),
    ));

    // 6a. Hotkey listener thread
    let trigger = TriggerKey::parse_or_default(&config.hotkey.trigger_key);
    let detector = Arc::new(HotkeyEdgeDetector::new(
        trigger,
        controller,
        rt.handle().clone(),
    ));
    let _listener = KeyListener::start(Arc::clone(&detector));

    // 6b. cpal capture stream → forwarder → capture buffer
    let (chunk_tx, chunk_rx) = std::sync::mpsc::channel();
    let _stream = match AudioCapture::new(config.audio.sample_rate, config.audio.channels) {
        Ok(capture) => match capture.start(chunk_tx) {
            Ok(handle) => {
                log::info!(
                    "audio capture started ({} Hz, {} ch)",
                    capture.sample_rate(),
                    capture.channels()
                );
                Some(handle)
            }
            Err(e) => {
                log::warn!("failed to start audio stream: {e}");
                None
            }
        },
        Err(e) => {
            log::warn!("audio capture unavailable: {e}");
            None
        }
    };
    let _forwarder = forward_chunks(
        chunk_rx,
        Arc::clone(&buffer),
        Duration::from_secs_f32(config.audio.max_duration_secs.max(0.0)),
    );

    // 7. Background model load
    log::info!("loading model in background…");
    service.load_async();

    // 8. Run until interrupted
    rt.block_on(tokio::signal::ctrl_c())?;
    log::info!("shutting down");
    Ok(())
}
