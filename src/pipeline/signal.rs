//! Session signals and their subscriber registry.
//!
//! The core emits a small, fixed vocabulary of events; UI, notification and
//! sound collaborators subscribe to the ones they care about.  Having no
//! subscriber for a signal is a valid no-op, never an error, and a panicking
//! subscriber is logged without disturbing the session.

use std::panic::AssertUnwindSafe;
use std::sync::RwLock;

// ---------------------------------------------------------------------------
// FinalTranscript
// ---------------------------------------------------------------------------

/// The finished product of one session, carried by
/// [`SessionSignal::Finalized`] and handed to the transcript sink.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTranscript {
    /// Corrected transcript text.
    pub text: String,
    /// Language tag reported by the model (or the configured hint).
    pub language: String,
    /// Wall-clock recording duration in seconds.
    pub duration_secs: f32,
    /// Number of whitespace-separated words in `text`.
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// SessionSignal
// ---------------------------------------------------------------------------

/// Everything the session controller can tell the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    /// A press arrived before the model finished loading.
    NotReady,
    /// A press arrived while a previous session was still processing.
    AlreadyProcessing,
    /// The recording was shorter than the configured minimum.
    TooShort { duration_secs: f32 },
    /// The recording contained no audio chunks at all.
    NoAudio,
    /// Inference succeeded but produced no usable text.
    EmptyTranscript,
    /// The session failed; `reason` is human-readable.
    Error { reason: String },
    /// The session completed; the transcript has been stored.
    Finalized(FinalTranscript),
}

impl SessionSignal {
    /// Stable name of the signal, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionSignal::NotReady => "notReady",
            SessionSignal::AlreadyProcessing => "alreadyProcessing",
            SessionSignal::TooShort { .. } => "tooShort",
            SessionSignal::NoAudio => "noAudio",
            SessionSignal::EmptyTranscript => "emptyTranscript",
            SessionSignal::Error { .. } => "error",
            SessionSignal::Finalized(_) => "finalized",
        }
    }
}

// ---------------------------------------------------------------------------
// SignalHub
// ---------------------------------------------------------------------------

type Subscriber = Box<dyn Fn(&SessionSignal) + Send + Sync>;

/// Subscriber registry for [`SessionSignal`]s.
///
/// Emission happens on whichever thread performs the state transition, so
/// subscribers must be quick or hand off to their own queue.
pub struct SignalHub {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl SignalHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a subscriber for all signals.  Subscribers filter on the
    /// variants they care about.
    pub fn subscribe(&self, f: impl Fn(&SessionSignal) + Send + Sync + 'static) {
        self.subscribers.write().unwrap().push(Box::new(f));
    }

    /// Deliver `signal` to every subscriber.  Subscriber panics are caught
    /// and logged — a broken listener never aborts a session.
    pub fn emit(&self, signal: SessionSignal) {
        log::debug!("signal: {}", signal.name());
        for subscriber in self.subscribers.read().unwrap().iter() {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| subscriber(&signal)));
            if result.is_err() {
                log::error!("signal: subscriber panicked on {}", signal.name());
            }
        }
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_with_no_subscribers_is_a_noop() {
        let hub = SignalHub::new();
        hub.emit(SessionSignal::NoAudio); // must not panic
    }

    #[test]
    fn all_subscribers_receive_every_signal() {
        let hub = SignalHub::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = Arc::clone(&count);
            hub.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        hub.emit(SessionSignal::NotReady);
        hub.emit(SessionSignal::EmptyTranscript);
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let hub = SignalHub::new();
        let reached = Arc::new(AtomicUsize::new(0));

        hub.subscribe(|_| panic!("broken listener"));
        {
            let reached = Arc::clone(&reached);
            hub.subscribe(move |_| {
                reached.fetch_add(1, Ordering::SeqCst);
            });
        }

        hub.emit(SessionSignal::NoAudio);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn signal_names_are_stable() {
        assert_eq!(SessionSignal::NotReady.name(), "notReady");
        assert_eq!(SessionSignal::AlreadyProcessing.name(), "alreadyProcessing");
        assert_eq!(
            SessionSignal::TooShort { duration_secs: 0.1 }.name(),
            "tooShort"
        );
        assert_eq!(SessionSignal::NoAudio.name(), "noAudio");
        assert_eq!(SessionSignal::EmptyTranscript.name(), "emptyTranscript");
        assert_eq!(
            SessionSignal::Error { reason: "x".into() }.name(),
            "error"
        );
    }
}
