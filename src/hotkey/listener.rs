//! Dedicated OS-thread key-event source using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`KeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! The listener performs no edge logic at all — every key press/release it
//! sees is forwarded to the [`HotkeyEdgeDetector`], which does the trigger
//! comparison and debouncing.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself remains
//! blocked in the rdev event loop until the process exits.  This is safe —
//! rdev holds no resources that need explicit cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::detector::{HotkeyEdgeDetector, KeyTransition};

// ---------------------------------------------------------------------------
// KeyListener
// ---------------------------------------------------------------------------

/// Handle to a running key-listener thread.
///
/// Construct one with [`KeyListener::start`].  Drop it to stop forwarding
/// events.
pub struct KeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// The thread handle.  Kept alive so the thread is not detached
    /// prematurely; we never `join` it because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyListener {
    /// Spawn a dedicated OS thread that listens for global key events and
    /// forwards each one to `detector`.
    ///
    /// [`HotkeyEdgeDetector::handle_event`] is cheap (one comparison plus an
    /// atomic), so calling it directly from the rdev callback keeps the
    /// event source responsive.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(detector: Arc<HotkeyEdgeDetector>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("key-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    // Bail out if the listener has been stopped.
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    match event.event_type {
                        rdev::EventType::KeyPress(key) => {
                            detector.handle_event(key, KeyTransition::Down);
                        }
                        rdev::EventType::KeyRelease(key) => {
                            detector.handle_event(key, KeyTransition::Up);
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("key-listener: rdev::listen exited with error: {e:?}");
                }
            })
            .expect("failed to spawn key-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for KeyListener {
    /// Set the stop flag so the rdev callback stops forwarding events.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread continues to exist blocked inside rdev::listen until
        // the process exits; no further cleanup is possible or needed.
    }
}
