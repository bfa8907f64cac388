//! Debounced press/release edge detection for the push-to-talk key.
//!
//! The OS delivers many key-down events for one physical press (key repeat).
//! [`HotkeyEdgeDetector`] collapses that stream into exactly one
//! [`EdgeHandler::on_press`] per physical press and one
//! [`EdgeHandler::on_release`] per physical release, and dispatches each
//! callback on the tokio blocking pool so the event source thread is never
//! held up by a slow handler.
//!
//! # Disable gate
//!
//! [`disable`](HotkeyEdgeDetector::disable) suppresses callback dispatch but
//! the pressed-state tracking keeps following the physical key.  Re-enabling
//! while the key is still held therefore cannot fire a spurious press: the
//! next press edge only fires after a genuine release + press cycle.  A
//! release that lands just after re-enabling is dispatched; downstream
//! treats a release with no active recording as a no-op.

use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::TriggerKey;

// ---------------------------------------------------------------------------
// KeyTransition
// ---------------------------------------------------------------------------

/// Direction of a raw key event as delivered by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    /// Key went (or stayed, under repeat) down.
    Down,
    /// Key went up.
    Up,
}

// ---------------------------------------------------------------------------
// EdgeHandler
// ---------------------------------------------------------------------------

/// Receiver of debounced press/release edges.
///
/// Implementations must be `Send + Sync`; callbacks arrive on blocking-pool
/// worker threads in edge order, but two callbacks may overlap in time when
/// a handler is slow.  Panics inside a handler are caught and logged.
pub trait EdgeHandler: Send + Sync {
    /// Called once per physical press of the trigger key.
    fn on_press(&self);
    /// Called once per physical release of the trigger key.
    fn on_release(&self);
}

// ---------------------------------------------------------------------------
// HotkeyEdgeDetector
// ---------------------------------------------------------------------------

/// Converts a raw key-event stream into debounced push-to-talk edges.
///
/// [`handle_event`](Self::handle_event) is called synchronously from the
/// event source thread and stays cheap: a key comparison plus one atomic
/// compare-exchange.  All handler work happens on dispatched workers.
pub struct HotkeyEdgeDetector {
    trigger: TriggerKey,
    /// Tracks the physical key state; updated even while disabled.
    pressed: AtomicBool,
    /// Gate for callback dispatch only.
    enabled: AtomicBool,
    handler: Arc<dyn EdgeHandler>,
    runtime: tokio::runtime::Handle,
}

impl HotkeyEdgeDetector {
    /// Create a detector for `trigger` dispatching edges to `handler` via
    /// `runtime`'s blocking pool.
    pub fn new(
        trigger: TriggerKey,
        handler: Arc<dyn EdgeHandler>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            trigger,
            pressed: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            handler,
            runtime,
        }
    }

    /// Feed one raw key event from the event source.
    ///
    /// Non-trigger keys are ignored.  Repeated `Down` events while the key
    /// is already pressed (OS key repeat) emit nothing; likewise a stray
    /// `Up` with no preceding press.
    pub fn handle_event(&self, key: rdev::Key, transition: KeyTransition) {
        if !self.trigger.matches(key) {
            return;
        }

        // The compare-exchange both debounces and keeps the pressed flag
        // tracking the physical key while dispatch is disabled.
        let edge = match transition {
            KeyTransition::Down => self
                .pressed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
                .then_some(true),
            KeyTransition::Up => self
                .pressed
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
                .then_some(false),
        };

        let Some(is_press) = edge else { return };

        if !self.enabled.load(Ordering::Acquire) {
            return;
        }

        self.dispatch(is_press);
    }

    /// Resume dispatching edges to the handler.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Stop dispatching edges; pressed-state tracking continues.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Returns `true` when edge dispatch is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Fire-and-forget dispatch of one edge callback on the blocking pool.
    fn dispatch(&self, is_press: bool) {
        let handler = Arc::clone(&self.handler);
        self.runtime.spawn_blocking(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                if is_press {
                    handler.on_press();
                } else {
                    handler.on_release();
                }
            }));
            if result.is_err() {
                let edge = if is_press { "press" } else { "release" };
                log::error!("hotkey: {edge} handler panicked");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
