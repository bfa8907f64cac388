//! Push-to-talk hotkey handling.
//!
//! # Design
//!
//! The raw key-event source ([`KeyListener`], backed by `rdev`) knows nothing
//! about edges: it forwards every `(key, down/up)` pair to the
//! [`HotkeyEdgeDetector`], which compares the key against the configured
//! [`TriggerKey`], collapses OS key-repeat into single press/release edges,
//! and dispatches each edge to an [`EdgeHandler`] on its own worker so a slow
//! handler never blocks the event source.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxkey::hotkey::{EdgeHandler, HotkeyEdgeDetector, KeyListener, TriggerKey};
//!
//! struct PrintHandler;
//! impl EdgeHandler for PrintHandler {
//!     fn on_press(&self) { println!("press"); }
//!     fn on_release(&self) { println!("release"); }
//! }
//!
//! # fn wire(runtime: tokio::runtime::Handle) {
//! let key = TriggerKey::parse("f2").expect("unknown key");
//! let detector = Arc::new(HotkeyEdgeDetector::new(key, Arc::new(PrintHandler), runtime));
//! let _listener = KeyListener::start(Arc::clone(&detector));
//! # }
//! ```

pub mod detector;
pub mod listener;

pub use detector::{EdgeHandler, HotkeyEdgeDetector, KeyTransition};
pub use listener::KeyListener;

// ---------------------------------------------------------------------------
// TriggerKey
// ---------------------------------------------------------------------------

/// The configured push-to-talk key, resolved once at startup.
///
/// Wraps an [`rdev::Key`] so the rest of the crate never matches on raw key
/// codes.  Immutable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerKey(rdev::Key);

impl TriggerKey {
    /// Parse a key name from a config string.
    ///
    /// Accepts lower- or mixed-case names: function keys (`"f2"`), modifier
    /// and navigation keys (`"ctrl"`, `"space"`, `"esc"`), and single ASCII
    /// letters.  Returns `None` for unrecognised names so callers can fall
    /// back to a default or surface a configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxkey::hotkey::TriggerKey;
    ///
    /// assert!(TriggerKey::parse("f2").is_some());
    /// assert!(TriggerKey::parse("Ctrl").is_some());
    /// assert!(TriggerKey::parse("xyz").is_none());
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        use rdev::Key;

        let key = match name.to_ascii_lowercase().as_str() {
            // Function keys
            "f1" => Key::F1,
            "f2" => Key::F2,
            "f3" => Key::F3,
            "f4" => Key::F4,
            "f5" => Key::F5,
            "f6" => Key::F6,
            "f7" => Key::F7,
            "f8" => Key::F8,
            "f9" => Key::F9,
            "f10" => Key::F10,
            "f11" => Key::F11,
            "f12" => Key::F12,

            // Modifiers / named keys
            "ctrl" | "control" => Key::ControlLeft,
            "alt" => Key::Alt,
            "shift" => Key::ShiftLeft,
            "space" => Key::Space,
            "enter" | "return" => Key::Return,
            "tab" => Key::Tab,
            "escape" | "esc" => Key::Escape,
            "capslock" => Key::CapsLock,

            // Letter keys
            "a" => Key::KeyA,
            "b" => Key::KeyB,
            "c" => Key::KeyC,
            "d" => Key::KeyD,
            "e" => Key::KeyE,
            "f" => Key::KeyF,
            "g" => Key::KeyG,
            "h" => Key::KeyH,
            "i" => Key::KeyI,
            "j" => Key::KeyJ,
            "k" => Key::KeyK,
            "l" => Key::KeyL,
            "m" => Key::KeyM,
            "n" => Key::KeyN,
            "o" => Key::KeyO,
            "p" => Key::KeyP,
            "q" => Key::KeyQ,
            "r" => Key::KeyR,
            "s" => Key::KeyS,
            "t" => Key::KeyT,
            "u" => Key::KeyU,
            "v" => Key::KeyV,
            "w" => Key::KeyW,
            "x" => Key::KeyX,
            "y" => Key::KeyY,
            "z" => Key::KeyZ,

            _ => return None,
        };

        Some(Self(key))
    }

    /// Parse `name`, falling back to F2 (the default binding) with a warning
    /// when the name is unrecognised.
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            log::warn!("hotkey: unknown trigger key {name:?}, falling back to f2");
            Self(rdev::Key::F2)
        })
    }

    /// Returns `true` when `key` is this trigger key.
    pub fn matches(&self, key: rdev::Key) -> bool {
        self.0 == key
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
