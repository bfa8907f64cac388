//! Text insertion — clipboard-based paste into the focused window.
//!
//! Raw key-event typing mangles accented and composed characters, so the
//! transcript goes in through the clipboard instead:
//!
//! 1. **Save** the original clipboard content.
//! 2. **Set** the transcript into the clipboard.
//! 3. **Simulate** Ctrl+V (⌘V on macOS) in the focused window.
//! 4. **Restore** the original clipboard content (best-effort).
//!
//! When the paste simulation fails the transcript is deliberately left in
//! the clipboard so the user can paste it by hand — the caller decides how
//! to announce that fallback.

use arboard::Clipboard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use thiserror::Error;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

/// All errors that can surface during text insertion.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.  The transcript is
    /// still in the clipboard.
    #[error("cannot simulate paste: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// TextInjector
// ---------------------------------------------------------------------------

/// Pastes transcripts at the cursor position.
///
/// The delays cover clipboard managers and target apps that react slowly;
/// the defaults work on typical desktops.
#[derive(Debug, Clone)]
pub struct TextInjector {
    /// Milliseconds to wait after setting the clipboard before pasting.
    pub delay_ms: u64,
    /// Milliseconds to wait after pasting before restoring the clipboard.
    pub restore_delay_ms: u64,
}

impl Default for TextInjector {
    fn default() -> Self {
        Self {
            delay_ms: 50,
            restore_delay_ms: 100,
        }
    }
}

impl TextInjector {
    /// Create an injector with the default delays (50 ms / 100 ms).
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `text` at the cursor of the focused window.
    ///
    /// # Errors
    ///
    /// On [`InjectError::KeySimulation`] the text remains in the clipboard
    /// (manual-paste fallback); on clipboard errors nothing was changed.
    pub fn insert(&self, text: &str) -> Result<(), InjectError> {
        let saved = save_clipboard()?;
        set_clipboard(text)?;

        // Let the clipboard manager flush before the target app reads it.
        std::thread::sleep(std::time::Duration::from_millis(self.delay_ms));
        simulate_paste()?;

        // Let the target app finish pasting before the clipboard changes back.
        std::thread::sleep(std::time::Duration::from_millis(self.restore_delay_ms));
        let _ = restore_clipboard(saved);
        Ok(())
    }

    /// Put `text` into the clipboard without pasting (explicit copy action).
    pub fn copy(&self, text: &str) -> Result<(), InjectError> {
        set_clipboard(text)
    }
}

// ---------------------------------------------------------------------------
// Clipboard helpers (arboard)
// ---------------------------------------------------------------------------

/// Capture the current clipboard plain-text content.
///
/// Returns `Ok(None)` when the clipboard is empty or holds non-text data
/// (e.g. an image).
fn save_clipboard() -> Result<Option<String>, InjectError> {
    let mut clipboard = open_clipboard()?;
    // get_text errors on empty or non-text content — both mean None here.
    Ok(clipboard.get_text().ok())
}

fn set_clipboard(text: &str) -> Result<(), InjectError> {
    let mut clipboard = open_clipboard()?;
    clipboard
        .set_text(text)
        .map_err(|e| InjectError::ClipboardSet(e.to_string()))
}

fn restore_clipboard(saved: Option<String>) -> Result<(), InjectError> {
    match saved {
        Some(text) => set_clipboard(&text),
        None => Ok(()),
    }
}

/// A fresh handle per call — `arboard::Clipboard` is not `Send` on all
/// platforms and is cheap to create.
fn open_clipboard() -> Result<Clipboard, InjectError> {
    Clipboard::new().map_err(|e| InjectError::ClipboardAccess(e.to_string()))
}

// ---------------------------------------------------------------------------
// Paste simulation (enigo)
// ---------------------------------------------------------------------------

/// Send the OS paste shortcut to the focused window.
///
/// A new [`Enigo`] instance per call — `Enigo` is not `Send` and is cheap to
/// construct.
fn simulate_paste() -> Result<(), InjectError> {
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| InjectError::KeySimulation(e.to_string()))?;

    #[cfg(target_os = "macos")]
    {
        // macOS: ⌘V
        enigo
            .key(Key::Meta, Direction::Press)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        enigo
            .key(Key::Unicode('v'), Direction::Click)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        enigo
            .key(Key::Meta, Direction::Release)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
    }

    #[cfg(not(target_os = "macos"))]
    {
        // Windows / Linux: Ctrl+V
        enigo
            .key(Key::Control, Direction::Press)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        enigo
            .key(Key::Unicode('v'), Direction::Click)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        enigo
            .key(Key::Control, Direction::Release)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
