//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + dictionary):
//!   Windows: %APPDATA%\voxkey\
//!   macOS:   ~/Library/Application Support/voxkey/
//!   Linux:   ~/.config/voxkey/
//!
//! Data dir (models + transcript history):
//!   Windows: %LOCALAPPDATA%\voxkey\
//!   macOS:   ~/Library/Application Support/voxkey/
//!   Linux:   ~/.local/share/voxkey/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `dictionary.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `dictionary.json` (custom correction rules).
    pub dictionary_file: PathBuf,
    /// Directory for downloaded model files.
    pub models_dir: PathBuf,
    /// Full path to `history.jsonl` (transcript record log).
    pub history_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voxkey";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let dictionary_file = config_dir.join("dictionary.json");
        let models_dir = data_dir.join("models");
        let history_file = data_dir.join("history.jsonl");

        Self {
            config_dir,
            settings_file,
            dictionary_file,
            models_dir,
            history_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
