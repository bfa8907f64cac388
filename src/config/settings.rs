//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and the recording duration gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate requested from the capture device, in Hz.
    pub sample_rate: u32,
    /// Number of capture channels requested from the device.
    pub channels: u16,
    /// Minimum recording length in seconds; shorter sessions are discarded
    /// without transcription.
    pub min_duration_secs: f32,
    /// Maximum recording length in seconds; the capture source stops
    /// producing chunks past this point.
    pub max_duration_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            min_duration_secs: 0.5,
            max_duration_secs: 300.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Settings for the transcription model backend.
///
/// `device`, `dtype` and `max_new_tokens` are handed to the backend
/// unmodified; backends that have no use for a field ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name / file stem resolved under the models directory
    /// (e.g. `"ggml-small"`).
    pub model: String,
    /// Inference device hint (e.g. `"cpu"`, `"cuda:0"`).
    pub device: String,
    /// Weight precision hint (e.g. `"float16"`, `"bfloat16"`).
    pub dtype: String,
    /// Maximum number of new text tokens per inference.
    pub max_new_tokens: u32,
    /// ISO-639-1 language hint (e.g. `"fr"`), or `"auto"` for detection.
    pub language: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "ggml-small".into(),
            device: "cpu".into(),
            dtype: "float16".into(),
            max_new_tokens: 512,
            language: "fr".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Push-to-talk key name (e.g. `"f2"`, `"ctrl"`).
    pub trigger_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            trigger_key: "f2".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Settings for the transcript history store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Records older than this many days are deleted by the startup sweep.
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voxkey::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio capture / duration-gate settings.
    pub audio: AudioConfig,
    /// Transcription model settings.
    pub model: ModelConfig,
    /// Global hotkey binding.
    pub hotkey: HotkeyConfig,
    /// Transcript history settings.
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Minimum recording duration as a [`std::time::Duration`].
    pub fn min_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(self.audio.min_duration_secs.max(0.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.channels, loaded.audio.channels);
        assert_eq!(
            original.audio.min_duration_secs,
            loaded.audio.min_duration_secs
        );
        assert_eq!(
            original.audio.max_duration_secs,
            loaded.audio.max_duration_secs
        );
        assert_eq!(original.model.model, loaded.model.model);
        assert_eq!(original.model.device, loaded.model.device);
        assert_eq!(original.model.dtype, loaded.model.dtype);
        assert_eq!(original.model.max_new_tokens, loaded.model.max_new_tokens);
        assert_eq!(original.model.language, loaded.model.language);
        assert_eq!(original.hotkey.trigger_key, loaded.hotkey.trigger_key);
        assert_eq!(
            original.storage.retention_days,
            loaded.storage.retention_days
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
        assert_eq!(config.model.model, default.model.model);
        assert_eq!(config.hotkey.trigger_key, default.hotkey.trigger_key);
    }

    /// Verify default values match the documented defaults.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.audio.min_duration_secs, 0.5);
        assert_eq!(cfg.audio.max_duration_secs, 300.0);
        assert_eq!(cfg.model.language, "fr");
        assert_eq!(cfg.model.max_new_tokens, 512);
        assert_eq!(cfg.hotkey.trigger_key, "f2");
        assert_eq!(cfg.storage.retention_days, 7);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.audio.min_duration_secs = 1.0;
        cfg.model.model = "ggml-medium".into();
        cfg.model.language = "en".into();
        cfg.model.device = "cuda:0".into();
        cfg.hotkey.trigger_key = "f9".into();
        cfg.storage.retention_days = 30;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.audio.min_duration_secs, 1.0);
        assert_eq!(loaded.model.model, "ggml-medium");
        assert_eq!(loaded.model.language, "en");
        assert_eq!(loaded.model.device, "cuda:0");
        assert_eq!(loaded.hotkey.trigger_key, "f9");
        assert_eq!(loaded.storage.retention_days, 30);
    }

    /// `min_duration` clamps negative configured values to zero.
    #[test]
    fn min_duration_clamps_negative() {
        let mut cfg = AppConfig::default();
        cfg.audio.min_duration_secs = -1.0;
        assert_eq!(cfg.min_duration(), std::time::Duration::ZERO);
    }
}
