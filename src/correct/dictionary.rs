//! JSON persistence for the correction dictionary.
//!
//! The on-disk format is a single object the user can edit by hand:
//!
//! ```json
//! {
//!   "corrections": {
//!     "l'ia": "l'IA",
//!     "qwen": "Qwen"
//!   },
//!   "_comment": "Keys are what the ASR outputs, values are the correct spelling."
//! }
//! ```
//!
//! Load/save failures are absorbed and logged — a broken dictionary file
//! must never take the dictation pipeline down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::CorrectionEngine;

// ---------------------------------------------------------------------------
// DictionaryFile  (on-disk shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct DictionaryFile {
    #[serde(default)]
    corrections: HashMap<String, String>,
    #[serde(rename = "_comment", default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

const DEFAULT_COMMENT: &str =
    "Keys are what the ASR outputs, values are the correct spelling.";

// ---------------------------------------------------------------------------
// Dictionary
// ---------------------------------------------------------------------------

/// Handle to the dictionary file on disk.
pub struct Dictionary {
    path: PathBuf,
}

impl Dictionary {
    /// Create a handle for the dictionary at `path`.  Nothing is read until
    /// [`load`](Self::load) is called.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the correction rules from disk.
    ///
    /// When the file does not exist yet, an empty skeleton (with the editing
    /// hint comment) is written so users can find and edit it.  A malformed
    /// file is logged and treated as empty.
    pub fn load(&self) -> HashMap<String, String> {
        if !self.path.exists() {
            self.write_file(&DictionaryFile {
                corrections: HashMap::new(),
                comment: Some(DEFAULT_COMMENT.into()),
            });
            return HashMap::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(data) => match serde_json::from_str::<DictionaryFile>(&data) {
                Ok(file) => {
                    log::info!(
                        "dictionary: loaded {} correction(s) from {}",
                        file.corrections.len(),
                        self.path.display()
                    );
                    file.corrections
                }
                Err(e) => {
                    log::error!(
                        "dictionary: malformed file {}: {e}",
                        self.path.display()
                    );
                    HashMap::new()
                }
            },
            Err(e) => {
                log::error!("dictionary: cannot read {}: {e}", self.path.display());
                HashMap::new()
            }
        }
    }

    /// Build a [`CorrectionEngine`] from the rules on disk.
    pub fn load_engine(&self) -> CorrectionEngine {
        CorrectionEngine::with_rules(self.load())
    }

    /// Persist `rules` to disk, overwriting the previous contents.  Failures
    /// are logged, never propagated.
    pub fn store(&self, rules: &HashMap<String, String>) {
        self.write_file(&DictionaryFile {
            corrections: rules.clone(),
            comment: Some(DEFAULT_COMMENT.into()),
        });
    }

    /// Path to the dictionary file (e.g. for "edit dictionary" UI actions).
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, file: &DictionaryFile) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("dictionary: cannot create {}: {e}", parent.display());
                return;
            }
        }
        match serde_json::to_string_pretty(file) {
            Ok(data) => {
                if let Err(e) = std::fs::write(&self.path, data) {
                    log::error!("dictionary: cannot write {}: {e}", self.path.display());
                }
            }
            Err(e) => log::error!("dictionary: cannot serialise: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty_and_creates_skeleton() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("dictionary.json");
        let dict = Dictionary::open(&path);

        assert!(dict.load().is_empty());
        assert!(path.exists(), "skeleton file should have been created");

        // The skeleton must be valid JSON with an empty corrections map.
        let data = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert!(parsed["corrections"].as_object().unwrap().is_empty());
        assert!(parsed["_comment"].is_string());
    }

    #[test]
    fn store_and_load_round_trip() {
        let dir = tempdir().expect("temp dir");
        let dict = Dictionary::open(dir.path().join("dictionary.json"));

        let mut rules = HashMap::new();
        rules.insert("l'ia".to_string(), "l'IA".to_string());
        rules.insert("qwen".to_string(), "Qwen".to_string());
        dict.store(&rules);

        assert_eq!(dict.load(), rules);
    }

    #[test]
    fn load_engine_applies_stored_rules() {
        let dir = tempdir().expect("temp dir");
        let dict = Dictionary::open(dir.path().join("dictionary.json"));

        let mut rules = HashMap::new();
        rules.insert("bonjour".to_string(), "Bonjour".to_string());
        dict.store(&rules);

        let engine = dict.load_engine();
        assert_eq!(engine.apply("bonjour le monde"), "Bonjour le monde");
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("dictionary.json");
        std::fs::write(&path, "{not json").unwrap();

        let dict = Dictionary::open(&path);
        assert!(dict.load().is_empty());
    }

    #[test]
    fn reload_reflects_external_edits() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("dictionary.json");
        let dict = Dictionary::open(&path);
        assert!(dict.load().is_empty());

        // Simulate the user editing the file by hand.
        std::fs::write(
            &path,
            r#"{"corrections": {"ia": "IA"}}"#,
        )
        .unwrap();

        let rules = dict.load();
        assert_eq!(rules.get("ia").map(String::as_str), Some("IA"));
    }
}
