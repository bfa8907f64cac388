//! Custom-word correction for transcribed text.
//!
//! [`CorrectionEngine`] applies the user's dictionary to a transcript:
//! case-insensitive whole-word matching, longest phrase first, with the
//! surface casing preserved on each replacement.  [`Dictionary`] persists
//! the rule set as a JSON file the user can edit by hand.
//!
//! # Quick start
//!
//! ```
//! use voxkey::correct::CorrectionEngine;
//!
//! let engine = CorrectionEngine::new();
//! engine.add("qwen", "Qwen");
//! assert_eq!(engine.apply("qwen est prêt"), "Qwen est prêt");
//! ```

pub mod dictionary;
pub mod engine;

pub use dictionary::Dictionary;
pub use engine::CorrectionEngine;
