//! Configuration — settings structs, TOML persistence and platform paths.
//!
//! [`AppConfig`] is loaded once at startup and injected by reference
//! (`Arc<AppConfig>`) into every component that needs it.  There is no
//! implicit re-initialization; callers that want fresh settings reload
//! explicitly and rebuild the affected component.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, HotkeyConfig, ModelConfig, StorageConfig};
