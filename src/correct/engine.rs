//! Longest-match, case-preserving dictionary substitution.
//!
//! The rule set is compiled into one case-insensitive alternation regex with
//! the keys ordered longest first, so a short key embedded in a longer one
//! (`"ia"` inside `"l'ia"`) never pre-empts the longer match.  The compiled
//! [`RuleSet`] is immutable; mutations build a fresh one and swap it in
//! whole, so a concurrent [`apply`](CorrectionEngine::apply) works on a
//! consistent snapshot and never observes a half-rebuilt structure.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::Regex;

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// One immutable compilation of the correction rules.
struct RuleSet {
    /// Lower-cased "heard" phrase → canonical replacement.
    map: HashMap<String, String>,
    /// `(?i)\b(key1|key2|…)\b` with keys escaped, longest first.
    /// `None` when the rule set is empty.
    pattern: Option<Regex>,
}

impl RuleSet {
    fn compile(map: HashMap<String, String>) -> Result<Self, regex::Error> {
        if map.is_empty() {
            return Ok(Self { map, pattern: None });
        }

        // Longest first: the regex alternation prefers earlier branches at
        // the same position, which is exactly the precedence we need.  The
        // secondary lexicographic order keeps rebuilds deterministic.
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });

        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b({alternation})\b"))?;

        Ok(Self {
            map,
            pattern: Some(pattern),
        })
    }
}

// ---------------------------------------------------------------------------
// CorrectionEngine
// ---------------------------------------------------------------------------

/// Applies the user's custom-word corrections to transcribed text.
///
/// Thread-safe: `apply` may run concurrently with `add`/`remove` from other
/// threads.  Rule keys are unique case-insensitively — adding an existing
/// key overwrites its replacement.
pub struct CorrectionEngine {
    rules: RwLock<Arc<RuleSet>>,
}

impl CorrectionEngine {
    /// Create an engine with no rules (`apply` returns its input unchanged).
    pub fn new() -> Self {
        Self::with_rules(HashMap::new())
    }

    /// Create an engine from an existing rule map (e.g. a loaded dictionary).
    /// Keys are lower-cased on the way in.
    pub fn with_rules(rules: HashMap<String, String>) -> Self {
        let map: HashMap<String, String> = rules
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        let set = RuleSet::compile(map).unwrap_or_else(|e| {
            log::error!("correct: failed to compile dictionary pattern: {e}");
            RuleSet {
                map: HashMap::new(),
                pattern: None,
            }
        });
        Self {
            rules: RwLock::new(Arc::new(set)),
        }
    }

    /// Apply all corrections to `text`.
    ///
    /// Matches are case-insensitive and bounded by word boundaries (a key is
    /// never replaced inside a larger word).  The replacement casing follows
    /// the matched surface text: all-uppercase surface → uppercased
    /// replacement; leading-capital surface → replacement with its first
    /// character uppercased; anything else → replacement as stored.
    pub fn apply(&self, text: &str) -> String {
        let rules = Arc::clone(&self.rules.read().unwrap());
        let Some(pattern) = &rules.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let surface = &caps[0];
                match rules.map.get(&surface.to_lowercase()) {
                    Some(replacement) => preserve_case(surface, replacement),
                    // Cannot happen: every alternation branch is a map key.
                    None => surface.to_string(),
                }
            })
            .into_owned()
    }

    /// Add or overwrite a rule, rebuilding the match structure before
    /// returning.  A rebuild failure is logged and the previous rules stay
    /// in effect.
    pub fn add(&self, heard: &str, correction: &str) {
        let mut guard = self.rules.write().unwrap();
        let mut map = guard.map.clone();
        map.insert(heard.to_lowercase(), correction.to_string());
        match RuleSet::compile(map) {
            Ok(set) => *guard = Arc::new(set),
            Err(e) => log::error!("correct: failed to rebuild dictionary pattern: {e}"),
        }
    }

    /// Remove a rule by its "heard" phrase (case-insensitive).  Returns
    /// `true` when a rule was removed.
    pub fn remove(&self, heard: &str) -> bool {
        let mut guard = self.rules.write().unwrap();
        let mut map = guard.map.clone();
        if map.remove(&heard.to_lowercase()).is_none() {
            return false;
        }
        match RuleSet::compile(map) {
            Ok(set) => {
                *guard = Arc::new(set);
                true
            }
            Err(e) => {
                log::error!("correct: failed to rebuild dictionary pattern: {e}");
                false
            }
        }
    }

    /// Replace the whole rule set, e.g. after the dictionary file was edited
    /// and re-read.  Keys are lower-cased on the way in; on a rebuild
    /// failure the previous rules stay in effect.
    pub fn set_rules(&self, rules: HashMap<String, String>) {
        let map: HashMap<String, String> = rules
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        match RuleSet::compile(map) {
            Ok(set) => *self.rules.write().unwrap() = Arc::new(set),
            Err(e) => log::error!("correct: failed to rebuild dictionary pattern: {e}"),
        }
    }

    /// Copy of the current rule map (lower-cased keys), for persistence.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.rules.read().unwrap().map.clone()
    }

    /// Number of rules currently active.
    pub fn len(&self) -> usize {
        self.rules.read().unwrap().map.len()
    }

    /// Returns `true` when no rules are loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Case preservation
// ---------------------------------------------------------------------------

/// Re-case `replacement` to follow the casing pattern of `surface`.
fn preserve_case(surface: &str, replacement: &str) -> String {
    let cased: Vec<char> = surface.chars().filter(|c| c.is_alphabetic()).collect();
    let all_upper = !cased.is_empty() && cased.iter().all(|c| c.is_uppercase());

    if all_upper {
        return replacement.to_uppercase();
    }

    if surface.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }

    replacement.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(rules: &[(&str, &str)]) -> CorrectionEngine {
        CorrectionEngine::with_rules(
            rules
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    // ---- basic substitution -------------------------------------------------

    #[test]
    fn no_rules_returns_text_unchanged() {
        let eng = CorrectionEngine::new();
        assert_eq!(eng.apply("bonjour le monde"), "bonjour le monde");
    }

    #[test]
    fn empty_text_stays_empty() {
        let eng = engine(&[("ia", "IA")]);
        assert_eq!(eng.apply(""), "");
    }

    #[test]
    fn simple_replacement() {
        let eng = engine(&[("bonjour", "Bonjour")]);
        assert_eq!(eng.apply("bonjour le monde"), "Bonjour le monde");
    }

    #[test]
    fn replaces_every_occurrence() {
        let eng = engine(&[("ia", "IA")]);
        assert_eq!(eng.apply("ia et encore ia"), "IA et encore IA");
    }

    // ---- whole-word semantics -----------------------------------------------

    #[test]
    fn key_inside_larger_word_is_not_replaced() {
        let eng = engine(&[("chat", "Chat")]);
        assert_eq!(eng.apply("le chateau du chat"), "le chateau du Chat");
    }

    // ---- longest-match precedence -------------------------------------------

    #[test]
    fn longer_key_wins_over_embedded_shorter_key() {
        let eng = engine(&[("ia", "IA"), ("l'ia", "l'IA")]);
        assert_eq!(eng.apply("j'aime l'ia"), "j'aime l'IA");
        // The short key still applies on its own.
        assert_eq!(eng.apply("ia partout"), "IA partout");
    }

    // ---- case preservation --------------------------------------------------

    #[test]
    fn all_uppercase_surface_uppercases_replacement() {
        let eng = engine(&[("qwen", "Qwen")]);
        assert_eq!(eng.apply("QWEN est pret"), "QWEN est pret");
    }

    #[test]
    fn capitalized_surface_capitalizes_replacement() {
        let eng = engine(&[("qwen", "Qwen")]);
        assert_eq!(eng.apply("Qwen est pret"), "Qwen est pret");
    }

    #[test]
    fn lowercase_surface_uses_replacement_as_stored() {
        let eng = engine(&[("qwen", "Qwen"), ("jason", "JSON")]);
        assert_eq!(eng.apply("qwen et jason"), "Qwen et JSON");
    }

    #[test]
    fn uppercase_surface_with_mixed_case_replacement() {
        let eng = engine(&[("jason", "JSON")]);
        assert_eq!(eng.apply("JASON partout"), "JSON partout");
        assert_eq!(eng.apply("Jason partout"), "JSON partout");
    }

    // ---- idempotence --------------------------------------------------------

    #[test]
    fn apply_is_idempotent_when_output_has_no_keys() {
        let eng = engine(&[("gpt", "ChatGPT")]);
        let once = eng.apply("on utilise gpt tous les jours");
        let twice = eng.apply(&once);
        assert_eq!(once, "on utilise ChatGPT tous les jours");
        assert_eq!(once, twice);
    }

    // ---- mutation -----------------------------------------------------------

    #[test]
    fn add_takes_effect_immediately() {
        let eng = CorrectionEngine::new();
        assert_eq!(eng.apply("vox"), "vox");
        eng.add("vox", "Vox");
        assert_eq!(eng.apply("vox"), "Vox");
    }

    #[test]
    fn add_existing_key_overwrites_case_insensitively() {
        let eng = engine(&[("AI", "premier")]);
        eng.add("ai", "second");
        assert_eq!(eng.len(), 1);
        assert_eq!(eng.apply("ai"), "second");
    }

    #[test]
    fn remove_known_key() {
        let eng = engine(&[("ia", "IA")]);
        assert!(eng.remove("IA"));
        assert!(eng.is_empty());
        assert_eq!(eng.apply("ia"), "ia");
    }

    #[test]
    fn remove_unknown_key_returns_false() {
        let eng = engine(&[("ia", "IA")]);
        assert!(!eng.remove("autre"));
        assert_eq!(eng.len(), 1);
    }

    #[test]
    fn keys_with_regex_metacharacters_are_escaped() {
        let eng = engine(&[("node.js", "Node.js")]);
        // '.' must match literally, not as a wildcard.
        assert_eq!(eng.apply("avec node.js ici"), "avec Node.js ici");
        assert_eq!(eng.apply("avec nodexjs ici"), "avec nodexjs ici");
    }

    #[test]
    fn set_rules_replaces_the_whole_set() {
        let eng = engine(&[("ia", "IA")]);
        let mut fresh = HashMap::new();
        fresh.insert("Vox".to_string(), "VoxKey".to_string());
        eng.set_rules(fresh);

        assert_eq!(eng.len(), 1);
        assert_eq!(eng.apply("ia"), "ia");
        assert_eq!(eng.apply("vox"), "VoxKey");
    }

    #[test]
    fn snapshot_round_trips_through_with_rules() {
        let eng = engine(&[("ia", "IA"), ("l'ia", "l'IA")]);
        let rebuilt = CorrectionEngine::with_rules(eng.snapshot());
        assert_eq!(rebuilt.apply("j'aime l'ia"), "j'aime l'IA");
    }
}
