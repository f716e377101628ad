//! Keyword rule store
//!
//! Persists the ordered list of (keyword, follow-up question) pairs that the
//! follow-up sweep consults when the base question list is exhausted. Rules
//! are stored as a JSON array under a fixed file name; insertion order is
//! preserved across save/load. The store performs no validation - empty
//! keywords are filtered out by the sweep itself.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

/// File name for the persisted rule list, under the app config directory
const RULES_FILE: &str = "keyword_rules.json";

/// A keyword-triggered follow-up question
///
/// The id is opaque to the interview engine; matching and deduplication work
/// on the keyword and question text alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub keyword: String,
    pub question: String,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            keyword: keyword.into(),
            question: question.into(),
        }
    }
}

/// Durable store for keyword rules
///
/// `load` recovers from malformed or missing data by returning an empty rule
/// set; persistence problems never take a session down.
pub trait RuleStore: Send + Sync {
    /// Load all rules in insertion order
    fn load(&self) -> Vec<KeywordRule>;

    /// Replace the stored rules, preserving the given order
    fn save(&self, rules: &[KeywordRule]) -> Result<(), RuleStoreError>;
}

/// JSON-file-backed rule store
pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    /// Create a store at the default location in the app config directory
    pub fn new() -> Result<Self, RuleStoreError> {
        let dir = dirs::config_dir().ok_or(RuleStoreError::NoConfigDir)?;
        Ok(Self {
            path: dir.join("Handover").join(RULES_FILE),
        })
    }

    /// Create a store backed by an explicit file path
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RuleStore for JsonRuleStore {
    fn load(&self) -> Vec<KeywordRule> {
        if !self.path.exists() {
            return Vec::new();
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(rules) => rules,
                Err(e) => {
                    error!("Failed to parse keyword rules, treating as empty: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                error!("Failed to read keyword rules file: {}", e);
                Vec::new()
            }
        }
    }

    fn save(&self, rules: &[KeywordRule]) -> Result<(), RuleStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created rules directory: {:?}", parent);
            }
        }

        let json = serde_json::to_string_pretty(rules)?;
        fs::write(&self.path, json)?;
        info!("Saved {} keyword rules to: {:?}", rules.len(), self.path);

        Ok(())
    }
}

/// In-memory rule store, for embedders without durable storage and for tests
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<KeywordRule>>,
}

impl MemoryRuleStore {
    pub fn with_rules(rules: Vec<KeywordRule>) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }
}

impl RuleStore for MemoryRuleStore {
    fn load(&self) -> Vec<KeywordRule> {
        match self.rules.lock() {
            Ok(rules) => rules.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn save(&self, rules: &[KeywordRule]) -> Result<(), RuleStoreError> {
        match self.rules.lock() {
            Ok(mut stored) => *stored = rules.to_vec(),
            Err(poisoned) => *poisoned.into_inner() = rules.to_vec(),
        }
        Ok(())
    }
}

/// Rule store errors
#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRuleStore::at_path(dir.path().join(RULES_FILE));

        let rules = vec![
            KeywordRule::new("fall", "Did the patient fall recently?"),
            KeywordRule::new("pain", "Where is the pain located?"),
            KeywordRule::new("allergy", "Which allergies are documented?"),
        ];
        store.save(&rules).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, rules);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRuleStore::at_path(dir.path().join(RULES_FILE));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RULES_FILE);
        fs::write(&path, "{not valid json").unwrap();

        let store = JsonRuleStore::at_path(path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_rule_without_id_gets_one() {
        let json = r#"[{"keyword": "fall", "question": "Did the patient fall recently?"}]"#;
        let rules: Vec<KeywordRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].keyword, "fall");
        assert!(!rules[0].id.is_nil());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryRuleStore::default();
        assert!(store.load().is_empty());

        let rules = vec![KeywordRule::new("oxygen", "Is supplemental oxygen in use?")];
        store.save(&rules).unwrap();
        assert_eq!(store.load(), rules);
    }
}
