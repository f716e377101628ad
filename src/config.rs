//! Interview configuration
//!
//! Handles saving and loading the interview configuration to a JSON file
//! in the application config directory. The controller receives an explicit
//! [`InterviewConfig`] at construction and through its update-configuration
//! command; it never reads ambient state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

/// Base questions used when no custom list has been configured
const DEFAULT_QUESTIONS: [&str; 4] = [
    "Describe the patient's condition.",
    "Identify the patient.",
    "Are there any assistive devices the patient uses?",
    "When should we coordinate the transfer?",
];

/// Default locale for transcription and speech synthesis
const DEFAULT_LANGUAGE_CODE: &str = "en-US";

fn default_questions() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

fn default_language_code() -> String {
    DEFAULT_LANGUAGE_CODE.to_string()
}

/// Interview configuration
///
/// Question-list and locale changes applied mid-session take effect on the
/// next session (after a reset); the live question list is never reshaped
/// underneath a running interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Base question list, asked in order
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,
    /// Locale code for transcription and read-aloud (e.g., "en-US", "es-ES")
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// Whether follow-up questions injected during a session stay in the
    /// question list after a reset. Off by default: a reset restores the
    /// configured base list.
    #[serde(default)]
    pub retain_follow_ups: bool,
    /// Background mode (true = dark, false = light); opaque to the engine
    #[serde(default)]
    pub is_dark_mode: bool,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            language_code: default_language_code(),
            retain_follow_ups: false,
            is_dark_mode: false,
        }
    }
}

/// Get the config file path
fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Handover").join("config.json"))
}

/// Load the configuration from disk
///
/// Returns the default configuration if the file doesn't exist or can't be
/// read or parsed.
pub fn load_config() -> InterviewConfig {
    let Some(path) = config_path() else {
        return InterviewConfig::default();
    };

    if !path.exists() {
        return InterviewConfig::default();
    }

    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to parse config: {}", e);
                InterviewConfig::default()
            }
        },
        Err(e) => {
            error!("Failed to read config file: {}", e);
            InterviewConfig::default()
        }
    }
}

/// Save the configuration to disk
pub fn save_config(config: &InterviewConfig) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            info!("Created config directory: {:?}", parent);
        }
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json)?;
    info!("Saved config to: {:?}", path);

    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
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
    fn test_default_config() {
        let config = InterviewConfig::default();
        assert_eq!(config.questions.len(), 4);
        assert_eq!(config.language_code, "en-US");
        assert!(!config.retain_follow_ups);
        assert!(!config.is_dark_mode);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let config: InterviewConfig =
            serde_json::from_str(r#"{"language_code": "fr-FR"}"#).unwrap();
        assert_eq!(config.language_code, "fr-FR");
        assert_eq!(config.questions, default_questions());
        assert!(!config.retain_follow_ups);
    }

    #[test]
    fn test_config_round_trip() {
        let config = InterviewConfig {
            questions: vec!["Q1".into(), "Q2".into()],
            language_code: "es-ES".into(),
            retain_follow_ups: true,
            is_dark_mode: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: InterviewConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_path() {
        let path = config_path();
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("Handover/config.json"));
    }
}
