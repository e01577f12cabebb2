//! Configuration types for the interview server.
//!
//! The configuration is read from `interviewer.json` (camelCase keys). Every
//! field has a default, so a missing file yields a working local setup.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InterviewError, Result};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "interviewer.json";

/// Upper bound on questions per interview.
pub const MAX_TOTAL_QUESTIONS: u32 = 20;

/// Default number of questions per interview.
const fn default_total_questions() -> u32 {
    5
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

/// Default per-call evaluator deadline in seconds.
const fn default_evaluator_timeout() -> u64 {
    60
}

const fn default_temperature() -> f32 {
    0.7
}

fn default_storage_dir() -> String {
    "interview_data".to_string()
}

fn default_sheet_name() -> String {
    "Interview Data".to_string()
}

fn default_export_dir() -> String {
    "interview_exports".to_string()
}

/// Default idle time before a session is evicted.
const fn default_session_ttl() -> u64 {
    3600
}

const fn default_sweep_interval() -> u64 {
    60
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

/// Main configuration for the interview server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Number of questions asked in every interview.
    #[serde(default = "default_total_questions")]
    pub total_questions: u32,

    /// Settings for the generative model.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Which sinks receive completed interviews.
    #[serde(default)]
    pub storage_mode: StorageMode,

    /// Directory of the JSON-file store.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// Name of the export sheet.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Directory holding exported sheets.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,

    /// Seconds a session may stay idle before it is evicted (0 disables).
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,

    /// Seconds between idle-session sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// Origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_questions: default_total_questions(),
            evaluator: EvaluatorConfig::default(),
            storage_mode: StorageMode::default(),
            storage_dir: default_storage_dir(),
            sheet_name: default_sheet_name(),
            export_dir: default_export_dir(),
            session_ttl_seconds: default_session_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Config {
    /// Loads configuration from a specific directory.
    ///
    /// Looks for `interviewer.json` in the given directory; falls back to
    /// defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::ConfigParseError` if the file cannot be read or
    /// contains invalid JSON, and `InterviewError::ConfigValidationError` if a
    /// value is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(InterviewError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| InterviewError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.total_questions == 0 || self.total_questions > MAX_TOTAL_QUESTIONS {
            return Err(InterviewError::config_validation(
                format!(
                    "totalQuestions must be between 1 and {MAX_TOTAL_QUESTIONS}, got {}",
                    self.total_questions
                ),
                "Set totalQuestions to a value such as 5 in your interviewer.json",
            ));
        }

        if self.evaluator.model.trim().is_empty() {
            return Err(InterviewError::config_validation(
                "evaluator.model must not be empty",
                "Set evaluator.model, for example \"gemini-1.5-flash\"",
            ));
        }

        if self.evaluator.timeout_seconds == 0 {
            return Err(InterviewError::config_validation(
                "evaluator.timeoutSeconds must be greater than 0",
                "Set evaluator.timeoutSeconds to at least 1 second in your interviewer.json",
            ));
        }

        if !(0.0..=2.0).contains(&self.evaluator.temperature) {
            return Err(InterviewError::config_validation(
                format!(
                    "evaluator.temperature must be between 0 and 2, got {}",
                    self.evaluator.temperature
                ),
                "Use a temperature such as 0.7",
            ));
        }

        if self.storage_mode.uses_local() && self.storage_dir.trim().is_empty() {
            return Err(InterviewError::config_validation(
                "storageDir must not be empty when local storage is enabled",
                "Provide a directory such as \"interview_data\" in your interviewer.json",
            ));
        }

        if self.storage_mode.uses_sheets() {
            if self.sheet_name.trim().is_empty() {
                return Err(InterviewError::config_validation(
                    "sheetName must not be empty when sheet export is enabled",
                    "Set sheetName or INTERVIEW_SHEET_NAME",
                ));
            }
            if self.export_dir.trim().is_empty() {
                return Err(InterviewError::config_validation(
                    "exportDir must not be empty when sheet export is enabled",
                    "Provide a directory such as \"interview_exports\" in your interviewer.json",
                ));
            }
        }

        if self.session_ttl_seconds > 0 && self.sweep_interval_seconds == 0 {
            return Err(InterviewError::config_validation(
                "sweepIntervalSeconds must be greater than 0 when sessionTtlSeconds is set",
                "Set sweepIntervalSeconds to at least 1, or sessionTtlSeconds to 0",
            ));
        }

        Ok(())
    }

    /// Returns the idle-session TTL, or `None` when expiry is disabled.
    #[must_use]
    pub const fn session_ttl(&self) -> Option<Duration> {
        if self.session_ttl_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.session_ttl_seconds))
        }
    }

    /// Returns the idle sweeper period.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Settings for the generative model behind the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call deadline in seconds.
    #[serde(default = "default_evaluator_timeout")]
    pub timeout_seconds: u64,

    /// Generation temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_seconds: default_evaluator_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl EvaluatorConfig {
    /// Returns the per-call deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Reads the API key from the configured environment variable.
    ///
    /// Returns `None` when the variable is unset or blank.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Where completed interviews are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// JSON files in `storageDir` (default).
    #[default]
    Local,
    /// Spreadsheet export only.
    Sheets,
    /// Both the JSON store and the spreadsheet export.
    Both,
    /// Nothing is persisted.
    None,
}

impl StorageMode {
    /// Parses a string into a `StorageMode`, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "sheets" => Some(Self::Sheets),
            "both" => Some(Self::Both),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Returns the lowercase name of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sheets => "sheets",
            Self::Both => "both",
            Self::None => "none",
        }
    }

    /// Returns `true` if the JSON-file store is active.
    #[must_use]
    pub const fn uses_local(&self) -> bool {
        matches!(self, Self::Local | Self::Both)
    }

    /// Returns `true` if the spreadsheet export is active.
    #[must_use]
    pub const fn uses_sheets(&self) -> bool {
        matches!(self, Self::Sheets | Self::Both)
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s).ok_or_else(|| {
            format!("invalid storage mode '{s}': expected one of 'local', 'sheets', 'both', 'none'")
        })
    }
}

impl<'de> Deserialize<'de> for StorageMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for StorageMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
