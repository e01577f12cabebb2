//! Error types for the interview engine.
//!
//! This module defines the error hierarchy for all engine operations:
//! session lifecycle, input validation, evaluator calls, storage access, and
//! configuration loading.

use std::path::PathBuf;

use interviewer_report::ReportError;
use interviewer_store::StoreError;

/// A specialized `Result` type for interview engine operations.
pub type Result<T> = std::result::Result<T, InterviewError>;

/// Errors that can occur while running interviews.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    // ========================================================================
    // Session Errors
    // ========================================================================
    /// An operation was called in the wrong lifecycle state.
    #[error("Cannot {operation} while the session is {status}")]
    InvalidState {
        /// The attempted operation.
        operation: String,
        /// The session's current status.
        status: String,
    },

    /// A required input was empty or malformed.
    #[error("Invalid input: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// No session is registered under the given id.
    #[error("Session not found: '{id}'")]
    SessionNotFound {
        /// The unknown session id.
        id: String,
    },

    // ========================================================================
    // Evaluator Errors
    // ========================================================================
    /// The evaluator could not be reached or rejected the request.
    #[error("Evaluator unavailable ({kind}): {message}\n\nSuggestion: {suggestion}")]
    EvaluatorUnavailable {
        /// The category of failure.
        kind: EvaluatorErrorKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the operator.
        suggestion: String,
    },

    /// The evaluator answered but with nothing usable.
    #[error("Evaluator returned an empty response for {operation}")]
    EvaluatorEmptyResponse {
        /// The evaluator operation that produced the empty response.
        operation: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// The data API was called while no local store is configured.
    #[error("Local storage is disabled\n\nSuggestion: Set storageMode to 'local' or 'both'")]
    StorageDisabled,

    /// A persistence sink failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The report could not be assembled.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your interviewer.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // General Errors
    // ========================================================================
    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories of evaluator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorErrorKind {
    /// Invalid or missing API key.
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// The call did not finish within the configured deadline.
    Timeout,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for EvaluatorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl EvaluatorErrorKind {
    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check the API key in GEMINI_API_KEY",
            Self::RateLimit => "Wait and resubmit, or reduce request frequency",
            Self::Server => "Resubmit later; the model service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Timeout => "Resubmit, or raise evaluator.timeoutSeconds",
            Self::Other => "Check the model provider's status page",
        }
    }
}

impl InterviewError {
    /// Creates a new `InvalidState` error.
    #[must_use]
    pub fn invalid_state(operation: impl Into<String>, status: impl std::fmt::Display) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            status: status.to_string(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { id: id.into() }
    }

    /// Creates a new `EvaluatorUnavailable` error with automatic suggestion.
    #[must_use]
    pub fn evaluator_unavailable(kind: EvaluatorErrorKind, message: impl Into<String>) -> Self {
        Self::EvaluatorUnavailable {
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a new `EvaluatorEmptyResponse` error.
    #[must_use]
    pub fn empty_response(operation: impl Into<String>) -> Self {
        Self::EvaluatorEmptyResponse {
            operation: operation.into(),
        }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Returns `true` if resubmitting the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::EvaluatorUnavailable {
                kind: EvaluatorErrorKind::RateLimit
                    | EvaluatorErrorKind::Server
                    | EvaluatorErrorKind::Network
                    | EvaluatorErrorKind::Timeout,
                ..
            } | Self::EvaluatorEmptyResponse { .. }
        )
    }
}
