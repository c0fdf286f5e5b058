//! Error types for sessionizer-core operations.
//!
//! Only operator-facing failures live here. Enrichment probes never produce
//! an error: a failed probe leaves its attribute unset.

use std::path::PathBuf;

/// All errors that can occur in sessionizer-core operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionizerError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Could not determine a configuration directory")]
    NoConfigDir,

    #[error("Configuration directory unreadable: {path}: {source}")]
    ConfigDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration write failed: {path}: {details}")]
    ConfigWriteFailed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Key Binding Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Hotkey '{hotkey}' is not in the configured alphabet ({alphabet})")]
    HotkeyNotInAlphabet { hotkey: char, alphabet: String },

    // ─────────────────────────────────────────────────────────────────────
    // Multiplexer Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("tmux is not available: {0}")]
    TmuxUnavailable(String),

    #[error("tmux command failed: {command}: {details}")]
    TmuxCommandFailed { command: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Project Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid project path: {path}: {reason}")]
    InvalidProjectPath { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using SessionizerError.
pub type Result<T> = std::result::Result<T, SessionizerError>;

impl SessionizerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SessionizerError::Io {
            context: context.into(),
            source,
        }
    }
}
