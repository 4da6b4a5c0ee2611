//! Core error types and traits for Vanguard

use thiserror::Error;

/// Result type alias for Vanguard operations
pub type VanguardResult<T> = Result<T, VanguardError>;

/// Unified error trait that all Vanguard errors implement.
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the human-readable error message
    fn message(&self) -> &str;

    /// Get optional context about the error
    fn context(&self) -> Option<&str> {
        None
    }

    /// Check if this error is retryable
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> VanguardResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> VanguardResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> VanguardResult<T> {
        self.map_err(|e| VanguardError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> VanguardResult<T> {
        self.map_err(|e| VanguardError::other(format!("{}: {}", f(), e)))
    }
}

/// Main error type for Vanguard
#[derive(Error, Debug, Clone)]
pub enum VanguardError {
    /// The state manager was used before `initialize` completed, or after
    /// it was disposed. Always a caller bug.
    #[error("State manager not initialized: {operation}")]
    Uninitialized { operation: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Input rejected before any I/O was attempted
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Provider (LLM vendor) errors
    #[error("{}", format_llm(.provider, .message))]
    Llm {
        message: String,
        provider: Option<String>,
        status_code: Option<u16>,
        context: Option<String>,
    },

    /// Speech synthesis errors
    #[error("TTS error: {message}")]
    Tts {
        message: String,
        status_code: Option<u16>,
    },

    /// Settings store / history file persistence errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// HTTP transport errors
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        url: Option<String>,
        status_code: Option<u16>,
    },

    /// File watcher errors
    #[error("Watcher error: {message}")]
    Watcher { message: String },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

fn format_llm(provider: &Option<String>, message: &str) -> String {
    match provider {
        Some(p) => format!("{} API error: {}", p, message),
        None => format!("LLM error: {}", message),
    }
}
