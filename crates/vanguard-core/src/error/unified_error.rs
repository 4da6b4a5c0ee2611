//! UnifiedError trait implementation for VanguardError

use super::types::{UnifiedError, VanguardError};

impl UnifiedError for VanguardError {
    fn error_code(&self) -> &str {
        match self {
            Self::Uninitialized { .. } => "VANGUARD_UNINITIALIZED",
            Self::Config { .. } => "VANGUARD_CONFIG",
            Self::Validation { .. } => "VANGUARD_VALIDATION",
            Self::Llm { .. } => "VANGUARD_LLM",
            Self::Tts { .. } => "VANGUARD_TTS",
            Self::Storage { .. } => "VANGUARD_STORAGE",
            Self::Io { .. } => "VANGUARD_IO",
            Self::Json { .. } => "VANGUARD_JSON",
            Self::Http { .. } => "VANGUARD_HTTP",
            Self::Watcher { .. } => "VANGUARD_WATCHER",
            Self::Other { .. } => "VANGUARD_OTHER",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Uninitialized { operation } => operation,
            Self::Config { message, .. } => message,
            Self::Validation { message, .. } => message,
            Self::Llm { message, .. } => message,
            Self::Tts { message, .. } => message,
            Self::Storage { message, .. } => message,
            Self::Io { message, .. } => message,
            Self::Json { message, .. } => message,
            Self::Http { message, .. } => message,
            Self::Watcher { message } => message,
            Self::Other { message, .. } => message,
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. }
            | Self::Llm { context, .. }
            | Self::Storage { context, .. }
            | Self::Json { context, .. }
            | Self::Other { context, .. } => context.as_deref(),
            Self::Validation { field, .. } => field.as_deref(),
            Self::Io { path, .. } => path.as_deref(),
            Self::Http { url, .. } => url.as_deref(),
            Self::Uninitialized { .. } | Self::Tts { .. } | Self::Watcher { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status_code, .. }
            | Self::Llm { status_code, .. }
            | Self::Tts { status_code, .. } => match status_code {
                Some(code) => *code == 429 || *code >= 500,
                None => matches!(self, Self::Http { .. }),
            },
            Self::Storage { .. } | Self::Io { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            VanguardError::uninitialized("get_global").error_code(),
            "VANGUARD_UNINITIALIZED"
        );
        assert_eq!(
            VanguardError::llm_with_status("x", "anthropic", 401).error_code(),
            "VANGUARD_LLM"
        );
    }

    #[test]
    fn test_retryable_by_status() {
        assert!(VanguardError::llm_with_status("busy", "groq", 429).is_retryable());
        assert!(VanguardError::llm_with_status("down", "groq", 503).is_retryable());
        assert!(!VanguardError::llm_with_status("bad key", "groq", 401).is_retryable());
        assert!(!VanguardError::validation("nope").is_retryable());
        assert!(VanguardError::storage("disk").is_retryable());
    }

    #[test]
    fn test_llm_display_names_provider() {
        let err = VanguardError::llm_with_provider("stream ended", "xAI");
        assert_eq!(err.to_string(), "xAI API error: stream ended");
    }
}
