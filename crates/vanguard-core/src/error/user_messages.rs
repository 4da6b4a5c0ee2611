//! Human-readable rendering of errors for the CLI boundary

use super::types::{UnifiedError, VanguardError};

/// Error category for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    RateLimit,
    Network,
    UserInput,
    Persistence,
    ServiceUnavailable,
    Internal,
}

impl ErrorCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration Error",
            Self::Authentication => "Authentication Error",
            Self::RateLimit => "Rate Limit Exceeded",
            Self::Network => "Network Error",
            Self::UserInput => "Invalid Input",
            Self::Persistence => "Persistence Error",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::Internal => "Internal Error",
        }
    }

    fn from_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(Self::Authentication),
            429 => Some(Self::RateLimit),
            s if s >= 500 => Some(Self::ServiceUnavailable),
            _ => None,
        }
    }
}

/// User-friendly error information
#[derive(Debug, Clone)]
pub struct UserFriendlyError {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
    pub suggestions: Vec<String>,
    pub error_code: String,
}

impl UserFriendlyError {
    pub fn new(
        category: ErrorCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            message: message.into(),
            suggestions: Vec::new(),
            error_code: String::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the error for display
    pub fn format_display(&self) -> String {
        let mut output = format!(
            "{}: {}\n\n{}",
            self.category.display_name(),
            self.title,
            self.message
        );

        if !self.suggestions.is_empty() {
            output.push_str("\n\nSuggested actions:");
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("\n  {}. {}", i + 1, suggestion));
            }
        }

        output
    }
}

impl From<&VanguardError> for UserFriendlyError {
    fn from(error: &VanguardError) -> Self {
        let friendly = match error {
            VanguardError::Uninitialized { operation } => UserFriendlyError::new(
                ErrorCategory::Internal,
                "State used before initialization",
                format!("'{}' was called before the state manager was ready", operation),
            ),

            VanguardError::Config { message, .. } => UserFriendlyError::new(
                ErrorCategory::Configuration,
                "Invalid configuration",
                message.clone(),
            )
            .with_suggestion("Run 'vanguard config show' to inspect the effective settings"),

            VanguardError::Validation { message, field } => {
                let title = match field {
                    Some(f) => format!("Invalid value for '{}'", f),
                    None => "Invalid input".to_string(),
                };
                UserFriendlyError::new(ErrorCategory::UserInput, title, message.clone())
            }

            VanguardError::Llm {
                message,
                provider,
                status_code,
                ..
            } => {
                let provider_name = provider.as_deref().unwrap_or("LLM provider");
                let category = status_code
                    .and_then(ErrorCategory::from_status)
                    .unwrap_or(ErrorCategory::Network);
                let friendly = UserFriendlyError::new(
                    category,
                    format!("{} request failed", provider_name),
                    message.clone(),
                );
                match category {
                    ErrorCategory::Authentication => friendly.with_suggestion(format!(
                        "Save a valid key with 'vanguard key save' for {}",
                        provider_name
                    )),
                    ErrorCategory::RateLimit => {
                        friendly.with_suggestion("Wait a moment and try again")
                    }
                    _ => friendly,
                }
            }

            VanguardError::Tts {
                message,
                status_code,
            } => UserFriendlyError::new(
                status_code
                    .and_then(ErrorCategory::from_status)
                    .unwrap_or(ErrorCategory::Network),
                "Speech generation failed",
                message.clone(),
            ),

            VanguardError::Storage { message, .. } | VanguardError::Io { message, .. } => {
                UserFriendlyError::new(
                    ErrorCategory::Persistence,
                    "Settings could not be saved",
                    message.clone(),
                )
                .with_suggestion("Check disk space and permissions of the storage directory")
            }

            VanguardError::Http {
                message,
                status_code,
                ..
            } => UserFriendlyError::new(
                status_code
                    .and_then(ErrorCategory::from_status)
                    .unwrap_or(ErrorCategory::Network),
                "Request failed",
                message.clone(),
            ),

            VanguardError::Json { message, .. }
            | VanguardError::Watcher { message }
            | VanguardError::Other { message, .. } => UserFriendlyError::new(
                ErrorCategory::Internal,
                "Unexpected error",
                message.clone(),
            ),
        };
        UserFriendlyError {
            error_code: error.error_code().to_string(),
            ..friendly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_auth_is_authentication() {
        let error = VanguardError::llm_with_status("invalid x-api-key", "Anthropic", 401);
        let friendly: UserFriendlyError = (&error).into();
        assert_eq!(friendly.category, ErrorCategory::Authentication);
        assert_eq!(friendly.error_code, "VANGUARD_LLM");
        assert!(!friendly.suggestions.is_empty());
    }

    #[test]
    fn test_tts_rate_limit() {
        let error = VanguardError::tts_with_status("Rate limit exceeded", 429);
        let friendly: UserFriendlyError = (&error).into();
        assert_eq!(friendly.category, ErrorCategory::RateLimit);
    }

    #[test]
    fn test_format_display() {
        let error = UserFriendlyError::new(
            ErrorCategory::UserInput,
            "Invalid value for 'key'",
            "Unknown API key type: fooKey",
        )
        .with_suggestion("Use one of the supported key names");

        let display = error.format_display();
        assert!(display.contains("Invalid Input"));
        assert!(display.contains("Suggested actions"));
        assert!(display.contains("1. Use one of the supported key names"));
    }
}
