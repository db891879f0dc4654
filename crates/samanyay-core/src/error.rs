//! Error Types

use thiserror::Error;

/// Result type alias for practice operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Practice core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed registration fields or empty case fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// An account with this email already exists
    #[error("Account already exists: {0}")]
    Conflict(String),

    /// Email/password pair did not match a registered account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No live session for a protected operation
    #[error("Not authenticated")]
    Unauthenticated,

    /// Account id not present in the registry
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Backing store cannot be read or written
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored document under a key failed to parse
    #[error("Corrupt data under key '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Password hashing failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Whether this error is a user input problem rather than a system fault
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Conflict(_) | Self::InvalidCredentials | Self::Unauthenticated
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Conflict(_) => "An account with this email already exists".into(),
            Self::InvalidCredentials => "Invalid email or password".into(),
            Self::Unauthenticated => "Please sign in to continue".into(),
            Self::StoreUnavailable(_) => {
                "Local storage is unavailable. Your changes cannot be saved.".into()
            }
            Self::Corrupt { .. } => "Saved data could not be read.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_message_is_generic() {
        let msg = CoreError::InvalidCredentials.user_message();
        assert!(!msg.to_lowercase().contains("not found"));
        assert!(CoreError::InvalidCredentials.is_user_error());
    }

    #[test]
    fn test_store_errors_are_retryable() {
        assert!(CoreError::StoreUnavailable("disabled".into()).is_retryable());
        assert!(!CoreError::Validation("x".into()).is_retryable());
    }
}
