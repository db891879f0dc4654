//! Payment Error Types

use samanyay_core::CoreError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Card form rule that failed, in the order the rules are checked
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardError {
    #[error("Please enter the name on the card")]
    Name,

    #[error("Card number must be 16 digits")]
    Number,

    #[error("Expiry must be in MM/YY format")]
    Expiry,

    #[error("CVC must be 3 or 4 digits")]
    Cvc,
}

/// Checkout errors
///
/// Every variant is recoverable: the checkout stays where it was and the
/// user may try again.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Card form validation failed
    #[error("{0}")]
    Card(#[from] CardError),

    /// A submission is already in flight
    #[error("A payment is already being processed")]
    Busy,

    /// Simulated gateway declined the charge
    #[error("Payment declined")]
    Declined,

    /// Remote payment backend did not confirm
    #[error("Payment backend error: {0}")]
    Backend(String),

    /// Operation not allowed in the current step
    #[error("Cannot {action} during the {step} step")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },

    /// Account already on the Pro plan
    #[error("Account is already subscribed")]
    AlreadySubscribed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Account/session/store failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Declined | Self::Backend(_) | Self::Busy => true,
            Self::Core(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Card(rule) => rule.to_string(),
            Self::Busy => "Your payment is still processing.".into(),
            Self::Declined => "Payment failed. Please try again.".into(),
            Self::Backend(_) => "Payment could not be confirmed. Please try again.".into(),
            Self::AlreadySubscribed => "You already have access to all premium features.".into(),
            Self::Core(e) => e.user_message(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}
