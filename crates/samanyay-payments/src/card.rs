//! Card form validation
//!
//! Rules are checked in a fixed order (name, number, expiry, CVC) and the
//! first failure wins.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::CardError;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{16}$").expect("valid regex"));
static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("valid regex"));
static CVC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("valid regex"));

/// Raw card fields as typed into the capture form
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub name_on_card: String,
    pub number: String,
    pub expiry: String,
    pub cvc: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("name_on_card", &self.name_on_card)
            .field("number", &"****")
            .field("expiry", &self.expiry)
            .field("cvc", &"***")
            .finish()
    }
}

impl CardDetails {
    pub fn new(
        name_on_card: impl Into<String>,
        number: impl Into<String>,
        expiry: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            name_on_card: name_on_card.into(),
            number: number.into(),
            expiry: expiry.into(),
            cvc: cvc.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedCard, CardError> {
        let name = self.name_on_card.trim();
        if name.chars().count() < 2 {
            return Err(CardError::Name);
        }

        let digits: String = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        if !NUMBER_RE.is_match(&digits) {
            return Err(CardError::Number);
        }

        if !EXPIRY_RE.is_match(&self.expiry) {
            return Err(CardError::Expiry);
        }

        if !CVC_RE.is_match(&self.cvc) {
            return Err(CardError::Cvc);
        }

        Ok(ValidatedCard {
            name_on_card: name.to_string(),
            digits,
        })
    }
}

/// Card that passed every form rule
#[derive(Clone)]
pub struct ValidatedCard {
    pub name_on_card: String,
    digits: String,
}

impl std::fmt::Debug for ValidatedCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedCard")
            .field("name_on_card", &self.name_on_card)
            .field("last4", &self.last4())
            .finish_non_exhaustive()
    }
}

impl ValidatedCard {
    pub fn last4(&self) -> &str {
        &self.digits[self.digits.len() - 4..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CardDetails {
        CardDetails::new("John Doe", "4242 4242 4242 4242", "12/29", "123")
    }

    #[test]
    fn test_valid_card() {
        let card = valid().validate().unwrap();
        assert_eq!(card.last4(), "4242");
        assert_eq!(card.name_on_card, "John Doe");
    }

    #[test]
    fn test_short_number_rejected() {
        let card = CardDetails { number: "4242-4242".into(), ..valid() };
        assert_eq!(card.validate().unwrap_err(), CardError::Number);
    }

    #[test]
    fn test_dashes_are_not_stripped() {
        let card = CardDetails { number: "4242-4242-4242-4242".into(), ..valid() };
        assert_eq!(card.validate().unwrap_err(), CardError::Number);
    }

    #[test]
    fn test_bad_month_rejected() {
        for expiry in ["13/29", "00/29", "1/29", "12/2029", "12-29"] {
            let card = CardDetails { expiry: expiry.into(), ..valid() };
            assert_eq!(card.validate().unwrap_err(), CardError::Expiry, "{expiry}");
        }
    }

    #[test]
    fn test_cvc_lengths() {
        for (cvc, ok) in [("12", false), ("123", true), ("1234", true), ("12345", false), ("12a", false)] {
            let card = CardDetails { cvc: cvc.into(), ..valid() };
            assert_eq!(card.validate().is_ok(), ok, "{cvc}");
        }
    }

    #[test]
    fn test_name_rules() {
        let card = CardDetails { name_on_card: "  J ".into(), ..valid() };
        assert_eq!(card.validate().unwrap_err(), CardError::Name);
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let card = CardDetails::new("", "1", "99/99", "1");
        assert_eq!(card.validate().unwrap_err(), CardError::Name);

        let card = CardDetails::new("John Doe", "1", "99/99", "1");
        assert_eq!(card.validate().unwrap_err(), CardError::Number);

        let card = CardDetails::new("John Doe", "4242424242424242", "99/99", "1");
        assert_eq!(card.validate().unwrap_err(), CardError::Expiry);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let shown = format!("{:?}", valid());
        assert!(!shown.contains("4242"));
        assert!(!shown.contains("123"));

        let shown = format!("{:?}", valid().validate().unwrap());
        assert!(shown.contains("4242"));
        assert!(!shown.contains("4242424242424242"));
    }
}
