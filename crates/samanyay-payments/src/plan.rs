//! Subscription plans and their pricing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use samanyay_core::Account;

/// Subscription plan tiers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    /// Plan an account is currently on
    pub const fn of(account: &Account) -> Self {
        if account.is_pro() { Self::Pro } else { Self::Free }
    }
}

/// Pricing information
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPricing {
    pub name: String,
    pub description: String,
    /// Minor units (cents)
    pub cents: i64,
    /// Upper-case ISO 4217 code
    pub currency: String,
    pub interval: String,
}

impl PlanPricing {
    /// The Pro upgrade: $99/month
    pub fn pro() -> Self {
        Self {
            name: "Samanyay Pro".into(),
            description: "Advanced AI research, team collaboration, priority support".into(),
            cents: 9900,
            currency: "USD".into(),
            interval: "Monthly".into(),
        }
    }

    /// Price in major units
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// Label shown on receipts, e.g. "Samanyay Pro (Monthly)"
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pro_pricing() {
        let pricing = PlanPricing::pro();
        assert_eq!(pricing.cents, 9900);
        assert_eq!(pricing.amount(), dec!(99));
        assert_eq!(pricing.currency, "USD");
        assert_eq!(pricing.display_name(), "Samanyay Pro (Monthly)");
    }

    #[test]
    fn test_plan_follows_account_tier() {
        let account = Account::new("Alice", "Law", "alice@firm.com", "hash");
        assert_eq!(Plan::of(&account), Plan::Free);
        assert_eq!(serde_json::to_value(Plan::Pro).unwrap(), "pro");
    }
}
