//! Checkout receipt (display-only, never persisted).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::plan::PlanPricing;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_id: String,
    /// Major units
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub card_last4: String,
    pub plan: String,
}

impl Receipt {
    pub fn new(pricing: &PlanPricing, transaction_id: impl Into<String>, card_last4: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount: pricing.amount(),
            currency: pricing.currency.clone(),
            created_at: Utc::now(),
            card_last4: card_last4.into(),
            plan: pricing.display_name(),
        }
    }
}
