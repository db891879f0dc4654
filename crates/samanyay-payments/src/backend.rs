//! Remote payment backend
//!
//! After the gateway approves, the charge is confirmed with the backend via
//! `POST {base}/payment/checkout`. Only a confirmed charge promotes the
//! account.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};
use crate::plan::PlanPricing;

/// Body of the confirmation call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Minor units
    pub amount: i64,
    /// Lower-case ISO 4217 code
    pub currency: String,
}

impl From<&PlanPricing> for CheckoutRequest {
    fn from(pricing: &PlanPricing) -> Self {
        Self {
            amount: pricing.cents,
            currency: pricing.currency.to_lowercase(),
        }
    }
}

/// Confirms approved charges with the remote service
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn confirm(&self, request: &CheckoutRequest) -> Result<()>;

    fn name(&self) -> &str;
}

/// HTTP backend client
pub struct HttpPaymentBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from `PAYMENT_API_URL`
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("PAYMENT_API_URL")
            .map_err(|_| PaymentError::Config("PAYMENT_API_URL not set".into()))?;
        Ok(Self::new(base_url))
    }

    fn endpoint(&self) -> String {
        format!("{}/payment/checkout", self.base_url)
    }
}

#[async_trait]
impl PaymentBackend for HttpPaymentBackend {
    async fn confirm(&self, request: &CheckoutRequest) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentError::Backend(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PaymentError::Backend(format!("checkout returned {status}")))
        }
    }

    fn name(&self) -> &str {
        "HttpPaymentBackend"
    }
}

/// Backend used when no remote service is configured; confirms everything
#[derive(Default)]
pub struct OfflineBackend;

#[async_trait]
impl PaymentBackend for OfflineBackend {
    async fn confirm(&self, request: &CheckoutRequest) -> Result<()> {
        tracing::debug!(amount = request.amount, currency = %request.currency, "Offline confirmation");
        Ok(())
    }

    fn name(&self) -> &str {
        "OfflineBackend"
    }
}
