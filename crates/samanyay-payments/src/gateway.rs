//! Simulated Payment Gateway
//!
//! Stands in for a card network: waits a configurable latency, then asks an
//! [`OutcomeSource`] whether to approve. The outcome source is injected so
//! tests can force either branch.

use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::Result;

/// Default simulated processing time
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(2000);

/// Default approval probability
pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

/// Decides whether a simulated charge is approved
pub trait OutcomeSource: Send + Sync {
    fn approve(&self) -> bool;
}

/// Approves with a fixed probability
pub struct RandomOutcome {
    rng: Mutex<StdRng>,
    success_rate: f64,
}

impl RandomOutcome {
    pub fn new(success_rate: f64) -> Self {
        Self::from_rng(StdRng::from_entropy(), success_rate)
    }

    /// Deterministic sequence for a given seed
    pub fn seeded(seed: u64, success_rate: f64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), success_rate)
    }

    fn from_rng(rng: StdRng, success_rate: f64) -> Self {
        Self {
            rng: Mutex::new(rng),
            success_rate: if success_rate.is_nan() {
                DEFAULT_SUCCESS_RATE
            } else {
                success_rate.clamp(0.0, 1.0)
            },
        }
    }
}

impl OutcomeSource for RandomOutcome {
    fn approve(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_bool(self.success_rate)
    }
}

/// Always the same answer
pub struct FixedOutcome(pub bool);

impl OutcomeSource for FixedOutcome {
    fn approve(&self) -> bool {
        self.0
    }
}

/// Replays a script of outcomes, approving once it runs out
pub struct ScriptedOutcome {
    script: Mutex<VecDeque<bool>>,
}

impl ScriptedOutcome {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

impl OutcomeSource for ScriptedOutcome {
    fn approve(&self) -> bool {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script.pop_front().unwrap_or(true)
    }
}

/// A charge presented to the gateway
#[derive(Clone, Debug)]
pub struct Charge {
    /// Minor units
    pub amount_cents: i64,
    pub currency: String,
    pub card_last4: String,
}

/// Gateway verdict
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    Approved { transaction_id: String },
    Declined,
}

/// Card authorization provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, charge: &Charge) -> Result<Authorization>;

    fn name(&self) -> &str;
}

/// Gateway simulation settings
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub latency: Duration,
    pub success_rate: f64,
    /// Fixed seed for reproducible outcomes
    pub seed: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            success_rate: DEFAULT_SUCCESS_RATE,
            seed: None,
        }
    }
}

impl GatewayConfig {
    /// Read `CHECKOUT_LATENCY_MS`, `CHECKOUT_SUCCESS_RATE` and `CHECKOUT_SEED`
    pub fn from_env() -> Self {
        let latency = std::env::var("CHECKOUT_LATENCY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(DEFAULT_LATENCY, Duration::from_millis);
        let success_rate = std::env::var("CHECKOUT_SUCCESS_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SUCCESS_RATE);
        let seed = std::env::var("CHECKOUT_SEED")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            latency,
            success_rate,
            seed,
        }
    }
}

/// Latency plus an injected outcome
pub struct SimulatedGateway {
    latency: Duration,
    outcome: Arc<dyn OutcomeSource>,
}

impl SimulatedGateway {
    pub fn new(latency: Duration, outcome: Arc<dyn OutcomeSource>) -> Self {
        Self { latency, outcome }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let outcome = match config.seed {
            Some(seed) => RandomOutcome::seeded(seed, config.success_rate),
            None => RandomOutcome::new(config.success_rate),
        };
        Self::new(config.latency, Arc::new(outcome))
    }

    /// No delay, always approves
    pub fn approving() -> Self {
        Self::new(Duration::ZERO, Arc::new(FixedOutcome(true)))
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, charge: &Charge) -> Result<Authorization> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.outcome.approve() {
            let transaction_id = format!("txn_{}", uuid::Uuid::new_v4().simple());
            tracing::debug!(
                transaction_id = %transaction_id,
                amount_cents = charge.amount_cents,
                card_last4 = %charge.card_last4,
                "Simulated charge approved"
            );
            Ok(Authorization::Approved { transaction_id })
        } else {
            tracing::debug!(card_last4 = %charge.card_last4, "Simulated charge declined");
            Ok(Authorization::Declined)
        }
    }

    fn name(&self) -> &str {
        "SimulatedGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge() -> Charge {
        Charge {
            amount_cents: 9900,
            currency: "USD".into(),
            card_last4: "4242".into(),
        }
    }

    #[test]
    fn test_seeded_outcomes_repeat() {
        let a = RandomOutcome::seeded(7, 0.5);
        let b = RandomOutcome::seeded(7, 0.5);
        let xs: Vec<bool> = (0..32).map(|_| a.approve()).collect();
        let ys: Vec<bool> = (0..32).map(|_| b.approve()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_rate_extremes() {
        let never = RandomOutcome::seeded(1, 0.0);
        let always = RandomOutcome::seeded(1, 1.5);
        assert!((0..100).all(|_| !never.approve()));
        assert!((0..100).all(|_| always.approve()));
    }

    #[test]
    fn test_default_rate_is_roughly_eighty_percent() {
        let outcome = RandomOutcome::seeded(42, DEFAULT_SUCCESS_RATE);
        let approved = (0..10_000).filter(|_| outcome.approve()).count();
        assert!((7_500..8_500).contains(&approved), "{approved}");
    }

    #[test]
    fn test_script_then_approve() {
        let outcome = ScriptedOutcome::new([false, false]);
        assert!(!outcome.approve());
        assert!(!outcome.approve());
        assert!(outcome.approve());
    }

    #[tokio::test]
    async fn test_gateway_follows_outcome() {
        let declining = SimulatedGateway::new(Duration::ZERO, Arc::new(FixedOutcome(false)));
        assert_eq!(declining.authorize(&charge()).await.unwrap(), Authorization::Declined);

        let approving = SimulatedGateway::approving();
        match approving.authorize(&charge()).await.unwrap() {
            Authorization::Approved { transaction_id } => assert!(transaction_id.starts_with("txn_")),
            Authorization::Declined => panic!("expected approval"),
        }
    }

    #[tokio::test]
    async fn test_latency_is_observed() {
        let gateway = SimulatedGateway::new(Duration::from_millis(20), Arc::new(FixedOutcome(true)));
        let started = std::time::Instant::now();
        gateway.authorize(&charge()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
