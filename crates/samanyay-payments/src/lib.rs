//! # samanyay-payments
//!
//! Pro-tier upgrade for Samanyay accounts.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  Card   │──▶│  Simulated   │──▶│  Payment backend │──▶│ promote_to_  │
//! │  rules  │   │  gateway     │   │  POST /payment/  │   │ pro + session│
//! │         │   │  (latency +  │   │  checkout        │   │ refresh      │
//! │         │   │  outcome)    │   │                  │   │              │
//! └─────────┘   └──────────────┘   └──────────────────┘   └──────────────┘
//! ```
//!
//! Every failure keeps the checkout in the Capture step with a user-facing
//! message; nothing here is fatal.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use samanyay_payments::{Checkout, CheckoutEntry, CardDetails, OfflineBackend, SimulatedGateway};
//!
//! let entry = Checkout::enter(&practice, Arc::new(SimulatedGateway::approving()), Arc::new(OfflineBackend))?;
//! if let CheckoutEntry::Started(checkout) = entry {
//!     checkout.upgrade()?;
//!     let receipt = checkout
//!         .submit_payment(&CardDetails::new("John Doe", "4242 4242 4242 4242", "12/29", "123"))
//!         .await?;
//! }
//! ```

mod backend;
mod card;
mod checkout;
mod error;
mod gateway;
mod plan;
mod receipt;

pub use backend::{CheckoutRequest, HttpPaymentBackend, OfflineBackend, PaymentBackend};
pub use card::{CardDetails, ValidatedCard};
pub use checkout::{Checkout, CheckoutEntry, CheckoutStep};
pub use error::{CardError, PaymentError, Result};
pub use gateway::{
    Authorization, Charge, FixedOutcome, GatewayConfig, OutcomeSource, PaymentGateway, RandomOutcome,
    ScriptedOutcome, SimulatedGateway,
};
pub use plan::{Plan, PlanPricing};
pub use receipt::Receipt;
