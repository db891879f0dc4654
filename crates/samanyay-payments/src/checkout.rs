//! Checkout State Machine
//!
//! ```text
//!            upgrade()               submit_payment() ok
//!   ┌───────┐ ──────▶ ┌─────────┐ ─────────────────────▶ ┌─────────┐
//!   │ Offer │         │ Capture │                        │ Receipt │
//!   └───────┘ ◀────── └─────────┘ ◀──┐                   └─────────┘
//!               back()      │        │ invalid card / busy /
//!                           └────────┘ declined / not confirmed
//! ```
//!
//! Entering the flow needs a signed-in account; a Pro account is turned away
//! with [`CheckoutEntry::AlreadySubscribed`] before the Offer step. Submitting
//! needs the same account to still be signed in.
//!
//! Once the backend has confirmed a charge, the receipt is held until the
//! account is promoted. A resubmit after a failed promotion retries only the
//! promotion and never charges again.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use samanyay_core::{Account, AccountId, CoreError, Practice};

use crate::backend::{CheckoutRequest, PaymentBackend};
use crate::card::CardDetails;
use crate::error::{PaymentError, Result};
use crate::gateway::{Authorization, Charge, PaymentGateway};
use crate::plan::{Plan, PlanPricing};
use crate::receipt::Receipt;

/// Current position in the flow
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum CheckoutStep {
    Offer,
    Capture,
    Receipt(Receipt),
}

impl CheckoutStep {
    /// 1-based step number
    pub const fn number(&self) -> u8 {
        match self {
            Self::Offer => 1,
            Self::Capture => 2,
            Self::Receipt(_) => 3,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Capture => "capture",
            Self::Receipt(_) => "receipt",
        }
    }
}

/// Result of entering the flow
pub enum CheckoutEntry {
    /// Account is already Pro; no flow is started
    AlreadySubscribed(Account),

    /// Flow started at the Offer step
    Started(Checkout),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the busy flag when the submission finishes, however it finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One pass through the upgrade flow for the signed-in account
pub struct Checkout {
    account_id: AccountId,
    pricing: PlanPricing,
    practice: Practice,
    gateway: Arc<dyn PaymentGateway>,
    backend: Arc<dyn PaymentBackend>,
    step: Mutex<CheckoutStep>,
    /// Confirmed charge whose promotion has not completed
    confirmed: Mutex<Option<Receipt>>,
    last_error: Mutex<Option<String>>,
    busy: AtomicBool,
}

impl Checkout {
    /// Enter the flow for the signed-in account
    pub fn enter(
        practice: &Practice,
        gateway: Arc<dyn PaymentGateway>,
        backend: Arc<dyn PaymentBackend>,
    ) -> Result<CheckoutEntry> {
        let account = practice.sessions.require_session()?;
        if Plan::of(&account) == Plan::Pro {
            return Ok(CheckoutEntry::AlreadySubscribed(account));
        }

        tracing::debug!(account_id = %account.id(), "Checkout started");

        Ok(CheckoutEntry::Started(Self {
            account_id: account.id().clone(),
            pricing: PlanPricing::pro(),
            practice: practice.clone(),
            gateway,
            backend,
            step: Mutex::new(CheckoutStep::Offer),
            confirmed: Mutex::new(None),
            last_error: Mutex::new(None),
            busy: AtomicBool::new(false),
        }))
    }

    pub const fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub const fn pricing(&self) -> &PlanPricing {
        &self.pricing
    }

    pub fn step(&self) -> CheckoutStep {
        lock(&self.step).clone()
    }

    /// Receipt, once the flow has completed
    pub fn receipt(&self) -> Option<Receipt> {
        match &*lock(&self.step) {
            CheckoutStep::Receipt(receipt) => Some(receipt.clone()),
            _ => None,
        }
    }

    /// Message from the most recent failed action
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Whether a submission is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Offer → Capture
    pub fn upgrade(&self) -> Result<()> {
        self.transition("upgrade", &CheckoutStep::Offer, CheckoutStep::Capture)
    }

    /// Capture → Offer
    pub fn back(&self) -> Result<()> {
        if self.is_busy() {
            return self.record(Err(PaymentError::Busy));
        }
        self.transition("go back", &CheckoutStep::Capture, CheckoutStep::Offer)
    }

    /// Capture → Receipt
    ///
    /// Any failure leaves the flow in Capture with the error recorded.
    pub async fn submit_payment(&self, card: &CardDetails) -> Result<Receipt> {
        let result = self.process(card).await;
        self.record(result)
    }

    fn transition(&self, action: &'static str, from: &CheckoutStep, to: CheckoutStep) -> Result<()> {
        let result = {
            let mut step = lock(&self.step);
            if &*step == from {
                *step = to;
                Ok(())
            } else {
                Err(PaymentError::InvalidTransition {
                    action,
                    step: step.name(),
                })
            }
        };
        self.record(result)
    }

    fn ensure_capture(&self) -> Result<()> {
        let step = lock(&self.step);
        if *step == CheckoutStep::Capture {
            Ok(())
        } else {
            Err(PaymentError::InvalidTransition {
                action: "submit payment",
                step: step.name(),
            })
        }
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        *lock(&self.last_error) = result.as_ref().err().map(PaymentError::user_message);
        result
    }

    /// Session must still belong to the account this flow was entered for
    fn ensure_session(&self) -> Result<()> {
        let account = self.practice.sessions.require_session()?;
        if account.id() == &self.account_id {
            Ok(())
        } else {
            tracing::warn!(
                account_id = %self.account_id,
                session_account_id = %account.id(),
                "Checkout belongs to another account"
            );
            Err(CoreError::Unauthenticated.into())
        }
    }

    async fn process(&self, card: &CardDetails) -> Result<Receipt> {
        self.ensure_capture()?;
        let _busy = BusyGuard::acquire(&self.busy).ok_or(PaymentError::Busy)?;
        self.ensure_session()?;

        let pending = lock(&self.confirmed).clone();
        let receipt = match pending {
            Some(receipt) => {
                tracing::info!(
                    account_id = %self.account_id,
                    transaction_id = %receipt.transaction_id,
                    "Retrying promotion for confirmed payment"
                );
                receipt
            }
            None => {
                let receipt = self.charge(card).await?;
                *lock(&self.confirmed) = Some(receipt.clone());
                receipt
            }
        };

        self.finalize(receipt)
    }

    /// Validate, authorize and confirm; nothing is persisted here
    async fn charge(&self, card: &CardDetails) -> Result<Receipt> {
        let card = card.validate()?;
        let charge = Charge {
            amount_cents: self.pricing.cents,
            currency: self.pricing.currency.clone(),
            card_last4: card.last4().to_string(),
        };

        tracing::info!(
            account_id = %self.account_id,
            gateway = self.gateway.name(),
            amount_cents = charge.amount_cents,
            "Authorizing payment"
        );

        let transaction_id = match self.gateway.authorize(&charge).await? {
            Authorization::Approved { transaction_id } => transaction_id,
            Authorization::Declined => {
                tracing::warn!(account_id = %self.account_id, "Payment declined");
                return Err(PaymentError::Declined);
            }
        };

        self.backend
            .confirm(&CheckoutRequest::from(&self.pricing))
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    account_id = %self.account_id,
                    backend = self.backend.name(),
                    error = %e,
                    "Payment not confirmed, account left on current plan"
                );
            })?;

        Ok(Receipt::new(&self.pricing, transaction_id, card.last4()))
    }

    /// Promote the account for a confirmed charge and move to Receipt
    fn finalize(&self, receipt: Receipt) -> Result<Receipt> {
        self.ensure_session()?;
        let account = self
            .practice
            .accounts
            .promote_to_pro(&self.account_id)
            .inspect_err(|e| {
                tracing::error!(
                    account_id = %self.account_id,
                    transaction_id = %receipt.transaction_id,
                    error = %e,
                    "Confirmed payment not applied"
                );
            })?;
        self.practice.sessions.refresh_session_snapshot(&account)?;

        *lock(&self.confirmed) = None;
        *lock(&self.step) = CheckoutStep::Receipt(receipt.clone());

        tracing::info!(
            account_id = %self.account_id,
            transaction_id = %receipt.transaction_id,
            plan = %receipt.plan,
            "Checkout completed"
        );
        Ok(receipt)
    }
}
