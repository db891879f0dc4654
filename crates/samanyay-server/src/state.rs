//! Application State

use std::sync::{Arc, Mutex};

use samanyay_core::Practice;
use samanyay_payments::{Checkout, PaymentBackend, PaymentGateway};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Accounts, session and cases over the profile store
    pub practice: Practice,

    /// Card authorization (simulated)
    pub gateway: Arc<dyn PaymentGateway>,

    /// Remote confirmation of approved charges
    pub backend: Arc<dyn PaymentBackend>,

    /// Checkout in progress for the signed-in account, if any
    pub checkout: Arc<Mutex<Option<Arc<Checkout>>>>,
}

impl AppState {
    pub fn new(
        practice: Practice,
        gateway: Arc<dyn PaymentGateway>,
        backend: Arc<dyn PaymentBackend>,
    ) -> Self {
        Self {
            practice,
            gateway,
            backend,
            checkout: Arc::new(Mutex::new(None)),
        }
    }

    /// Drop any checkout in progress (on sign-in/sign-out)
    pub fn reset_checkout(&self) {
        let mut checkout = self
            .checkout
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *checkout = None;
    }
}
