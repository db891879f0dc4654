//! Session Management
//!
//! Tracks which account, if any, is signed in. The session stores only the
//! account id; every read resolves the account through the registry so tier
//! or profile changes are visible immediately.

use crate::account::{Account, AccountId, AccountRegistry};
use crate::error::{CoreError, Result};
use crate::store::{Store, keys};

/// Current-session tracker
#[derive(Clone)]
pub struct SessionManager {
    store: Store,
    accounts: AccountRegistry,
}

impl SessionManager {
    pub const fn new(store: Store, accounts: AccountRegistry) -> Self {
        Self { store, accounts }
    }

    /// Make `account` the signed-in account
    pub fn start_session(&self, account: &Account) -> Result<()> {
        self.store.save(keys::CURRENT_SESSION, account.id())?;
        tracing::debug!(account_id = %account.id(), "Session started");
        Ok(())
    }

    /// The signed-in account, or `None` when nobody is signed in
    ///
    /// A session pointing at an account that no longer exists is cleared.
    pub fn current_session(&self) -> Result<Option<Account>> {
        let Some(id) = self.store.load_opt::<AccountId>(keys::CURRENT_SESSION)? else {
            return Ok(None);
        };

        match self.accounts.find_by_id(&id)? {
            Some(account) => Ok(Some(account)),
            None => {
                tracing::warn!(account_id = %id, "Session refers to a missing account, clearing");
                self.end_session()?;
                Ok(None)
            }
        }
    }

    /// Like [`current_session`](Self::current_session) but fails with
    /// [`CoreError::Unauthenticated`] when nobody is signed in
    pub fn require_session(&self) -> Result<Account> {
        self.current_session()?.ok_or(CoreError::Unauthenticated)
    }

    pub fn end_session(&self) -> Result<()> {
        self.store.remove(keys::CURRENT_SESSION)
    }

    /// Re-point the session after `updated` changed
    ///
    /// Only applies when `updated` is the signed-in account. Returns whether
    /// the session was touched.
    pub fn refresh_session_snapshot(&self, updated: &Account) -> Result<bool> {
        match self.store.load_opt::<AccountId>(keys::CURRENT_SESSION)? {
            Some(id) if &id == updated.id() => {
                self.store.save(keys::CURRENT_SESSION, updated.id())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
