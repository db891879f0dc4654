//! Practice facade
//!
//! Bundles the registry, session manager and case repository over one shared
//! store and exposes the session-gated operations used by the UI surface.

use std::path::PathBuf;
use std::sync::Arc;

use crate::account::{Account, AccountRegistry, RegistrationForm};
use crate::case::{AttachedFile, Case, CaseRepository, filter_cases};
use crate::error::Result;
use crate::session::SessionManager;
use crate::store::{DEFAULT_NAMESPACE, FileStore, KeyValueStore, MemoryStore, Store};

/// Where and how the practice persists its data
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// JSON file backing the store; `None` keeps everything in memory
    pub path: Option<PathBuf>,

    /// Prefix applied to every key
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            namespace: DEFAULT_NAMESPACE.into(),
        }
    }
}

impl StoreConfig {
    /// Read `SAMANYAY_STORE_PATH` and `SAMANYAY_NAMESPACE`
    pub fn from_env() -> Self {
        let path = std::env::var("SAMANYAY_STORE_PATH").ok().map(PathBuf::from);
        let namespace = std::env::var("SAMANYAY_NAMESPACE")
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.into());

        Self { path, namespace }
    }

    /// Open the configured backend
    pub fn open(&self) -> Result<Store> {
        let backend: Arc<dyn KeyValueStore> = match &self.path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Store::with_namespace(backend, self.namespace.clone()))
    }
}

/// Accounts, the current session and cases over one store
#[derive(Clone)]
pub struct Practice {
    pub accounts: AccountRegistry,
    pub sessions: SessionManager,
    pub cases: CaseRepository,
}

impl Practice {
    /// Wire the components and seed the demo account
    pub fn bootstrap(store: Store) -> Result<Self> {
        let accounts = AccountRegistry::new(store.clone());
        let sessions = SessionManager::new(store.clone(), accounts.clone());
        let cases = CaseRepository::new(store);

        accounts.bootstrap_demo_account()?;

        Ok(Self {
            accounts,
            sessions,
            cases,
        })
    }

    /// Register from the sign-up form and sign the new account in
    pub fn sign_up(&self, form: &RegistrationForm) -> Result<Account> {
        form.validate()?;
        let account = self
            .accounts
            .register(&form.first_name, &form.last_name, &form.email, &form.password)?;
        self.sessions.start_session(&account)?;
        Ok(account)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Account> {
        let account = self.accounts.authenticate(email, password).inspect_err(|_| {
            tracing::debug!(email = %email, "Sign-in rejected");
        })?;
        self.sessions.start_session(&account)?;
        Ok(account)
    }

    pub fn sign_out(&self) -> Result<()> {
        self.sessions.end_session()
    }

    /// Cases of the signed-in account matching `query`
    pub fn my_cases(&self, query: &str) -> Result<Vec<Case>> {
        let account = self.sessions.require_session()?;
        let cases = self.cases.load_for(&account)?;
        Ok(filter_cases(&cases, query))
    }

    /// Create a case for the signed-in account
    pub fn open_case(&self, title: &str, description: &str, attached_files: Vec<AttachedFile>) -> Result<Case> {
        let account = self.sessions.require_session()?;
        self.cases
            .create_case(account.id(), title, description, attached_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{DEMO_EMAIL, DEMO_PASSWORD};
    use crate::error::CoreError;

    fn form(email: &str) -> RegistrationForm {
        RegistrationForm {
            first_name: "Alice".into(),
            last_name: "Law".into(),
            email: email.into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[test]
    fn test_bootstrap_seeds_demo_account_once() {
        let store = Store::memory();
        Practice::bootstrap(store.clone()).unwrap();
        let practice = Practice::bootstrap(store).unwrap();

        let accounts = practice.accounts.list().unwrap();
        assert_eq!(accounts.iter().filter(|a| a.email == DEMO_EMAIL).count(), 1);
    }

    #[test]
    fn test_sign_up_starts_session() {
        let practice = Practice::bootstrap(Store::memory()).unwrap();
        let account = practice.sign_up(&form("alice@firm.com")).unwrap();

        let current = practice.sessions.require_session().unwrap();
        assert_eq!(current.id(), account.id());
        assert!(!current.is_pro());
    }

    #[test]
    fn test_protected_operations_require_session() {
        let practice = Practice::bootstrap(Store::memory()).unwrap();
        assert!(matches!(practice.my_cases("").unwrap_err(), CoreError::Unauthenticated));
        assert!(matches!(
            practice.open_case("t", "d", Vec::new()).unwrap_err(),
            CoreError::Unauthenticated
        ));
    }

    #[test]
    fn test_case_flow_for_signed_in_account() {
        let practice = Practice::bootstrap(Store::memory()).unwrap();
        practice.sign_up(&form("alice@firm.com")).unwrap();

        practice.open_case("Roe v. Doe", "...", Vec::new()).unwrap();
        assert_eq!(practice.my_cases("").unwrap().len(), 1);
        assert_eq!(practice.my_cases("roe").unwrap().len(), 1);
        assert!(practice.my_cases("smith").unwrap().is_empty());

        practice.sign_out().unwrap();
        assert!(practice.sessions.current_session().unwrap().is_none());
    }

    #[test]
    fn test_demo_sign_in_sees_seeded_case() {
        let practice = Practice::bootstrap(Store::memory()).unwrap();
        practice.sign_in(DEMO_EMAIL, DEMO_PASSWORD).unwrap();

        let cases = practice.my_cases("").unwrap();
        assert_eq!(cases.len(), 1);
        assert!(cases[0].title.contains("Smith vs. Johnson"));
    }

    #[test]
    fn test_failed_sign_in_leaves_no_session() {
        let practice = Practice::bootstrap(Store::memory()).unwrap();
        let err = practice.sign_in(DEMO_EMAIL, "wrong").unwrap_err();
        assert!(matches!(err, CoreError::InvalidCredentials));
        assert!(practice.sessions.current_session().unwrap().is_none());
    }

    #[test]
    fn test_store_config_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            path: Some(dir.path().join("store.json")),
            namespace: "test".into(),
        };

        let practice = Practice::bootstrap(config.open().unwrap()).unwrap();
        practice.sign_up(&form("alice@firm.com")).unwrap();

        let reopened = Practice::bootstrap(config.open().unwrap()).unwrap();
        assert!(reopened.accounts.find_by_email("alice@firm.com").unwrap().is_some());
        assert!(reopened.sessions.current_session().unwrap().is_some());
    }
}
