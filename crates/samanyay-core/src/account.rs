//! Account Registry
//!
//! Registered accounts live as one JSON list under the `accounts` key and are
//! unique by email (case-sensitive).

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::credentials::{hash_password, verify_password};
use crate::error::{CoreError, Result};
use crate::store::{Store, keys};

/// Email of the seeded demonstration account
pub const DEMO_EMAIL: &str = "demo@lawfirm.com";

/// Password of the seeded demonstration account
pub const DEMO_PASSWORD: &str = "demo123";

/// Fixed id of the seeded demonstration account
pub const DEMO_ACCOUNT_ID: &str = "demo-user";

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Unique account identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    id: AccountId,

    pub first_name: String,

    pub last_name: String,

    pub email: String,

    password_hash: String,

    is_pro: bool,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a free-tier account with a fresh id
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self::with_id(AccountId::new(), first_name, last_name, email, password_hash)
    }

    /// Create a free-tier account with a caller-chosen id
    pub fn with_id(
        id: AccountId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            is_pro: false,
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> &AccountId {
        &self.id
    }

    pub const fn is_pro(&self) -> bool {
        self.is_pro
    }

    pub fn is_demo(&self) -> bool {
        self.email == DEMO_EMAIL
    }

    fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Sign-up form as submitted by the user
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Check the form-level rules, including the password confirmation
    pub fn validate(&self) -> Result<()> {
        validate_registration(&self.first_name, &self.last_name, &self.email, &self.password)?;
        if self.password != self.confirm_password {
            return Err(CoreError::Validation("Passwords do not match".into()));
        }
        Ok(())
    }
}

fn validate_registration(first_name: &str, last_name: &str, email: &str, password: &str) -> Result<()> {
    if [first_name, last_name, email, password]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(CoreError::Validation("All fields are required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(CoreError::Validation("Please enter a valid email address".into()));
    }
    Ok(())
}

/// Registry of accounts keyed by email
#[derive(Clone)]
pub struct AccountRegistry {
    store: Store,
}

impl AccountRegistry {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// All registered accounts, in registration order
    pub fn list(&self) -> Result<Vec<Account>> {
        self.store.load(keys::ACCOUNTS)
    }

    pub fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.list()?.into_iter().find(|a| &a.id == id))
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.list()?.into_iter().find(|a| a.email == email))
    }

    /// Seed the demonstration account unless it already exists
    ///
    /// Returns `true` when the account was created by this call.
    pub fn bootstrap_demo_account(&self) -> Result<bool> {
        if self.find_by_email(DEMO_EMAIL)?.is_some() {
            return Ok(false);
        }
        let password_hash = hash_password(DEMO_PASSWORD)?;

        let created = self.store.update(keys::ACCOUNTS, |accounts: &mut Vec<Account>| {
            if accounts.iter().any(|a| a.email == DEMO_EMAIL) {
                return Ok(false);
            }
            accounts.push(Account::with_id(
                AccountId::from_string(DEMO_ACCOUNT_ID),
                "Demo",
                "User",
                DEMO_EMAIL,
                password_hash,
            ));
            Ok(true)
        })?;

        if created {
            tracing::info!(email = DEMO_EMAIL, "Seeded demo account");
        }
        Ok(created)
    }

    /// Register a new free-tier account
    pub fn register(&self, first_name: &str, last_name: &str, email: &str, password: &str) -> Result<Account> {
        validate_registration(first_name, last_name, email, password)?;
        let password_hash = hash_password(password)?;
        let account = Account::new(first_name.trim(), last_name.trim(), email, password_hash);

        self.store.update(keys::ACCOUNTS, |accounts: &mut Vec<Account>| {
            if accounts.iter().any(|a| a.email == email) {
                return Err(CoreError::Conflict(email.to_string()));
            }
            accounts.push(account.clone());
            Ok(())
        })?;

        tracing::info!(account_id = %account.id, email = %account.email, "Registered account");
        Ok(account)
    }

    /// Resolve an email/password pair to its account
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Account> {
        self.find_by_email(email)?
            .filter(|account| account.check_password(password))
            .ok_or(CoreError::InvalidCredentials)
    }

    /// Move an account to the Pro tier; promoting a Pro account is a no-op
    pub fn promote_to_pro(&self, id: &AccountId) -> Result<Account> {
        let account = self.store.update(keys::ACCOUNTS, |accounts: &mut Vec<Account>| {
            let account = accounts
                .iter_mut()
                .find(|a| &a.id == id)
                .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
            account.is_pro = true;
            Ok(account.clone())
        })?;

        tracing::info!(account_id = %id, "Account promoted to Pro");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AccountRegistry {
        AccountRegistry::new(Store::memory())
    }

    #[test]
    fn test_register_and_authenticate() {
        let registry = registry();
        let account = registry.register("Alice", "Law", "alice@firm.com", "secret1").unwrap();
        assert!(!account.is_pro());

        let found = registry.authenticate("alice@firm.com", "secret1").unwrap();
        assert_eq!(found.id(), account.id());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let registry = registry();
        registry.register("Alice", "Law", "alice@firm.com", "secret1").unwrap();

        let err = registry.register("Other", "Alice", "alice@firm.com", "secret2").unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_email_match_is_case_sensitive() {
        let registry = registry();
        registry.register("Alice", "Law", "alice@firm.com", "secret1").unwrap();
        registry.register("Alice", "Law", "Alice@firm.com", "secret1").unwrap();
        assert_eq!(registry.list().unwrap().len(), 2);
    }

    #[test]
    fn test_registration_validation() {
        let registry = registry();
        let cases = [
            ("", "Law", "a@b.co", "secret1", "All fields are required"),
            ("A", "Law", "a@b.co", "short", "at least 6"),
            ("A", "Law", "not-an-email", "secret1", "valid email"),
        ];
        for (first, last, email, password, expected) in cases {
            let err = registry.register(first, last, email, password).unwrap_err();
            assert!(err.user_message().contains(expected), "{err}");
        }
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_form_password_confirmation() {
        let form = RegistrationForm {
            first_name: "Alice".into(),
            last_name: "Law".into(),
            email: "alice@firm.com".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match");
    }

    #[test]
    fn test_authentication_errors_are_generic() {
        let registry = registry();
        registry.register("Alice", "Law", "alice@firm.com", "secret1").unwrap();

        let wrong_password = registry.authenticate("alice@firm.com", "nope").unwrap_err();
        let wrong_email = registry.authenticate("bob@firm.com", "secret1").unwrap_err();
        assert_eq!(wrong_password.user_message(), wrong_email.user_message());
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let registry = registry();
        assert!(registry.bootstrap_demo_account().unwrap());
        for _ in 0..3 {
            assert!(!registry.bootstrap_demo_account().unwrap());
        }

        let demos: Vec<_> = registry
            .list()
            .unwrap()
            .into_iter()
            .filter(Account::is_demo)
            .collect();
        assert_eq!(demos.len(), 1);
        assert_eq!(demos[0].id().as_str(), DEMO_ACCOUNT_ID);
        assert!(registry.authenticate(DEMO_EMAIL, DEMO_PASSWORD).is_ok());
    }

    #[test]
    fn test_promote_is_idempotent() {
        let registry = registry();
        let account = registry.register("Alice", "Law", "alice@firm.com", "secret1").unwrap();

        assert!(registry.promote_to_pro(account.id()).unwrap().is_pro());
        assert!(registry.promote_to_pro(account.id()).unwrap().is_pro());
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_promote_unknown_account() {
        let err = registry()
            .promote_to_pro(&AccountId::from_string("missing"))
            .unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound(_)));
    }

    #[test]
    fn test_password_is_not_stored_in_cleartext() {
        let store = Store::memory();
        let registry = AccountRegistry::new(store.clone());
        registry.register("Alice", "Law", "alice@firm.com", "secret1").unwrap();

        let raw: serde_json::Value = store.load(keys::ACCOUNTS).unwrap();
        let text = raw.to_string();
        assert!(!text.contains("secret1"));
        assert!(text.contains("passwordHash"));
        assert!(text.contains("\"isPro\":false"));
    }
}
