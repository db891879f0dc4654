//! Case Repository
//!
//! Each account owns an ordered list of cases stored under
//! `cases.<accountId>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{Account, AccountId};
use crate::error::{CoreError, Result};
use crate::store::{Store, keys};

/// Id of the seeded demonstration case
pub const DEMO_CASE_ID: &str = "demo-1";

/// Unique case identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(String);

impl CaseId {
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

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a case
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Active,
    Pending,
    Closed,
}

/// Handle to a file attached to a case (name only, no content)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    pub name: String,
}

impl AttachedFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A legal matter owned by one account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub attached_files: Vec<AttachedFile>,
}

impl Case {
    /// Create an active case, rejecting blank title or description
    pub fn new(title: &str, description: &str, attached_files: Vec<AttachedFile>) -> Result<Self> {
        let (title, description) = (title.trim(), description.trim());
        if title.is_empty() || description.is_empty() {
            return Err(CoreError::Validation("Please fill in all fields".into()));
        }
        Ok(Self {
            id: CaseId::new(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            status: CaseStatus::Active,
            attached_files,
        })
    }

    fn demo() -> Self {
        Self {
            id: CaseId::from_string(DEMO_CASE_ID),
            title: "Smith vs. Johnson Contract Dispute".into(),
            description: "Commercial contract dispute regarding breach of terms in software \
                development agreement. Client seeks damages for delayed delivery and \
                non-conforming deliverables."
                .into(),
            created_at: Utc::now(),
            status: CaseStatus::Active,
            attached_files: Vec::new(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

/// Keep the cases whose title or description contains `query`, ignoring case
///
/// A blank query keeps everything. Order is preserved.
pub fn filter_cases(cases: &[Case], query: &str) -> Vec<Case> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return cases.to_vec();
    }
    cases.iter().filter(|c| c.matches(&needle)).cloned().collect()
}

/// Per-account case storage
#[derive(Clone)]
pub struct CaseRepository {
    store: Store,
}

impl CaseRepository {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn list_cases(&self, account_id: &AccountId) -> Result<Vec<Case>> {
        self.store.load(&keys::cases(account_id))
    }

    /// List an account's cases, seeding the demo case for the demo account
    /// the first time its list is found empty
    pub fn load_for(&self, account: &Account) -> Result<Vec<Case>> {
        if !account.is_demo() {
            return self.list_cases(account.id());
        }

        self.store.update(&keys::cases(account.id()), |cases: &mut Vec<Case>| {
            if cases.is_empty() {
                tracing::info!(account_id = %account.id(), "Seeding demo case");
                cases.push(Case::demo());
            }
            Ok(cases.clone())
        })
    }

    pub fn create_case(
        &self,
        account_id: &AccountId,
        title: &str,
        description: &str,
        attached_files: Vec<AttachedFile>,
    ) -> Result<Case> {
        let case = Case::new(title, description, attached_files)?;

        self.store.update(&keys::cases(account_id), |cases: &mut Vec<Case>| {
            cases.push(case.clone());
            Ok(())
        })?;

        tracing::debug!(
            account_id = %account_id,
            case_id = %case.id,
            files = case.attached_files.len(),
            "Created case"
        );
        Ok(case)
    }
}
