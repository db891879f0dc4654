//! # samanyay-core
//!
//! Persistent state engine for the Samanyay practice tool: accounts, the
//! current session and per-account case records, all kept in one flat
//! namespaced key/value store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Practice                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │   Session    │──│   Account    │  │      Case      │  │
//! │  │   Manager    │  │   Registry   │  │   Repository   │  │
//! │  └──────────────┘  └──────────────┘  └────────────────┘  │
//! │           └───────────────┬──────────────────┘           │
//! │                    Store (KeyValueStore)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The `KeyValueStore` trait is injected, so the same logic runs over an
//! in-memory map in tests and a JSON file on disk in the server.

pub mod account;
pub mod case;
pub mod credentials;
pub mod error;
pub mod practice;
pub mod session;
pub mod store;

pub use account::{Account, AccountId, AccountRegistry, RegistrationForm};
pub use case::{AttachedFile, Case, CaseId, CaseRepository, CaseStatus, filter_cases};
pub use error::{CoreError, Result};
pub use practice::{Practice, StoreConfig};
pub use session::SessionManager;
pub use store::{FileStore, KeyValueStore, MemoryStore, Store};
