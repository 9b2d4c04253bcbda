//! shared-config-service library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::sync_core::{CoreState, SyncCore, UpdateError};
pub use domain::settings::ServiceSettings;
pub use infrastructure::storage::store::{ConfigStore, PersistenceError};
