//! The configuration record shared through the on-disk document.
//!
//! A [`ConfigRecord`] is built in one of three ways:
//!
//! - from defaults ([`ConfigRecord::default`]) when a field or the whole
//!   document cannot be read,
//! - from the bootstrap values ([`ConfigRecord::bootstrap`]) when the file does
//!   not exist yet,
//! - from values submitted by a caller that wants to update the store.
//!
//! `last_updated` is owned by the store: it reflects the file's modification
//! time on load and the moment of the write on update.  Callers may put any
//! value there; it is overwritten before anything reaches disk.

use std::ops::RangeInclusive;
use std::time::SystemTime;

use thiserror::Error;

/// Accepted range for [`ConfigRecord::api_timeout`], in seconds.
pub const API_TIMEOUT_RANGE: RangeInclusive<i32> = 1..=300;

/// Accepted range for [`ConfigRecord::max_users`].
pub const MAX_USERS_RANGE: RangeInclusive<i32> = 1..=10_000;

/// Fallback values used when the document is missing a field.
pub const DEFAULT_APP_NAME: &str = "Default App";
pub const DEFAULT_DATABASE_CONNECTION: &str = "Server=localhost;Database=DefaultDB;";
pub const DEFAULT_API_TIMEOUT: i32 = 30;
pub const DEFAULT_ENABLE_LOGGING: bool = false;
pub const DEFAULT_MAX_USERS: i32 = 100;

/// Values written when the configuration file is created for the first time.
pub const BOOTSTRAP_APP_NAME: &str = "Shared Config Demo";
pub const BOOTSTRAP_DATABASE_CONNECTION: &str = "Server=localhost;Database=MyApp;";

/// A record rejected by [`ConfigRecord::validate`].
///
/// Only the first violated constraint is reported, checked in field order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// `app_name` is empty or whitespace only.
    #[error("application name must not be empty")]
    EmptyAppName,

    /// `database_connection` is empty or whitespace only.
    #[error("database connection must not be empty")]
    EmptyDatabaseConnection,

    /// A text field holds a control character that XML 1.0 cannot carry.
    /// Tab, line feed and carriage return are allowed.
    #[error("{field} must not contain control character U+{code:04X}")]
    ControlCharacter { field: &'static str, code: u32 },

    /// `api_timeout` is outside `1..=300`.
    #[error("API timeout must be between 1 and 300 seconds, got {0}")]
    ApiTimeoutOutOfRange(i32),

    /// `max_users` is outside `1..=10000`.
    #[error("maximum users must be between 1 and 10000, got {0}")]
    MaxUsersOutOfRange(i32),
}

/// Application settings persisted in the shared configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    /// Display name of the application.
    pub app_name: String,
    /// Connection string handed to the database driver.
    pub database_connection: String,
    /// Upstream API timeout in seconds.
    pub api_timeout: i32,
    /// Whether the application should emit logs.
    pub enable_logging: bool,
    /// Maximum number of concurrent users.
    pub max_users: i32,
    /// When the persisted file last changed.  Set by the store, never by callers.
    pub last_updated: SystemTime,
}

impl Default for ConfigRecord {
    /// Returns the per-field fallback values used while decoding.
    ///
    /// | Field               | Default                                  |
    /// |---------------------|------------------------------------------|
    /// | app_name            | `Default App`                            |
    /// | database_connection | `Server=localhost;Database=DefaultDB;`   |
    /// | api_timeout         | 30                                       |
    /// | enable_logging      | false                                    |
    /// | max_users           | 100                                      |
    /// | last_updated        | UNIX epoch                               |
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            database_connection: DEFAULT_DATABASE_CONNECTION.to_string(),
            api_timeout: DEFAULT_API_TIMEOUT,
            enable_logging: DEFAULT_ENABLE_LOGGING,
            max_users: DEFAULT_MAX_USERS,
            last_updated: SystemTime::UNIX_EPOCH,
        }
    }
}

impl ConfigRecord {
    /// The record written when no configuration file exists yet.
    pub fn bootstrap() -> Self {
        Self {
            app_name: BOOTSTRAP_APP_NAME.to_string(),
            database_connection: BOOTSTRAP_DATABASE_CONNECTION.to_string(),
            api_timeout: 30,
            enable_logging: true,
            max_users: 100,
            last_updated: SystemTime::UNIX_EPOCH,
        }
    }

    /// Checks every field constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, in field order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.app_name.trim().is_empty() {
            return Err(ValidationError::EmptyAppName);
        }
        check_characters("AppName", &self.app_name)?;
        if self.database_connection.trim().is_empty() {
            return Err(ValidationError::EmptyDatabaseConnection);
        }
        check_characters("DatabaseConnection", &self.database_connection)?;
        if !API_TIMEOUT_RANGE.contains(&self.api_timeout) {
            return Err(ValidationError::ApiTimeoutOutOfRange(self.api_timeout));
        }
        if !MAX_USERS_RANGE.contains(&self.max_users) {
            return Err(ValidationError::MaxUsersOutOfRange(self.max_users));
        }
        Ok(())
    }

    /// Returns `true` when two records hold the same settings, ignoring
    /// `last_updated`.
    pub fn same_settings(&self, other: &Self) -> bool {
        self.app_name == other.app_name
            && self.database_connection == other.database_connection
            && self.api_timeout == other.api_timeout
            && self.enable_logging == other.enable_logging
            && self.max_users == other.max_users
    }
}

/// Rejects C0 control characters other than tab, line feed and carriage
/// return.  The document cannot represent them, not even escaped.
fn check_characters(field: &'static str, value: &str) -> Result<(), ValidationError> {
    match value
        .chars()
        .find(|&c| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{7f}'))
    {
        Some(c) => Err(ValidationError::ControlCharacter {
            field,
            code: u32::from(c),
        }),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
