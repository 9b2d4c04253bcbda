//! Domain types for the configuration service host.
//!
//! - **`settings`** – [`settings::ServiceSettings`]: where the shared file
//!   lives and how long to debounce change notifications.

pub mod settings;

pub use settings::{ServiceSettings, SettingsError, SettingsFile};
