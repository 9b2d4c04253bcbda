//! Codec for the on-disk configuration document.
//!
//! Document layout:
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <configuration>
//!   <appSettings>
//!     <add key="AppName" value="..."/>
//!     <add key="DatabaseConnection" value="..."/>
//!     <add key="ApiTimeout" value="30"/>
//!     <add key="EnableLogging" value="true"/>
//!     <add key="MaxUsers" value="100"/>
//!   </appSettings>
//! </configuration>
//! ```
//!
//! Element names, key names and their casing are shared with every other
//! reader of the file and must not change.

pub mod xml;

/// Root element of the document.
pub const ROOT_ELEMENT: &str = "configuration";
/// Section holding the key/value entries.
pub const SETTINGS_ELEMENT: &str = "appSettings";
/// One key/value entry inside the settings section.
pub const ENTRY_ELEMENT: &str = "add";
/// Attribute naming the entry.
pub const KEY_ATTRIBUTE: &str = "key";
/// Attribute carrying the entry's value.
pub const VALUE_ATTRIBUTE: &str = "value";

pub const APP_NAME_KEY: &str = "AppName";
pub const DATABASE_CONNECTION_KEY: &str = "DatabaseConnection";
pub const API_TIMEOUT_KEY: &str = "ApiTimeout";
pub const ENABLE_LOGGING_KEY: &str = "EnableLogging";
pub const MAX_USERS_KEY: &str = "MaxUsers";
