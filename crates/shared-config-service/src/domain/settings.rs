//! Host settings for the configuration service.
//!
//! [`ServiceSettings`] is the single source of truth for how the service is
//! wired: which file it shares and how long it waits for a burst of change
//! notifications to settle.  It is assembled once at startup from three
//! layers, highest priority first:
//!
//! 1. CLI flags and their environment variables (`SHARED_CONFIG_PATH`,
//!    `SHARED_CONFIG_DEBOUNCE_MS`),
//! 2. an optional TOML settings file,
//! 3. built-in defaults.
//!
//! ```toml
//! config_path = "/srv/app/SharedData/config.xml"
//! debounce_ms = 250
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Delay between a change notification and the reload it schedules.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Directory, relative to the working directory, holding the default file.
pub const DEFAULT_DATA_DIR: &str = "SharedData";

/// File name of the default shared configuration document.
pub const DEFAULT_FILE_NAME: &str = "config.xml";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has unknown keys.
    #[error("failed to parse settings TOML at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runtime settings for the configuration service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Path of the shared configuration document.
    pub config_path: PathBuf,
    /// Debounce window applied to change notifications.
    pub debounce: Duration,
}

impl Default for ServiceSettings {
    /// | Field       | Default                       |
    /// |-------------|-------------------------------|
    /// | config_path | `<cwd>/SharedData/config.xml` |
    /// | debounce    | 100 ms                        |
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl ServiceSettings {
    /// Layers the settings file over the defaults, then explicit overrides
    /// (CLI flags or environment) over both.
    pub fn resolve(
        file: Option<SettingsFile>,
        config_path: Option<PathBuf>,
        debounce_ms: Option<u64>,
    ) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        Self {
            config_path: config_path
                .or(file.config_path)
                .unwrap_or(defaults.config_path),
            debounce: debounce_ms
                .or(file.debounce_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
        }
    }
}

/// Contents of the optional TOML settings file.  Absent keys keep lower
/// layers' values.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    #[serde(default)]
    pub debounce_ms: Option<u64>,
}

impl SettingsFile {
    /// Reads and parses the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read and
    /// [`SettingsError::Parse`] if it is not a valid settings document.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<cwd>/SharedData/config.xml`, or the relative path when the working
/// directory cannot be determined.
pub fn default_config_path() -> PathBuf {
    let relative = Path::new(DEFAULT_DATA_DIR).join(DEFAULT_FILE_NAME);
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(relative),
        Err(_) => relative,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_is_under_shared_data() {
        let settings = ServiceSettings::default();
        assert!(settings.config_path.ends_with("SharedData/config.xml"));
    }

    #[test]
    fn test_default_debounce_is_100ms() {
        assert_eq!(ServiceSettings::default().debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_resolve_without_overrides_uses_defaults() {
        assert_eq!(ServiceSettings::resolve(None, None, None), ServiceSettings::default());
    }

    #[test]
    fn test_resolve_file_overrides_defaults() {
        // Arrange
        let file = SettingsFile {
            config_path: Some(PathBuf::from("/srv/shared/config.xml")),
            debounce_ms: Some(250),
        };

        // Act
        let settings = ServiceSettings::resolve(Some(file), None, None);

        // Assert
        assert_eq!(settings.config_path, PathBuf::from("/srv/shared/config.xml"));
        assert_eq!(settings.debounce, Duration::from_millis(250));
    }

    #[test]
    fn test_resolve_explicit_values_override_file() {
        let file = SettingsFile {
            config_path: Some(PathBuf::from("/from/file.xml")),
            debounce_ms: Some(250),
        };
        let settings =
            ServiceSettings::resolve(Some(file), Some(PathBuf::from("/from/cli.xml")), Some(10));
        assert_eq!(settings.config_path, PathBuf::from("/from/cli.xml"));
        assert_eq!(settings.debounce, Duration::from_millis(10));
    }

    #[test]
    fn test_partial_settings_file_keeps_other_defaults() {
        let file: SettingsFile = toml::from_str("debounce_ms = 40").expect("parse");
        let settings = ServiceSettings::resolve(Some(file), None, None);
        assert_eq!(settings.debounce, Duration::from_millis(40));
        assert_eq!(settings.config_path, default_config_path());
    }

    #[test]
    fn test_settings_file_rejects_unknown_keys() {
        let result: Result<SettingsFile, _> = toml::from_str("debounce = 40");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_settings_file_returns_io_error() {
        let err = SettingsFile::load(Path::new("/nonexistent/shared-config/settings.toml"))
            .expect_err("missing file must fail");
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn test_load_settings_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "config_path = \"/tmp/x.xml\"\n").expect("write");

        let file = SettingsFile::load(&path).expect("load");

        assert_eq!(file.config_path, Some(PathBuf::from("/tmp/x.xml")));
        assert_eq!(file.debounce_ms, None);
    }
}
