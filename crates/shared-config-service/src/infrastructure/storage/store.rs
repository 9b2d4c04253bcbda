//! File-backed persistence for [`ConfigRecord`].
//!
//! # Atomic replacement
//!
//! [`ConfigStore::save`] never writes the target file in place.  It writes a
//! uniquely named sibling (`<name>.<random>.tmp`), flushes it to disk and
//! renames it over the target.  A rename within one directory is atomic, so
//! any reader, in this process or another, sees either the old document or
//! the new one.  Each save owns its temporary file, so concurrent writers
//! never clobber each other's half-written output; the last rename wins.
//!
//! # Timestamps
//!
//! `last_updated` on a loaded record is the file's modification time, not a
//! value from the document.  `save` sets the temporary file's modification
//! time to the record's `last_updated` before the rename, so a record read
//! back after an update carries exactly the stamp the update assigned.  A
//! file touched by an external editor gets that editor's write time.
//!
//! # Failure policy
//!
//! Reading never fails: an unreadable file yields the default record and a
//! damaged document yields per-field defaults, both logged.  Writing failures
//! are returned to the caller as [`PersistenceError`].

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use shared_config_core::{decode_document, encode_document, ConfigRecord, DecodeIssue, EncodeError};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{error, info, warn};

/// Error type for writes to the configuration file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A file system I/O error occurred.
    #[error("I/O error writing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Owns the path of the shared configuration document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for `path`.  Relative paths are resolved against the
    /// current working directory once, here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: absolutize(path.into()),
        }
    }

    /// Absolute path of the configuration document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and, if the document does not exist,
    /// writes [`ConfigRecord::bootstrap`] stamped with the current time.
    ///
    /// Returns `true` when the document was created.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the directory or file cannot be created.
    pub fn ensure_bootstrap(&self) -> Result<bool, PersistenceError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| PersistenceError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        if self.path.exists() {
            return Ok(false);
        }

        let record = ConfigRecord {
            last_updated: SystemTime::now(),
            ..ConfigRecord::bootstrap()
        };
        self.save(&record)?;
        info!(path = %self.path.display(), "created initial configuration file");
        Ok(true)
    }

    /// Reads the document, defaulting whatever cannot be read.
    pub fn load(&self) -> ConfigRecord {
        let (text, modified) = match self.read() {
            Ok(pair) => pair,
            Err(source) => {
                error!(
                    path = %self.path.display(),
                    error = %source,
                    "error loading configuration; using defaults"
                );
                return ConfigRecord {
                    last_updated: SystemTime::now(),
                    ..ConfigRecord::default()
                };
            }
        };

        let decoded = decode_document(&text);
        for issue in &decoded.issues {
            match issue {
                DecodeIssue::Malformed(_) => {
                    error!(path = %self.path.display(), "{issue}; using defaults")
                }
                _ => warn!(path = %self.path.display(), "{issue}; using default value"),
            }
        }

        ConfigRecord {
            last_updated: modified,
            ..decoded.record
        }
    }

    /// Atomically replaces the document with `record`.  The file's
    /// modification time is set to `record.last_updated`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] for file-system failures or
    /// [`PersistenceError::Encode`] if the record cannot be encoded.
    pub fn save(&self, record: &ConfigRecord) -> Result<(), PersistenceError> {
        let text = encode_document(record)?;
        let dir = self.directory();

        let temp = self
            .write_temp(dir, &text, record.last_updated)
            .map_err(|source| PersistenceError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

        // On failure the temporary file is removed when `e.file` drops.
        temp.persist(&self.path)
            .map(|_| ())
            .map_err(|e| PersistenceError::Io {
                path: self.path.clone(),
                source: e.error,
            })
    }

    /// Reads the document together with the modification time of the same
    /// open file, so both describe one version of it.
    fn read(&self) -> io::Result<(String, SystemTime)> {
        let mut file = File::open(&self.path)?;
        let modified = file.metadata()?.modified()?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        Ok((text, modified))
    }

    /// Writes `text` into a fresh temporary file next to the document.  The
    /// file is deleted again if anything fails before it is persisted.
    fn write_temp(&self, dir: &Path, text: &str, modified: SystemTime) -> io::Result<NamedTempFile> {
        let prefix = temp_prefix(&self.path);
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)?;
        temp.write_all(text.as_bytes())?;

        // Temporary files are created owner-only; keep the document's mode.
        if let Ok(metadata) = fs::metadata(&self.path) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }
        temp.as_file().set_modified(modified)?;
        temp.as_file().sync_all()?;
        Ok(temp)
    }

    fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

/// `config.xml` → `config.xml.`, so temporary files sort next to the document.
fn temp_prefix(path: &Path) -> OsString {
    let mut prefix = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    prefix.push(".");
    prefix
}

// ── Tests ─────────────────────────────────────────────────────────────────────
