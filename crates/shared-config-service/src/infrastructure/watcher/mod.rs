//! File-change notification sources.
//!
//! The synchronization core only needs to know *that* the configuration file
//! may have changed.  Any source meeting this contract can drive it:
//!
//! - at least one [`ChangeSignal`] after every change to the file,
//! - signals may be duplicated, reordered or delayed by a small amount,
//! - signals carry no payload; the receiver re-reads the file itself.
//!
//! # Implementations
//!
//! - [`fs::FsNotifier`] – OS notifications through the `notify` crate.
//! - [`mock::MockNotifier`] – signals raised by hand, for tests.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use thiserror::Error;

pub mod fs;
pub mod mock;

/// "The watched file may have changed."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignal;

/// Error type for subscription setup.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The path has no directory component that could be watched.
    #[error("configuration path {0} has no parent directory to watch")]
    NoParentDirectory(PathBuf),

    /// The OS notification API refused the subscription.
    #[error("failed to watch {path}: {reason}")]
    Subscribe { path: PathBuf, reason: String },
}

/// Trait abstracting file-change notification.
///
/// The production implementation uses OS notifications; tests use
/// [`mock::MockNotifier`].
#[cfg_attr(test, mockall::automock)]
pub trait ChangeNotifier: Send {
    /// Starts sending a [`ChangeSignal`] into `sink` whenever `path` may have
    /// changed.  Replaces any earlier subscription.
    fn watch(&mut self, path: &Path, sink: Sender<ChangeSignal>) -> Result<(), WatchError>;

    /// Stops sending signals and drops `sink`, releasing all OS resources.
    fn unwatch(&mut self);
}
