//! OS file-change notifications through the `notify` crate.
//!
//! The parent directory is watched rather than the file itself: every save
//! renames a fresh file over the old one, and a watch on the old inode would
//! go silent after the first save.  Events are filtered down to those naming
//! the configuration file, so the store's own `.tmp` file and unrelated files
//! in the same directory never produce a signal.  Pure access events (reads)
//! are ignored as well, otherwise every `current()` would schedule a reload.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::mpsc::Sender;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use super::{ChangeNotifier, ChangeSignal, WatchError};

/// [`ChangeNotifier`] backed by the platform's recommended `notify` watcher
/// (inotify, FSEvents, ReadDirectoryChangesW).
#[derive(Default)]
pub struct FsNotifier {
    watcher: Option<RecommendedWatcher>,
}

impl FsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a subscription is active.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

impl ChangeNotifier for FsNotifier {
    fn watch(&mut self, path: &Path, sink: Sender<ChangeSignal>) -> Result<(), WatchError> {
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| WatchError::NoParentDirectory(path.to_path_buf()))?;
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| WatchError::NoParentDirectory(path.to_path_buf()))?;

        let subscribe_error = |e: notify::Error| WatchError::Subscribe {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) if concerns_file(&event, &file_name) => {
                    debug!(kind = ?event.kind, "configuration file changed");
                    // The receiver is gone once the core shuts down.
                    let _ = sink.send(ChangeSignal);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "file watcher reported an error"),
            }
        })
        .map_err(subscribe_error)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(subscribe_error)?;

        self.watcher = Some(watcher);
        Ok(())
    }

    fn unwatch(&mut self) {
        // Dropping the watcher stops its event thread and, with it, the sink.
        self.watcher = None;
    }
}

fn concerns_file(event: &Event, file_name: &OsString) -> bool {
    !matches!(event.kind, EventKind::Access(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
