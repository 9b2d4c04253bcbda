//! Mock change notifier for testing.
//!
//! Lets tests raise [`ChangeSignal`]s on demand, without depending on OS
//! notification latency.  The notifier is a cheap handle: clone it, hand one
//! copy to the core and keep the other to trigger signals.

use std::path::{Path, PathBuf};
use std::sync::{mpsc::Sender, Arc, Mutex};

use super::{ChangeNotifier, ChangeSignal, WatchError};

#[derive(Default)]
struct MockState {
    sink: Option<Sender<ChangeSignal>>,
    watched: Option<PathBuf>,
}

/// A mock implementation of [`ChangeNotifier`] driven by [`MockNotifier::trigger`].
#[derive(Clone, Default)]
pub struct MockNotifier {
    state: Arc<Mutex<MockState>>,
}

impl MockNotifier {
    /// Creates a new mock notifier with no subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends one signal, as if the watched file had changed.
    ///
    /// Returns `false` when nothing is subscribed or the receiver is gone.
    pub fn trigger(&self) -> bool {
        let state = self.state.lock().expect("lock poisoned");
        match state.sink {
            Some(ref sink) => sink.send(ChangeSignal).is_ok(),
            None => false,
        }
    }

    /// The path passed to the last successful [`ChangeNotifier::watch`].
    pub fn watched_path(&self) -> Option<PathBuf> {
        self.state.lock().expect("lock poisoned").watched.clone()
    }

    /// Returns `true` while a subscription is active.
    pub fn is_watching(&self) -> bool {
        self.state.lock().expect("lock poisoned").sink.is_some()
    }
}

impl ChangeNotifier for MockNotifier {
    fn watch(&mut self, path: &Path, sink: Sender<ChangeSignal>) -> Result<(), WatchError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.sink = Some(sink);
        state.watched = Some(path.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self) {
        // Dropping the sender closes the channel.
        self.state.lock().expect("lock poisoned").sink = None;
    }
}
