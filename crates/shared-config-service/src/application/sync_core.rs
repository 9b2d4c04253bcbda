//! SyncCore: the single owner of the shared configuration in this process.
//!
//! Every path that touches the file goes through one lock:
//!
//! - [`SyncCore::current`] re-reads the file and refreshes the cache,
//! - [`SyncCore::update`] validates, stamps and writes a new record,
//! - the background reload triggered by file-change notifications.
//!
//! Because all three hold the same lock while doing file I/O, a caller's
//! update and a reload caused by an external edit can never interleave into a
//! torn read.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──► Bootstrapped ──► Running ◄──► ReloadPending
//!                                       │               │
//!                                       └───► Disposed ◄┘
//! ```
//!
//! - `Bootstrapped`: the file exists and the first load is cached.
//! - `Running`: subscribed to change notifications (or degraded without them).
//! - `ReloadPending`: a notification arrived; the reload fires when the
//!   debounce window closes.
//! - `Disposed`: subscription released.  Terminal.
//!
//! # Debouncing
//!
//! A single logical write may surface as several raw notifications (create,
//! write, rename, metadata).  The first signal of a burst opens a window of
//! `debounce`; every signal arriving before it closes is absorbed, and one
//! reload runs when it closes.  A signal arriving after that opens a new
//! window, so each signal is followed by at least one reload.  Waiting out a
//! window never holds the lock.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use shared_config_core::{ConfigRecord, ValidationError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::settings::ServiceSettings;
use crate::infrastructure::storage::store::{ConfigStore, PersistenceError};
use crate::infrastructure::watcher::{fs::FsNotifier, ChangeNotifier, ChangeSignal};

/// How often an idle reload worker checks whether the core was disposed.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Name of the background reload thread.
const WORKER_THREAD_NAME: &str = "shared-config-reload";

/// Lifecycle state of a [`SyncCore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoreState {
    /// Before [`SyncCore::start`] has bootstrapped the file.
    Uninitialized = 0,
    /// File ensured and first load cached; subscription not yet active.
    Bootstrapped = 1,
    /// Steady state.
    Running = 2,
    /// A change signal arrived and a reload is scheduled.
    ReloadPending = 3,
    /// Subscription released.  No transition out of this state.
    Disposed = 4,
}

impl CoreState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CoreState::Bootstrapped,
            2 => CoreState::Running,
            3 => CoreState::ReloadPending,
            4 => CoreState::Disposed,
            _ => CoreState::Uninitialized,
        }
    }
}

/// Why [`SyncCore::try_update`] refused or failed to store a record.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The record violates a field constraint; nothing was written.
    #[error("configuration rejected: {0}")]
    Invalid(#[from] ValidationError),

    /// The record was valid but could not be written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// State shared between callers and the reload worker.
///
/// The worker owns an `Arc` of this, so a reload that fires after the
/// [`SyncCore`] is gone still writes into live memory.
struct Shared {
    store: ConfigStore,
    current: Mutex<ConfigRecord>,
    state: AtomicU8,
    reloads: AtomicU64,
}

impl Shared {
    /// Acquires the cache lock.  A panic on another thread never leaves the
    /// record half-written (it is replaced whole), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ConfigRecord> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> CoreState {
        CoreState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, from: CoreState, to: CoreState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn reload(&self) {
        {
            let mut current = self.lock();
            *current = self.store.load();
        }
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.transition(CoreState::ReloadPending, CoreState::Running);
        info!(path = %self.store.path().display(), "configuration reloaded from file");
    }
}

/// Process-wide owner of the shared configuration file.
///
/// Construct once with [`SyncCore::start`], share as `Arc<SyncCore>`, and call
/// [`SyncCore::shutdown`] at exit (dropping the last handle does the same).
pub struct SyncCore {
    shared: Arc<Shared>,
    notifier: Mutex<Option<Box<dyn ChangeNotifier>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    live_reload: AtomicBool,
    debounce: Duration,
}

impl SyncCore {
    /// Bootstraps the file, caches the first load and subscribes `notifier`
    /// to the file's path.
    ///
    /// A failed subscription is logged and the core runs without live reload;
    /// check [`SyncCore::live_reload_active`].
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the directory or the initial document
    /// cannot be created.
    pub fn start(
        store: ConfigStore,
        mut notifier: Box<dyn ChangeNotifier>,
        debounce: Duration,
    ) -> Result<Self, PersistenceError> {
        store.ensure_bootstrap()?;
        let initial = store.load();

        let shared = Arc::new(Shared {
            store,
            current: Mutex::new(initial),
            state: AtomicU8::new(CoreState::Bootstrapped as u8),
            reloads: AtomicU64::new(0),
        });
        let path = shared.store.path().to_path_buf();

        // Running before subscribing: a signal may arrive inside `watch`.
        shared.transition(CoreState::Bootstrapped, CoreState::Running);
        let (tx, rx) = mpsc::channel();
        let (notifier, worker) = match notifier.watch(&path, tx) {
            Ok(()) => {
                let worker_shared = Arc::clone(&shared);
                let spawned = thread::Builder::new()
                    .name(WORKER_THREAD_NAME.to_string())
                    .spawn(move || debounce_loop(&worker_shared, &rx, debounce));
                match spawned {
                    Ok(handle) => (Some(notifier), Some(handle)),
                    Err(e) => {
                        error!(error = %e, "failed to spawn reload worker; live reload disabled");
                        notifier.unwatch();
                        (None, None)
                    }
                }
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "file watcher unavailable; live reload disabled"
                );
                (None, None)
            }
        };

        let live_reload = worker.is_some();
        info!(
            path = %path.display(),
            live_reload,
            debounce_ms = debounce.as_millis() as u64,
            "configuration core initialized"
        );

        Ok(Self {
            shared,
            notifier: Mutex::new(notifier),
            worker: Mutex::new(worker),
            live_reload: AtomicBool::new(live_reload),
            debounce,
        })
    }

    /// Starts a core on the file named by `settings`, watched through OS
    /// notifications.
    ///
    /// # Errors
    ///
    /// See [`SyncCore::start`].
    pub fn with_file_watcher(settings: &ServiceSettings) -> Result<Self, PersistenceError> {
        Self::start(
            ConfigStore::new(settings.config_path.clone()),
            Box::new(FsNotifier::new()),
            settings.debounce,
        )
    }

    /// Returns the latest persisted configuration.
    ///
    /// Always re-reads the file, so the result is current even when no
    /// notification has arrived yet.  Never fails; unreadable values are
    /// defaulted and logged.
    pub fn current(&self) -> ConfigRecord {
        let mut current = self.shared.lock();
        *current = self.shared.store.load();
        current.clone()
    }

    /// Returns the cached record without touching the file.
    pub fn cached(&self) -> ConfigRecord {
        self.shared.lock().clone()
    }

    /// Validates `record`, stamps it with the current time and writes it.
    ///
    /// Returns `false` if the record was rejected or could not be saved; the
    /// cause is logged and the previous configuration stays in effect.
    pub fn update(&self, record: ConfigRecord) -> bool {
        match self.try_update(record) {
            Ok(saved) => {
                info!(
                    path = %self.config_path().display(),
                    app_name = %saved.app_name,
                    "configuration updated successfully"
                );
                true
            }
            Err(UpdateError::Invalid(e)) => {
                warn!(error = %e, "configuration update rejected");
                false
            }
            Err(e) => {
                error!(
                    path = %self.config_path().display(),
                    error = %e,
                    "error updating configuration"
                );
                false
            }
        }
    }

    /// Like [`SyncCore::update`], but returns the stored record or the cause
    /// of the failure.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Invalid`] before taking the lock if a field is
    /// out of range, or [`UpdateError::Persistence`] if the write failed.
    /// Either way the file and the cache are unchanged.
    pub fn try_update(&self, record: ConfigRecord) -> Result<ConfigRecord, UpdateError> {
        record.validate()?;

        let mut current = self.shared.lock();
        let stamped = ConfigRecord {
            last_updated: SystemTime::now(),
            ..record
        };
        self.shared.store.save(&stamped)?;
        *current = stamped.clone();
        Ok(stamped)
    }

    /// Releases the change subscription and stops the reload worker.
    ///
    /// A reload whose window is already open still runs.  Calling this more
    /// than once is harmless.
    pub fn shutdown(&self) {
        let previous = self
            .shared
            .state
            .swap(CoreState::Disposed as u8, Ordering::SeqCst);
        if previous == CoreState::Disposed as u8 {
            return;
        }

        if let Some(mut notifier) = lock(&self.notifier).take() {
            notifier.unwatch();
        }
        if let Some(handle) = lock(&self.worker).take() {
            if handle.join().is_err() {
                error!("reload worker panicked");
            }
        }
        self.live_reload.store(false, Ordering::SeqCst);
        info!(path = %self.config_path().display(), "configuration core disposed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoreState {
        self.shared.state()
    }

    /// Returns `true` while file-change notifications trigger reloads.
    pub fn live_reload_active(&self) -> bool {
        self.live_reload.load(Ordering::SeqCst)
    }

    /// Number of notification-triggered reloads completed so far.
    pub fn reload_count(&self) -> u64 {
        self.shared.reloads.load(Ordering::SeqCst)
    }

    /// Absolute path of the shared configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        self.shared.store.path()
    }

    /// Debounce window applied to change notifications.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Drop for SyncCore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Body of the reload worker thread.
///
/// Exits when the notifier drops its sender or, while idle, once the core
/// is disposed.
fn debounce_loop(shared: &Shared, signals: &Receiver<ChangeSignal>, delay: Duration) {
    loop {
        match signals.recv_timeout(IDLE_POLL) {
            Ok(ChangeSignal) => {}
            Err(RecvTimeoutError::Timeout) => {
                if shared.state() == CoreState::Disposed {
                    break;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if shared.state() == CoreState::Disposed {
            // Late signals are dropped.
            break;
        }
        shared.transition(CoreState::Running, CoreState::ReloadPending);

        let deadline = Instant::now() + delay;
        let mut absorbed = 0u32;
        let mut released = false;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match signals.recv_timeout(remaining) {
                Ok(ChangeSignal) => absorbed += 1,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    released = true;
                    break;
                }
            }
        }

        debug!(absorbed, "debounce window closed");
        shared.reload();
        if released {
            break;
        }
    }
    debug!("reload worker stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
