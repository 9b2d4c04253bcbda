//! Integration tests: several cores sharing one file, driven by real OS
//! file-change notifications.
//!
//! Each core plays the part of a separate process.  They share nothing but
//! the file on disk.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use shared_config_core::{encode_document, ConfigRecord};
use shared_config_service::{CoreState, ServiceSettings, SyncCore};
use tempfile::TempDir;

const DEBOUNCE: Duration = Duration::from_millis(100);
const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(5);

fn settings(dir: &TempDir) -> ServiceSettings {
    ServiceSettings {
        config_path: dir.path().join("SharedData").join("config.xml"),
        debounce: DEBOUNCE,
    }
}

fn record(app_name: &str, max_users: i32) -> ConfigRecord {
    ConfigRecord {
        app_name: app_name.to_string(),
        database_connection: "Server=shared;Database=Integration;".to_string(),
        api_timeout: 45,
        enable_logging: true,
        max_users,
        last_updated: SystemTime::UNIX_EPOCH,
    }
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// Writes `record` straight to `path`, bypassing any core.
fn write_externally(path: &Path, record: &ConfigRecord) {
    let text = encode_document(record).expect("encode");
    std::fs::write(path, text).expect("external write");
}

#[test]
fn test_update_in_one_core_is_visible_to_another() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let writer = SyncCore::with_file_watcher(&settings(&dir)).expect("writer");
    let reader = SyncCore::with_file_watcher(&settings(&dir)).expect("reader");

    // Act
    assert!(writer.update(record("From writer", 250)));

    // Assert
    let seen = reader.current();
    assert!(seen.same_settings(&record("From writer", 250)));
    assert_eq!(seen.last_updated, writer.current().last_updated);
}

#[test]
fn test_update_in_one_core_reloads_the_other_cache() {
    let dir = TempDir::new().expect("tempdir");
    let writer = SyncCore::with_file_watcher(&settings(&dir)).expect("writer");
    let reader = SyncCore::with_file_watcher(&settings(&dir)).expect("reader");
    assert!(reader.live_reload_active());

    assert!(writer.update(record("Pushed", 300)));

    assert!(wait_until(PROPAGATION_TIMEOUT, || reader.cached().app_name == "Pushed"));
    assert!(reader.reload_count() >= 1);
}

#[test]
fn test_external_edit_is_reflected_in_cache() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let core = SyncCore::with_file_watcher(&settings(&dir)).expect("core");

    // Act
    write_externally(core.config_path(), &record("Edited by hand", 7));

    // Assert
    assert!(wait_until(PROPAGATION_TIMEOUT, || {
        core.cached().same_settings(&record("Edited by hand", 7))
    }));
    assert!(wait_until(PROPAGATION_TIMEOUT, || core.state() == CoreState::Running));
}

#[test]
fn test_rapid_external_writes_settle_on_last_content() {
    let dir = TempDir::new().expect("tempdir");
    let core = SyncCore::with_file_watcher(&settings(&dir)).expect("core");

    for users in 1..=3 {
        write_externally(core.config_path(), &record("Burst", users));
    }

    assert!(wait_until(PROPAGATION_TIMEOUT, || core.cached().max_users == 3));
    assert_eq!(core.cached().app_name, "Burst");
}

#[test]
fn test_malformed_external_edit_falls_back_to_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let core = SyncCore::with_file_watcher(&settings(&dir)).expect("core");

    std::fs::write(core.config_path(), "<configuration><appSettings>").expect("write");

    let current = core.current();
    assert!(current.same_settings(&ConfigRecord::default()));
}

#[test]
fn test_saves_leave_no_temporary_files_behind() {
    let dir = TempDir::new().expect("tempdir");
    let core = SyncCore::with_file_watcher(&settings(&dir)).expect("core");

    for users in [10, 20, 30] {
        assert!(core.update(record("Tidy", users)));
    }

    let parent = core.config_path().parent().expect("parent");
    let names: Vec<_> = std::fs::read_dir(parent)
        .expect("read_dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("config.xml")]);
}

#[test]
fn test_shutdown_stops_reacting_to_external_edits() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let core = SyncCore::with_file_watcher(&settings(&dir)).expect("core");
    let before = core.cached();

    // Act
    core.shutdown();
    write_externally(core.config_path(), &record("After shutdown", 5));
    thread::sleep(DEBOUNCE * 5);

    // Assert
    assert_eq!(core.reload_count(), 0);
    assert_eq!(core.cached(), before);
    assert_eq!(core.state(), CoreState::Disposed);
    assert!(core.current().same_settings(&record("After shutdown", 5)));
}

#[test]
fn test_concurrent_updates_from_two_cores_all_succeed() {
    // Arrange
    let dir = TempDir::new().expect("tempdir");
    let first = SyncCore::with_file_watcher(&settings(&dir)).expect("first");
    let second = SyncCore::with_file_watcher(&settings(&dir)).expect("second");

    // Act
    let failures: usize = thread::scope(|scope| {
        let writers: Vec<_> = [("First", &first), ("Second", &second)]
            .into_iter()
            .map(|(name, core)| {
                scope.spawn(move || {
                    (1..=150)
                        .filter(|&users| !core.update(record(name, users)))
                        .count()
                })
            })
            .collect();
        writers
            .into_iter()
            .map(|w| w.join().expect("writer thread"))
            .sum()
    });

    // Assert
    assert_eq!(failures, 0);
    let on_disk = first.current();
    assert!(["First", "Second"].contains(&on_disk.app_name.as_str()));
    assert_eq!(on_disk.max_users, 150);
    assert_eq!(second.current(), on_disk);
}
