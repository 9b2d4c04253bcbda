//! Infrastructure layer for the configuration service.
//!
//! Contains OS-facing adapters: the file-system store for the shared
//! document and the file-change notification source.
//!
//! **Dependency rule**: this layer may depend on `domain` and
//! `shared_config_core`, but MUST NOT import the `application` layer.

pub mod storage;
pub mod watcher;
