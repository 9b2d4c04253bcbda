//! # shared-config-core
//!
//! Shared library for the shared configuration store containing the
//! configuration record, its validation rules, and the XML document codec.
//!
//! This crate has zero dependencies on the file system, threads, or
//! change-notification APIs.  Everything here is a pure function of its
//! inputs, which keeps the on-disk format testable without touching a disk.
//!
//! # Architecture overview (for beginners)
//!
//! Several processes on one host share a single `config.xml` file.  One of
//! them edits it; all of them must see the latest persisted values shortly
//! after a change, whether the change came from the editor or from someone
//! editing the file by hand.
//!
//! This crate (`shared-config-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – The [`ConfigRecord`]: five settings plus the timestamp of
//!   the last change, the documented defaults, and the range checks that every
//!   record must pass before it is allowed onto disk.
//!
//! - **`codec`** – How a record becomes text and back.  Decoding is forgiving:
//!   a damaged field falls back to its default without discarding the rest of
//!   the document, and problems are reported as [`DecodeIssue`] values instead
//!   of errors.
//!
//! The `shared-config-service` crate builds the store, the file watcher and
//! the synchronization core on top of these types.

pub mod codec;
pub mod domain;

pub use codec::xml::{decode_document, encode_document, Decoded, DecodeIssue, EncodeError};
pub use domain::record::{ConfigRecord, ValidationError};
