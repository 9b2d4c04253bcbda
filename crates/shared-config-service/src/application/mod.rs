//! Application layer for the configuration service.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure records and rules) and the infrastructure (files, OS notifications).
//! Code here orchestrates those pieces to fulfil what callers actually want:
//! "give me the current configuration" and "save this configuration".
//!
//! # Sub-modules
//!
//! - **`sync_core`** – Serializes every read, write and reload of the shared
//!   file behind one lock, keeps the last-known record cached, and turns
//!   bursts of file-change notifications into a single debounced reload.

pub mod sync_core;
