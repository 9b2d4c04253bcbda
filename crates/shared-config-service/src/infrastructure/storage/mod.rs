//! Storage infrastructure: the shared configuration file.
//!
//! The `store` sub-module is the only code that touches the file.  It:
//!
//! - Creates the directory and an initial document on first use.
//! - Reads the document and stamps the record with the file's modification time.
//! - Replaces the document atomically so readers never see a partial write.

pub mod store;
