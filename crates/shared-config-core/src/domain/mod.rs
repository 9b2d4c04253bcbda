//! Domain entities for the shared configuration store.
//!
//! The only entity is [`record::ConfigRecord`].  It carries no behaviour
//! beyond validation; loading, saving and caching live in the service crate.

pub mod record;
