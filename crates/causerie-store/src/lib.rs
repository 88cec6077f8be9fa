//! # causerie-store
//!
//! Durable persistence for conversations and their embedded messages,
//! backed by SQLite.  The crate exposes a synchronous [`Database`] handle
//! that wraps a `rusqlite::Connection` and provides typed CRUD helpers.
//!
//! Message mutations are always expressed as load-mutate-save against the
//! owning [`Conversation`]; there is no message-level storage API.
//! Encryption, authorization and fan-out live above this crate.

pub mod conversations;
pub mod database;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
