//! # glimpse-store
//!
//! Durable local storage for the Glimpse session: two string-keyed entries
//! (the auth token and the serialized profile snapshot) in a small SQLite
//! key-value table.  The crate exposes a synchronous [`Database`] handle
//! wrapping a `rusqlite::Connection`.
//!
//! Storage being unavailable is never fatal to the caller; the session layer
//! degrades to memory-only for the run.

pub mod database;
pub mod migrations;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use session::{PROFILE_KEY, TOKEN_KEY};
