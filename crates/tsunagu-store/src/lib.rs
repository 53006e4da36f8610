//! # tsunagu-store
//!
//! Durable persistence for the messaging engine, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for the two owned
//! entities: rooms (conversation threads with unread counters) and
//! messages (the append-only log inside each room). Unread bookkeeping is
//! only ever touched from two places, both in this crate: the append
//! transaction (recipient-side increment) and the read reconciliation
//! pass (viewer-side recount).

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod rooms;

mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::Database;
pub use error::StoreError;
pub use messages::ReconcileOutcome;
pub use models::*;
