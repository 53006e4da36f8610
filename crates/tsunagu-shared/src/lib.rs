//! # tsunagu-shared
//!
//! Domain types and wire payloads shared between the Tsunagu messaging
//! server, the store layer, and the client library.
//!
//! Everything here is plain data: identifiers, the two participant roles,
//! message status, and the JSON records exchanged over the HTTP API.

pub mod attachment;
pub mod constants;
pub mod protocol;
pub mod types;

mod error;

pub use error::SharedError;
