//! # tsunagu-client
//!
//! Headless client library for the Tsunagu messaging engine.
//!
//! The UI shell (web or desktop) drives a [`ViewController`] and renders
//! from the typed events it emits; everything stateful lives here. The
//! controller owns room selection, the loading lifecycle, the
//! mobile/desktop presentation split, and the guards the protocol
//! requires: stale-response discard, send re-entrancy, and
//! confirm-before-clearing of the unread badge.
//!
//! Synchronization is pull-based by design: there is no push transport,
//! only explicit re-fetches after selection changes and sends. The
//! [`MessagingApi`] trait is the seam where a push implementation could be
//! slotted in later without touching the controller.

pub mod api;
pub mod composer;
pub mod controller;
pub mod filter;
pub mod uploader;

mod error;

#[cfg(test)]
pub(crate) mod test_api;

pub use api::{HttpApi, MessagingApi, OutgoingFile};
pub use controller::{ControllerEvent, Presentation, Selection, ViewController};
pub use error::ClientError;
pub use filter::{visible_rooms, RoomFilters, SortKey, StatusFilter};
