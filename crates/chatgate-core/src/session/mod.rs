//! Per-conversation state management.
//!
//! The `SessionStore` owns every `Session`; callers borrow one through a
//! `SessionLease` for the duration of a request.

pub mod store;

pub use store::{SessionLease, SessionStore};
