//! Domain types and rules for the training relay.
//!
//! Everything here is pure: no I/O, no async. The store, cloud, api and
//! client crates all build on these types so the server record and the
//! polling client agree on one shape.

pub mod callback;
pub mod error;
pub mod job;
pub mod types;
pub mod upload;
