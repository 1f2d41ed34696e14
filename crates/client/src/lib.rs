//! `trainrelay-client` library crate.
//!
//! Talks to the relay over HTTP: uploads a dataset, then polls the job until
//! the trainer reports back. The `trainrelay` binary in `main.rs` wraps this
//! in a small CLI.

pub mod api;
pub mod error;
pub mod form;
pub mod machine;
pub mod poller;
