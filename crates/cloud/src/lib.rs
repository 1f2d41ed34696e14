//! Clients for the services the relay delegates to.
//!
//! - [`storage`]: object storage holding uploaded datasets.
//! - [`trainer`]: the external training workflow, triggered by webhook.
//!
//! Both are exposed as traits so handlers and tests can swap in other
//! implementations.

pub mod retry;
pub mod storage;
pub mod trainer;
