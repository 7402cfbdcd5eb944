//! Typed client for the imgbench backend.
//!
//! [`wire`] holds the request/response shapes of the REST contract,
//! [`api::BackendApi`] implements them over HTTP with [`reqwest`], and
//! [`backend::Backend`] is the trait the sync layer talks to so it can be
//! exercised against an in-memory backend.

pub mod api;
pub mod backend;
pub mod wire;

pub use api::{ApiError, BackendApi};
pub use backend::Backend;
