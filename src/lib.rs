//! apiflow - API test-automation harness
//!
//! This library provides the pieces an API test is built from: a read-only
//! configuration store, a persisted test-data store with dotted-path access,
//! a token manager that logs in on demand, and an HTTP client with
//! status/business-code assertions. The `testing` module runs YAML flows on
//! top of them.

pub mod assertions;
pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod context;
pub mod store;
pub mod testing;

// Re-export commonly used types for tests
pub use client::{ApiClient, ApiResponse, RequestOptions};
pub use common::{Error, Result};
pub use context::RunContext;
pub use store::TestDataStore;
