//! Dotted-path documents: path resolution and the persisted test-data store

mod data;
pub mod path;

pub use data::TestDataStore;
