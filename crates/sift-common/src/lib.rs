//! timesift common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the sift crates:
//! - Query identity hashing and run identifiers
//! - Record schema versioning
//! - The unified error type and its stable codes
//! - Output format selection

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::{QueryHash, RunId};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
