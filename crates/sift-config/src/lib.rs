//! timesift configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the extraction configuration file
//! - Config resolution (CLI → env → XDG → defaults)
//! - Shape validation
//! - Config snapshots for run reports

pub mod extraction;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use extraction::{ExtractionConfig, QueryFailurePolicy};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource, ResolvedConfig, CONFIG_ENV_VAR};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
