//! timesift core: a plugin framework for extracting timestamped events from
//! SQLite application databases.
//!
//! The pieces, leaf first:
//! - [`container`]: read-only access to an artifact database
//! - [`coerce`]: typed accessors over raw row values
//! - [`verify`]: required-structure and reference-schema checks
//! - [`plugin`]: plugin declarations, row handlers and the registry
//! - [`dispatch`]: query execution and row routing with fault isolation
//! - [`evaluation`]: the per-container plugin lifecycle
//! - [`extract`]: an extraction pass over one container
//!
//! ```no_run
//! use sift_config::ExtractionConfig;
//! use sift_core::container::SqliteContainer;
//! use sift_core::dispatch::CancellationToken;
//! use sift_core::extract::Extractor;
//! use sift_core::plugin::PluginRegistry;
//! use sift_core::sink::MemorySink;
//!
//! # fn main() -> sift_common::Result<()> {
//! let registry = PluginRegistry::with_builtin()?;
//! let extractor = Extractor::new(&registry, ExtractionConfig::default());
//! let container = SqliteContainer::open("callscreen_transcripts".as_ref())
//!     .map_err(|e| sift_core::extract::unreadable("callscreen_transcripts", &e))?;
//! let sink = MemorySink::new();
//! let report = extractor.extract(&container, &sink, &CancellationToken::new())?;
//! println!("{} events", report.totals.events_produced);
//! # Ok(())
//! # }
//! ```

pub mod coerce;
pub mod config_cli;
pub mod container;
pub mod dispatch;
pub mod evaluation;
pub mod event;
pub mod exit_codes;
pub mod extract;
pub mod logging;
pub mod plugin;
pub mod plugin_cli;
pub mod plugins;
pub mod report;
pub mod sink;
pub mod verify;

pub use exit_codes::ExitCode;
