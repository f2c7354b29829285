//! Plugin contract for SQLite artifact parsers.
//!
//! A plugin is a [`PluginDescriptor`] plus the row handlers it names. The
//! engine owns everything else: deciding whether the plugin applies to a
//! container, running its queries, and routing rows to handlers.
//!
//! # Writing a plugin
//!
//! ```text
//! struct Notes { descriptor: PluginDescriptor }
//!
//! impl RowHandler for Notes {
//!     fn handles(&self, handler: &str) -> bool { handler == "ParseNoteRow" }
//!     fn handle_row(&self, handler, query, row, mediator) -> Result<(), RowError> {
//!         let event = NoteEvent { body: row.get_string("body")? };
//!         mediator.produce(row, &event)
//!     }
//! }
//! ```
//!
//! Handlers are stateless with respect to each other: one call sees one row,
//! and nothing carries over between rows or runs.

pub mod descriptor;
pub mod mediator;
pub mod registry;

use thiserror::Error;

use crate::coerce::CoercionError;
use crate::container::Row;
use crate::event::EventError;
use crate::sink::SinkError;

pub use descriptor::{PluginDescriptor, QueryDeclaration, ReferenceSchema, RequiredStructure};
pub use mediator::Mediator;
pub use registry::{PluginRegistry, RegistryError};

/// Failure while handling one row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Event(#[from] EventError),

    /// The sink refused a record. Unlike the other variants this is not a
    /// fault of the row.
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("{0}")]
    Handler(String),
}

/// Handler dispatch by name.
pub trait RowHandler {
    /// Whether `handler` names a routine this plugin implements.
    fn handles(&self, handler: &str) -> bool;

    /// Turn one row of `query` into zero or more events.
    fn handle_row(
        &self,
        handler: &str,
        query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError>;
}

/// A registered SQLite plugin.
pub trait SqlitePlugin: RowHandler + Send + Sync {
    fn descriptor(&self) -> &PluginDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}
