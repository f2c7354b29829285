//! Artifact containers.
//!
//! A container is a read-only store of named objects with named fields that
//! can be queried. The framework only needs catalog access (for structure
//! verification) and lazy row iteration (for dispatch); everything else about
//! the on-disk format stays behind the [`Container`] trait.

pub mod row;
pub mod sqlite;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

use thiserror::Error;

pub use row::{RawValue, Row};
pub use sqlite::SqliteContainer;

/// Errors from container access.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read catalog: {source}")]
    Catalog {
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare query: {source}")]
    Prepare {
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to fetch row {row}: {source}")]
    Fetch {
        row: u64,
        #[source]
        source: rusqlite::Error,
    },
}

/// Read-only access to an artifact store.
pub trait Container {
    /// Where the container came from (file path or a label).
    fn location(&self) -> &str;

    /// Names of all queryable objects (tables and views).
    fn object_names(&self) -> Result<BTreeSet<String>, ContainerError>;

    /// Field names of one object. Empty if the object does not exist.
    fn field_names(&self, object: &str) -> Result<BTreeSet<String>, ContainerError>;

    /// Object name to definition (`CREATE ...` statement).
    fn object_definitions(&self) -> Result<BTreeMap<String, String>, ContainerError>;

    /// Execute `query` and hand each row to `visit`, in the order the store
    /// returns them. Iteration stops early when `visit` breaks. Returns the
    /// number of rows visited.
    fn for_each_row(
        &self,
        query: &str,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> Result<u64, ContainerError>;
}
