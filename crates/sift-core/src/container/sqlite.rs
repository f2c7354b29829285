//! SQLite-backed containers.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OpenFlags};
use sift_common::QueryHash;
use tracing::{debug, trace};

use super::{Container, ContainerError, RawValue, Row};

const OBJECT_TYPES: &str = "type IN ('table', 'view')";

/// An application database opened read-only.
#[derive(Debug)]
pub struct SqliteContainer {
    conn: Connection,
    location: String,
}

impl SqliteContainer {
    /// Open a database file read-only.
    ///
    /// SQLite opens lazily, so the catalog is read once here to make a
    /// missing or non-database file fail now rather than on first probe.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let location = path.display().to_string();
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|source| {
            ContainerError::Open {
                path: location.clone(),
                source,
            }
        })?;

        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|source| ContainerError::Open {
            path: location.clone(),
            source,
        })?;

        debug!(path = %location, "opened container");
        Ok(Self { conn, location })
    }

    /// Wrap an existing connection (in-memory databases, tests).
    pub fn from_connection(conn: Connection, location: impl Into<String>) -> Self {
        Self {
            conn,
            location: location.into(),
        }
    }
}

impl Container for SqliteContainer {
    fn location(&self) -> &str {
        &self.location
    }

    fn object_names(&self) -> Result<BTreeSet<String>, ContainerError> {
        let sql = format!("SELECT name FROM sqlite_master WHERE {OBJECT_TYPES}");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|source| ContainerError::Catalog { source })?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<BTreeSet<_>, _>>())
            .map_err(|source| ContainerError::Catalog { source })?;
        Ok(names)
    }

    fn field_names(&self, object: &str) -> Result<BTreeSet<String>, ContainerError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(|source| ContainerError::Catalog { source })?;
        let names = stmt
            .query_map([object], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<BTreeSet<_>, _>>())
            .map_err(|source| ContainerError::Catalog { source })?;
        Ok(names)
    }

    fn object_definitions(&self) -> Result<BTreeMap<String, String>, ContainerError> {
        let sql = format!(
            "SELECT name, sql FROM sqlite_master WHERE {OBJECT_TYPES} AND sql IS NOT NULL"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|source| ContainerError::Catalog { source })?;
        let definitions = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .and_then(|rows| rows.collect::<Result<BTreeMap<_, _>, _>>())
            .map_err(|source| ContainerError::Catalog { source })?;
        Ok(definitions)
    }

    fn for_each_row(
        &self,
        query: &str,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> Result<u64, ContainerError> {
        let query_hash = QueryHash::from_query(query);
        let mut stmt = self
            .conn
            .prepare(query)
            .map_err(|source| ContainerError::Prepare { source })?;

        // Column names must be captured before `query()` borrows the statement.
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt
            .query([])
            .map_err(|source| ContainerError::Prepare { source })?;

        let mut offset = 0u64;
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(source) => return Err(ContainerError::Fetch { row: offset, source }),
            };

            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = row
                    .get_ref(i)
                    .map_err(|source| ContainerError::Fetch { row: offset, source })?;
                values.push(RawValue::from(value));
            }

            let flow = visit(Row::new(query_hash, offset, Arc::clone(&columns), values));
            offset += 1;
            if flow.is_break() {
                trace!(query_hash = %query_hash, rows = offset, "row iteration stopped early");
                break;
            }
        }

        Ok(offset)
    }
}
