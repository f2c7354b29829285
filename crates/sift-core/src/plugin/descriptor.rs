//! Plugin declarations.
//!
//! A descriptor is the data half of a plugin: what it needs to find in a
//! container, which queries it runs, and which handler receives each query's
//! rows. It is built once when the plugin is constructed and never changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sift_common::QueryHash;

/// Object name to the set of fields that object must have.
pub type RequiredStructure = BTreeMap<String, BTreeSet<String>>;

/// Object name to expected `CREATE` statement, for one known app version.
pub type ReferenceSchema = BTreeMap<String, String>;

/// A query and the handler that receives its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDeclaration {
    pub query: String,
    pub handler: String,
}

impl QueryDeclaration {
    pub fn hash(&self) -> QueryHash {
        QueryHash::from_query(&self.query)
    }
}

/// Declarative description of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub data_format: String,
    pub required_structure: RequiredStructure,
    pub queries: Vec<QueryDeclaration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<ReferenceSchema>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, data_format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_format: data_format.into(),
            required_structure: RequiredStructure::new(),
            queries: Vec::new(),
            schemas: Vec::new(),
        }
    }

    /// Require `object` with at least `fields`. An empty field list only
    /// requires the object to exist.
    pub fn require<I, S>(mut self, object: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_structure
            .entry(object.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn query(mut self, query: impl Into<String>, handler: impl Into<String>) -> Self {
        self.queries.push(QueryDeclaration {
            query: query.into(),
            handler: handler.into(),
        });
        self
    }

    pub fn schema<I, K, V>(mut self, objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.schemas.push(
            objects
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Check the declaration's shape. `handles` tells whether the plugin
    /// implements a handler name. Returns the first problem found.
    ///
    /// Each query text may appear once. A repeat would run twice and emit
    /// every row twice, and two handlers on one text would share a query
    /// hash in their records.
    pub fn validate(&self, handles: impl Fn(&str) -> bool) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("plugin name is empty".to_string());
        }
        if self.queries.is_empty() {
            return Err("no queries declared".to_string());
        }
        let mut seen = BTreeSet::new();
        for (i, decl) in self.queries.iter().enumerate() {
            if decl.query.trim().is_empty() {
                return Err(format!("query {i} is empty"));
            }
            if !seen.insert(decl.query.as_str()) {
                return Err(format!("query {i} repeats an earlier query"));
            }
            if decl.handler.trim().is_empty() {
                return Err(format!("query {i} has no handler"));
            }
            if !handles(&decl.handler) {
                return Err(format!("query {i} names unknown handler '{}'", decl.handler));
            }
        }
        for (object, fields) in &self.required_structure {
            if object.trim().is_empty() {
                return Err("required structure names an empty object".to_string());
            }
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(format!("required structure of '{object}' has an empty field"));
            }
        }
        Ok(())
    }
}
