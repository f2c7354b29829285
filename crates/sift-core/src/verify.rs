//! Structure verification.
//!
//! Verification is speculative: every registered plugin probes every
//! container, and most will not match. A container that cannot be read while
//! probing therefore counts as a non-match, never as an error.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::container::Container;
use crate::plugin::{ReferenceSchema, RequiredStructure};

/// Detailed verification result, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StructureCheck {
    Match,
    MissingObject { object: String },
    MissingField { object: String, field: String },
    Unreadable { reason: String },
}

impl StructureCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, StructureCheck::Match)
    }
}

impl fmt::Display for StructureCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureCheck::Match => write!(f, "match"),
            StructureCheck::MissingObject { object } => write!(f, "missing object {object}"),
            StructureCheck::MissingField { object, field } => {
                write!(f, "missing field {object}.{field}")
            }
            StructureCheck::Unreadable { reason } => write!(f, "unreadable: {reason}"),
        }
    }
}

/// Walk `required` in order and stop at the first missing object or field.
pub fn check_structure(container: &dyn Container, required: &RequiredStructure) -> StructureCheck {
    let objects = match container.object_names() {
        Ok(objects) => objects,
        Err(e) => {
            return StructureCheck::Unreadable {
                reason: e.to_string(),
            }
        }
    };

    for (object, fields) in required {
        if !objects.contains(object) {
            return StructureCheck::MissingObject {
                object: object.clone(),
            };
        }
        if fields.is_empty() {
            continue;
        }
        let present = match container.field_names(object) {
            Ok(present) => present,
            Err(e) => {
                return StructureCheck::Unreadable {
                    reason: e.to_string(),
                }
            }
        };
        if let Some(field) = fields.iter().find(|f| !present.contains(*f)) {
            return StructureCheck::MissingField {
                object: object.clone(),
                field: field.clone(),
            };
        }
    }

    StructureCheck::Match
}

/// True only if every required object and every required field is present.
pub fn matches(container: &dyn Container, required: &RequiredStructure) -> bool {
    let check = check_structure(container, required);
    if !check.is_match() {
        debug!(container = container.location(), result = ?check, "structure mismatch");
    }
    check.is_match()
}

/// Outcome of comparing a container against a plugin's reference schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaMatch {
    /// The plugin declares no reference schemas.
    NotDeclared,
    /// Reference schema at `index` matched.
    Matched { index: usize },
    /// None matched; `differences` lists objects that differ from the
    /// closest reference schema.
    Unmatched { differences: Vec<String> },
    Unreadable { reason: String },
}

impl SchemaMatch {
    /// Whether extraction may proceed under strict schema checking.
    pub fn permits_strict(&self) -> bool {
        matches!(self, SchemaMatch::NotDeclared | SchemaMatch::Matched { .. })
    }
}

/// Canonical form of a `CREATE` statement: quoting removed, whitespace
/// collapsed, spacing around punctuation dropped, case folded.
pub fn normalize_definition(sql: &str) -> String {
    let unquoted: String = sql
        .chars()
        .filter(|c| !matches!(c, '"' | '`' | '[' | ']'))
        .collect();
    let collapsed = unquoted.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let prev_punct = out.chars().last().is_some_and(|p| matches!(p, '(' | ',' | ')'));
            let next_punct = chars.peek().is_some_and(|n| matches!(n, '(' | ',' | ')'));
            if prev_punct || next_punct {
                continue;
            }
        }
        out.push(c);
    }
    out.trim_end_matches(';').to_ascii_lowercase()
}

fn differences(actual: &BTreeMap<String, String>, reference: &ReferenceSchema) -> Vec<String> {
    reference
        .iter()
        .filter_map(|(object, expected)| match actual.get(object) {
            None => Some(format!("{object}: missing")),
            Some(found) if normalize_definition(found) != normalize_definition(expected) => {
                Some(format!("{object}: definition differs"))
            }
            Some(_) => None,
        })
        .collect()
}

/// Compare the container's object definitions with each reference schema.
/// The first fully matching schema wins.
pub fn compare_schemas(container: &dyn Container, schemas: &[ReferenceSchema]) -> SchemaMatch {
    if schemas.is_empty() {
        return SchemaMatch::NotDeclared;
    }
    let actual = match container.object_definitions() {
        Ok(actual) => actual,
        Err(e) => {
            return SchemaMatch::Unreadable {
                reason: e.to_string(),
            }
        }
    };

    let mut closest: Option<Vec<String>> = None;
    for (index, schema) in schemas.iter().enumerate() {
        let diff = differences(&actual, schema);
        if diff.is_empty() {
            return SchemaMatch::Matched { index };
        }
        if closest.as_ref().map_or(true, |c| diff.len() < c.len()) {
            closest = Some(diff);
        }
    }
    SchemaMatch::Unmatched {
        differences: closest.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SqliteContainer;
    use rusqlite::Connection;
    use std::collections::BTreeSet;

    fn container(ddl: &str) -> SqliteContainer {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        SqliteContainer::from_connection(conn, "memory")
    }

    fn required(pairs: &[(&str, &[&str])]) -> RequiredStructure {
        pairs
            .iter()
            .map(|(o, fs)| {
                (
                    o.to_string(),
                    fs.iter().map(|f| f.to_string()).collect::<BTreeSet<_>>(),
                )
            })
            .collect()
    }

    #[test]
    fn test_match() {
        let c = container("CREATE TABLE Transcript (id TEXT, conversation BLOB, extra INT);");
        let req = required(&[("Transcript", &["id", "conversation"])]);
        assert!(matches(&c, &req));
    }

    #[test]
    fn test_missing_object() {
        let c = container("CREATE TABLE other (id TEXT);");
        let req = required(&[("Transcript", &["id"])]);
        assert_eq!(
            check_structure(&c, &req),
            StructureCheck::MissingObject {
                object: "Transcript".into()
            }
        );
        assert!(!matches(&c, &req));
    }

    #[test]
    fn test_missing_field_is_no_partial_credit() {
        let c = container("CREATE TABLE a (x INT); CREATE TABLE b (y INT);");
        let req = required(&[("a", &["x"]), ("b", &["y", "z"])]);
        assert_eq!(
            check_structure(&c, &req),
            StructureCheck::MissingField {
                object: "b".into(),
                field: "z".into()
            }
        );
    }

    #[test]
    fn test_object_only_requirement() {
        let c = container("CREATE TABLE android_metadata (locale TEXT);");
        let req = required(&[("android_metadata", &[])]);
        assert!(matches(&c, &req));
    }

    #[test]
    fn test_views_count_as_objects() {
        let c = container("CREATE TABLE t (a INT); CREATE VIEW v AS SELECT a FROM t;");
        let req = required(&[("v", &["a"])]);
        assert!(matches(&c, &req));
    }

    #[test]
    fn test_normalize_definition() {
        assert_eq!(
            normalize_definition("CREATE TABLE \"t\" (\n  a INTEGER ,\n  b TEXT\n);"),
            normalize_definition("create table t(a integer,b text)")
        );
    }

    #[test]
    fn test_compare_schemas() {
        let c = container("CREATE TABLE t (a INTEGER, b TEXT);");
        let v1: ReferenceSchema = [("t".to_string(), "CREATE TABLE t (a INTEGER)".to_string())]
            .into_iter()
            .collect();
        let v2: ReferenceSchema = [(
            "t".to_string(),
            "CREATE TABLE `t` ( a INTEGER, b TEXT )".to_string(),
        )]
        .into_iter()
        .collect();

        assert_eq!(compare_schemas(&c, &[]), SchemaMatch::NotDeclared);
        assert_eq!(
            compare_schemas(&c, &[v1.clone(), v2]),
            SchemaMatch::Matched { index: 1 }
        );
        assert_eq!(
            compare_schemas(&c, &[v1]),
            SchemaMatch::Unmatched {
                differences: vec!["t: definition differs".into()]
            }
        );
    }
}
