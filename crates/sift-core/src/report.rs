//! Run reports.
//!
//! Reports are plain serializable data. The CLI prints them either as JSON
//! or as a short human summary on stderr.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sift_common::{RunId, SCHEMA_VERSION};

use crate::dispatch::{DispatchReport, QueryReport};
use crate::verify::{SchemaMatch, StructureCheck};

/// Terminal state of one plugin's evaluation against one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PluginOutcome {
    /// Required structure absent. Routine, not an error.
    NotApplicable { structure: StructureCheck },
    /// Reference schemas did not match under strict checking.
    SchemaMismatch,
    Completed,
    PartiallyFailed,
    Cancelled,
}

impl PluginOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginOutcome::NotApplicable { .. } => "not_applicable",
            PluginOutcome::SchemaMismatch => "schema_mismatch",
            PluginOutcome::Completed => "completed",
            PluginOutcome::PartiallyFailed => "partially_failed",
            PluginOutcome::Cancelled => "cancelled",
        }
    }

    /// Whether the plugin's queries ran.
    pub fn was_dispatched(&self) -> bool {
        matches!(
            self,
            PluginOutcome::Completed | PluginOutcome::PartiallyFailed | PluginOutcome::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRunReport {
    pub plugin: String,
    pub outcome: PluginOutcome,
    pub schema: SchemaMatch,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryReport>,
    pub queries_failed: usize,
    pub rows_seen: u64,
    pub row_faults: u64,
    pub events_produced: u64,
}

impl PluginRunReport {
    pub fn new(
        plugin: &str,
        outcome: PluginOutcome,
        schema: SchemaMatch,
        dispatch: &DispatchReport,
    ) -> Self {
        Self {
            plugin: plugin.to_string(),
            outcome,
            schema,
            queries: dispatch.queries.clone(),
            queries_failed: dispatch.queries_failed(),
            rows_seen: dispatch.rows_seen(),
            row_faults: dispatch.row_faults(),
            events_produced: dispatch.events_produced,
        }
    }
}

/// Structure and schema verdict of one plugin, as shown by `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginCheck {
    pub plugin: String,
    pub structure: StructureCheck,
    pub schema: SchemaMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionTotals {
    pub plugins_applied: usize,
    pub plugins_partially_failed: usize,
    pub events_produced: u64,
    pub row_faults: u64,
    pub queries_failed: usize,
}

/// Result of one extraction pass over one container.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub schema_version: String,
    pub run_id: RunId,
    pub container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_sha256: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub plugins: Vec<PluginRunReport>,
    pub totals: ExtractionTotals,
}

impl ExtractionReport {
    pub fn new(
        run_id: RunId,
        container: &str,
        config_sha256: Option<String>,
        started_at: DateTime<Utc>,
        plugins: Vec<PluginRunReport>,
    ) -> Self {
        let mut totals = ExtractionTotals::default();
        for p in &plugins {
            if p.outcome.was_dispatched() {
                totals.plugins_applied += 1;
            }
            if p.outcome == PluginOutcome::PartiallyFailed {
                totals.plugins_partially_failed += 1;
            }
            totals.events_produced += p.events_produced;
            totals.row_faults += p.row_faults;
            totals.queries_failed += p.queries_failed;
        }
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            container: container.to_string(),
            config_sha256,
            started_at,
            finished_at: Utc::now(),
            plugins,
            totals,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.totals.plugins_partially_failed > 0
    }

    /// Short human summary, one line per applied plugin.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {} event(s) from {} plugin(s) [{}]",
            self.container, self.totals.events_produced, self.totals.plugins_applied, self.run_id.0
        );
        for p in self.plugins.iter().filter(|p| p.outcome.was_dispatched()) {
            let _ = writeln!(
                out,
                "  {:<20} {:<16} rows={} events={} faults={} failed_queries={}",
                p.plugin,
                p.outcome.as_str(),
                p.rows_seen,
                p.events_produced,
                p.row_faults,
                p.queries_failed
            );
        }
        out
    }
}
