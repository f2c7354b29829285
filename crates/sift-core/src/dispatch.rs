//! Query dispatch.
//!
//! Runs a plugin's declared queries in declaration order and routes every
//! row to the named handler. Row faults are logged and skipped. A query that
//! cannot be executed fails that query; whether the plugin's remaining
//! queries still run is decided by [`QueryFailurePolicy`]. Only a sink
//! failure escapes as an error.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use sift_common::QueryHash;
use sift_config::{ExtractionConfig, QueryFailurePolicy};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::container::{Container, ContainerError};
use crate::plugin::{Mediator, QueryDeclaration, RowError, SqlitePlugin};
use crate::sink::{CountingSink, EventSink, SinkError};

/// Shared stop flag. Iteration checks it after each row.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("plugin {plugin} query {query_hash} failed: {source}")]
    QueryExecution {
        plugin: String,
        query_hash: QueryHash,
        #[source]
        source: ContainerError,
    },

    #[error("plugin {plugin} query {query_hash} abandoned after {faults} row faults")]
    RowFaultBudget {
        plugin: String,
        query_hash: QueryHash,
        faults: u64,
    },

    #[error("plugin {plugin} could not deliver a record: {source}")]
    Sink {
        plugin: String,
        #[source]
        source: SinkError,
    },
}

impl From<DispatchError> for sift_common::Error {
    fn from(err: DispatchError) -> Self {
        let reason = err.to_string();
        match err {
            DispatchError::QueryExecution {
                plugin, query_hash, ..
            }
            | DispatchError::RowFaultBudget {
                plugin, query_hash, ..
            } => sift_common::Error::QueryExecution {
                plugin,
                query_hash: query_hash.to_string(),
                reason,
            },
            DispatchError::Sink { source, .. } => source.into(),
        }
    }
}

/// Dispatcher settings derived from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub query_failure_policy: QueryFailurePolicy,
    pub max_row_faults_per_query: Option<u64>,
}

impl From<&ExtractionConfig> for DispatchOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            query_failure_policy: config.query_failure_policy,
            max_row_faults_per_query: config.max_row_faults_per_query,
        }
    }
}

/// How a single declared query ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryStatus {
    Completed,
    /// The query could not be prepared or a fetch failed.
    Failed { reason: String },
    /// Too many row faults.
    Abandoned { reason: String },
    Cancelled,
    /// Not run because an earlier query failed under `abort_plugin`.
    Skipped,
}

impl QueryStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, QueryStatus::Failed { .. } | QueryStatus::Abandoned { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    pub query_hash: QueryHash,
    pub handler: String,
    pub rows_seen: u64,
    pub row_faults: u64,
    #[serde(flatten)]
    pub status: QueryStatus,
}

impl QueryReport {
    fn new(decl: &QueryDeclaration, status: QueryStatus) -> Self {
        Self {
            query_hash: decl.hash(),
            handler: decl.handler.clone(),
            rows_seen: 0,
            row_faults: 0,
            status,
        }
    }
}

/// Everything one dispatch did, query by query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub queries: Vec<QueryReport>,
    pub events_produced: u64,
    pub cancelled: bool,
}

impl DispatchReport {
    pub fn rows_seen(&self) -> u64 {
        self.queries.iter().map(|q| q.rows_seen).sum()
    }

    pub fn row_faults(&self) -> u64 {
        self.queries.iter().map(|q| q.row_faults).sum()
    }

    pub fn queries_failed(&self) -> usize {
        self.queries.iter().filter(|q| q.status.is_failure()).count()
    }

    /// True when every query ran to completion with no row faults.
    pub fn is_clean(&self) -> bool {
        !self.cancelled
            && self
                .queries
                .iter()
                .all(|q| q.status == QueryStatus::Completed && q.row_faults == 0)
    }
}

/// Runs one plugin against one container. Each plugin run gets its own
/// dispatcher; nothing here is shared between runs except the sink.
pub struct QueryDispatcher<'a> {
    container: &'a dyn Container,
    sink: &'a dyn EventSink,
    options: DispatchOptions,
    cancel: &'a CancellationToken,
}

impl<'a> QueryDispatcher<'a> {
    pub fn new(
        container: &'a dyn Container,
        sink: &'a dyn EventSink,
        options: DispatchOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            container,
            sink,
            options,
            cancel,
        }
    }

    pub fn run(&self, plugin: &dyn SqlitePlugin) -> Result<DispatchReport, DispatchError> {
        let counting = CountingSink::new(self.sink);
        let mediator = Mediator::new(&counting, plugin.name(), Some(self.container.location()));
        let mut report = DispatchReport::default();
        let mut aborted = false;

        for decl in &plugin.descriptor().queries {
            if aborted {
                report.queries.push(QueryReport::new(decl, QueryStatus::Skipped));
                continue;
            }
            if self.cancel.is_cancelled() {
                report.queries.push(QueryReport::new(decl, QueryStatus::Cancelled));
                continue;
            }

            let query = self.run_query(plugin, decl, &mediator)?;
            if query.status.is_failure()
                && self.options.query_failure_policy == QueryFailurePolicy::AbortPlugin
            {
                aborted = true;
            }
            report.queries.push(query);
        }

        report.events_produced = counting.count();
        report.cancelled = self.cancel.is_cancelled();
        Ok(report)
    }

    fn run_query(
        &self,
        plugin: &dyn SqlitePlugin,
        decl: &QueryDeclaration,
        mediator: &Mediator<'_>,
    ) -> Result<QueryReport, DispatchError> {
        let name = plugin.name();
        let hash = decl.hash();
        debug!(plugin = name, query_hash = %hash, handler = %decl.handler, "running query");

        let mut rows_seen = 0u64;
        let mut faults = 0u64;
        let mut sink_error: Option<SinkError> = None;
        let mut over_budget = false;
        let mut cancelled = false;

        let result = self.container.for_each_row(&decl.query, &mut |row| {
            rows_seen += 1;
            match plugin.handle_row(&decl.handler, &decl.query, &row, mediator) {
                Ok(()) => trace!(plugin = name, query_hash = %hash, row = row.offset(), "row handled"),
                Err(RowError::Sink(e)) => {
                    sink_error = Some(e);
                    return ControlFlow::Break(());
                }
                Err(e) => {
                    faults += 1;
                    warn!(
                        plugin = name,
                        query_hash = %hash,
                        row = row.offset(),
                        error = %e,
                        "row skipped"
                    );
                    if self
                        .options
                        .max_row_faults_per_query
                        .is_some_and(|max| faults >= max)
                    {
                        over_budget = true;
                        return ControlFlow::Break(());
                    }
                }
            }
            if self.cancel.is_cancelled() {
                cancelled = true;
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });

        if let Some(source) = sink_error {
            return Err(DispatchError::Sink {
                plugin: name.to_string(),
                source,
            });
        }

        let status = match result {
            Err(source) => {
                let err = DispatchError::QueryExecution {
                    plugin: name.to_string(),
                    query_hash: hash,
                    source,
                };
                warn!(error = %err, "query failed");
                QueryStatus::Failed {
                    reason: err.to_string(),
                }
            }
            Ok(_) if over_budget => {
                let err = DispatchError::RowFaultBudget {
                    plugin: name.to_string(),
                    query_hash: hash,
                    faults,
                };
                warn!(error = %err, "query abandoned");
                QueryStatus::Abandoned {
                    reason: err.to_string(),
                }
            }
            Ok(_) if cancelled => QueryStatus::Cancelled,
            Ok(_) => QueryStatus::Completed,
        };

        Ok(QueryReport {
            query_hash: hash,
            handler: decl.handler.clone(),
            rows_seen,
            row_faults: faults,
            status,
        })
    }
}
