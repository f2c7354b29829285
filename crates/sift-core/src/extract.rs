//! The extraction pass: every enabled plugin against one container.

use std::sync::Arc;

use chrono::Utc;
use sift_common::{Error, Result, RunId};
use sift_config::ExtractionConfig;
use tracing::{info, warn};

use crate::container::{Container, ContainerError};
use crate::dispatch::{CancellationToken, DispatchOptions, QueryDispatcher};
use crate::evaluation::{structure_of, PluginEvaluation};
use crate::plugin::{PluginRegistry, SqlitePlugin};
use crate::report::{ExtractionReport, PluginCheck, PluginRunReport};
use crate::sink::EventSink;
use crate::verify::compare_schemas;

/// Map a container access failure to the fatal pass-level error.
pub fn unreadable(location: &str, err: &ContainerError) -> Error {
    Error::ContainerUnreadable {
        path: location.to_string(),
        reason: err.to_string(),
    }
}

/// Runs the registered plugins against containers.
///
/// The registry is borrowed immutably for the whole pass, so population
/// always completes before the first lookup.
#[derive(Debug)]
pub struct Extractor<'r> {
    registry: &'r PluginRegistry,
    config: ExtractionConfig,
    config_sha256: Option<String>,
    selection: Option<Vec<String>>,
}

impl<'r> Extractor<'r> {
    pub fn new(registry: &'r PluginRegistry, config: ExtractionConfig) -> Self {
        for name in unknown_plugins(registry, &config) {
            warn!(plugin = %name, "configuration names an unregistered plugin");
        }
        Self {
            registry,
            config,
            config_sha256: None,
            selection: None,
        }
    }

    /// Record the hash of the configuration in every report.
    pub fn with_config_hash(mut self, sha256: impl Into<String>) -> Self {
        self.config_sha256 = Some(sha256.into());
        self
    }

    /// Restrict the pass to the named plugins. Unknown names are an error.
    pub fn select<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for name in &names {
            self.registry.lookup(name)?;
        }
        self.selection = Some(names);
        Ok(self)
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Plugins taking part in the pass, in registration order.
    pub fn plugins(&self) -> Vec<Arc<dyn SqlitePlugin>> {
        self.registry
            .plugins()
            .filter(|p| self.config.is_plugin_enabled(p.name()))
            .filter(|p| {
                self.selection
                    .as_ref()
                    .map_or(true, |names| names.iter().any(|n| n == p.name()))
            })
            .cloned()
            .collect()
    }

    /// Evaluate every enabled plugin against `container`.
    ///
    /// Fails only when the container cannot be read or the sink refuses a
    /// record. Plugin-level problems are recorded in the report.
    pub fn extract(
        &self,
        container: &dyn Container,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport> {
        let started_at = Utc::now();
        let run_id = RunId::new();

        container
            .object_names()
            .map_err(|e| unreadable(container.location(), &e))?;

        let options = DispatchOptions::from(&self.config);
        let mut reports: Vec<PluginRunReport> = Vec::new();

        for plugin in self.plugins() {
            if cancel.is_cancelled() {
                info!(run_id = %run_id.0, "extraction cancelled");
                break;
            }
            let dispatcher = QueryDispatcher::new(container, sink, options, cancel);
            let report = match PluginEvaluation::new(plugin.as_ref(), container)
                .verify(self.config.strict_schemas)
            {
                Err(report) => report,
                Ok(verified) => verified.dispatch(&dispatcher)?.finish(),
            };
            if report.outcome.was_dispatched() {
                info!(
                    plugin = %report.plugin,
                    outcome = report.outcome.as_str(),
                    events = report.events_produced,
                    row_faults = report.row_faults,
                    "plugin finished"
                );
            }
            reports.push(report);
        }

        Ok(ExtractionReport::new(
            run_id,
            container.location(),
            self.config_sha256.clone(),
            started_at,
            reports,
        ))
    }

    /// Structure and schema verdict of every enabled plugin, without
    /// running any queries.
    pub fn check(&self, container: &dyn Container) -> Result<Vec<PluginCheck>> {
        container
            .object_names()
            .map_err(|e| unreadable(container.location(), &e))?;

        Ok(self
            .plugins()
            .iter()
            .map(|plugin| PluginCheck {
                plugin: plugin.name().to_string(),
                structure: structure_of(plugin.as_ref(), container),
                schema: compare_schemas(container, &plugin.descriptor().schemas),
            })
            .collect())
    }
}

/// Plugin names in the configuration that the registry doesn't know.
pub fn unknown_plugins(registry: &PluginRegistry, config: &ExtractionConfig) -> Vec<String> {
    config
        .enabled_plugins
        .iter()
        .flatten()
        .chain(config.disabled_plugins.iter())
        .filter(|name| !registry.contains(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SqliteContainer;
    use crate::report::PluginOutcome;
    use crate::sink::MemorySink;
    use rusqlite::Connection;

    fn callscreen_db() -> SqliteContainer {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Transcript (id TEXT, conversation BLOB, audioRecordingFilePath TEXT);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO Transcript VALUES ('1457771210', ?1, '/rec/1.m4a')",
            [br#"{"convo_text":"hello"}"#.to_vec()],
        )
        .unwrap();
        SqliteContainer::from_connection(conn, "callscreen.db")
    }

    #[test]
    fn test_extract_runs_matching_plugin_only() {
        let registry = PluginRegistry::with_builtin().unwrap();
        let extractor = Extractor::new(&registry, ExtractionConfig::default());
        let sink = MemorySink::new();
        let report = extractor
            .extract(&callscreen_db(), &sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(report.totals.plugins_applied, 1);
        let callscreen = report
            .plugins
            .iter()
            .find(|p| p.plugin == "google_callscreen")
            .unwrap();
        assert_eq!(callscreen.outcome, PluginOutcome::Completed);
        assert!(report
            .plugins
            .iter()
            .filter(|p| p.plugin != "google_callscreen")
            .all(|p| matches!(p.outcome, PluginOutcome::NotApplicable { .. })));
    }

    #[test]
    fn test_disabled_plugin_is_skipped() {
        let registry = PluginRegistry::with_builtin().unwrap();
        let config = ExtractionConfig {
            disabled_plugins: vec!["google_callscreen".into()],
            ..ExtractionConfig::default()
        };
        let extractor = Extractor::new(&registry, config);
        let sink = MemorySink::new();
        let report = extractor
            .extract(&callscreen_db(), &sink, &CancellationToken::new())
            .unwrap();
        assert!(sink.is_empty());
        assert!(report.plugins.iter().all(|p| p.plugin != "google_callscreen"));
    }

    #[test]
    fn test_select_unknown_plugin() {
        let registry = PluginRegistry::with_builtin().unwrap();
        let err = Extractor::new(&registry, ExtractionConfig::default())
            .select(["nope"])
            .unwrap_err();
        assert!(matches!(err, Error::PluginNotFound { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let registry = PluginRegistry::with_builtin().unwrap();
        let extractor = Extractor::new(&registry, ExtractionConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sink = MemorySink::new();
        let report = extractor.extract(&callscreen_db(), &sink, &cancel).unwrap();
        assert!(report.plugins.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_check() {
        let registry = PluginRegistry::with_builtin().unwrap();
        let checks = Extractor::new(&registry, ExtractionConfig::default())
            .check(&callscreen_db())
            .unwrap();
        let callscreen = checks.iter().find(|c| c.plugin == "google_callscreen").unwrap();
        assert!(callscreen.structure.is_match());
    }

    #[test]
    fn test_unknown_plugins() {
        let registry = PluginRegistry::with_builtin().unwrap();
        let config = ExtractionConfig {
            enabled_plugins: Some(vec!["google_callscreen".into(), "ghost".into()]),
            disabled_plugins: vec!["phantom".into()],
            ..ExtractionConfig::default()
        };
        assert_eq!(unknown_plugins(&registry, &config), vec!["ghost", "phantom"]);
    }
}
