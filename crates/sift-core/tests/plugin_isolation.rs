//! Plugins evaluated against the same container do not affect each other.

use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;
use sift_config::{ExtractionConfig, QueryFailurePolicy};
use sift_core::container::{Row, SqliteContainer};
use sift_core::dispatch::{CancellationToken, QueryStatus};
use sift_core::event::EventData;
use sift_core::extract::Extractor;
use sift_core::plugin::{
    Mediator, PluginDescriptor, PluginRegistry, RowError, RowHandler, SqlitePlugin,
};
use sift_core::plugins::GoogleCallScreenPlugin;
use sift_core::report::PluginOutcome;
use sift_core::sink::MemorySink;

#[derive(Serialize)]
struct Locale {
    locale: Option<String>,
}

impl EventData for Locale {
    const DATA_TYPE: &'static str = "test:locale";
}

/// Matches any Android database, then runs one broken query between two
/// good ones.
struct Brittle {
    descriptor: PluginDescriptor,
}

impl Brittle {
    fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::new("brittle", "test")
                .require("android_metadata", ["locale"])
                .query("SELECT locale FROM android_metadata", "parse_locale")
                .query("SELECT no_such_column FROM android_metadata", "parse_locale")
                .query("SELECT upper(locale) AS locale FROM android_metadata", "parse_locale"),
        }
    }
}

impl RowHandler for Brittle {
    fn handles(&self, handler: &str) -> bool {
        handler == "parse_locale"
    }

    fn handle_row(
        &self,
        _handler: &str,
        _query: &str,
        row: &Row,
        mediator: &Mediator<'_>,
    ) -> Result<(), RowError> {
        let event = Locale {
            locale: row.get_string("locale")?,
        };
        mediator.produce(row, &event)
    }
}

impl SqlitePlugin for Brittle {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

fn container() -> SqliteContainer {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"CREATE TABLE android_metadata (locale TEXT);
           INSERT INTO android_metadata VALUES ('en_US');
           CREATE TABLE Transcript (id TEXT, conversation BLOB, audioRecordingFilePath TEXT);
           INSERT INTO Transcript VALUES ('1457771210', '{"convo_text":"hi"}', '/rec/1.m4a');"#,
    )
    .unwrap();
    SqliteContainer::from_connection(conn, "shared.db")
}

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(Brittle::new())).unwrap();
    registry
        .register(Arc::new(GoogleCallScreenPlugin::new()))
        .unwrap();
    registry
}

#[test]
fn query_failure_stays_inside_its_plugin() {
    let registry = registry();
    let extractor = Extractor::new(&registry, ExtractionConfig::default());
    let sink = MemorySink::new();

    let report = extractor
        .extract(&container(), &sink, &CancellationToken::new())
        .unwrap();

    let brittle = &report.plugins[0];
    assert_eq!(brittle.plugin, "brittle");
    assert_eq!(brittle.outcome, PluginOutcome::PartiallyFailed);
    assert!(matches!(brittle.queries[1].status, QueryStatus::Failed { .. }));
    assert_eq!(brittle.queries[2].status, QueryStatus::Skipped);
    assert_eq!(sink.records_of("test:locale").len(), 1);

    let callscreen = &report.plugins[1];
    assert_eq!(callscreen.outcome, PluginOutcome::Completed);
    assert_eq!(sink.records_of("android:google:callscreen").len(), 1);
}

#[test]
fn continue_siblings_runs_remaining_queries() {
    let registry = registry();
    let config = ExtractionConfig {
        query_failure_policy: QueryFailurePolicy::ContinueSiblings,
        ..ExtractionConfig::default()
    };
    let extractor = Extractor::new(&registry, config);
    let sink = MemorySink::new();

    let report = extractor
        .extract(&container(), &sink, &CancellationToken::new())
        .unwrap();

    let brittle = &report.plugins[0];
    assert_eq!(brittle.queries_failed, 1);
    assert_eq!(brittle.queries[2].status, QueryStatus::Completed);

    let locales: Vec<Option<String>> = sink
        .records_of("test:locale")
        .iter()
        .map(|r| r.attribute("locale").and_then(|v| v.as_str()).map(String::from))
        .collect();
    assert_eq!(
        locales,
        vec![Some("en_US".to_string()), Some("EN_US".to_string())]
    );
    assert_eq!(sink.records_of("android:google:callscreen").len(), 1);
}

#[test]
fn cancelled_pass_produces_nothing() {
    let registry = registry();
    let extractor = Extractor::new(&registry, ExtractionConfig::default());
    let sink = MemorySink::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = extractor.extract(&container(), &sink, &cancel).unwrap();

    assert!(sink.is_empty());
    assert!(report.plugins.is_empty());
}
