//! The handler's view of the outside world during one plugin run.

use crate::container::Row;
use crate::event::{EventData, EventRecord, RecordOrigin};
use crate::sink::EventSink;

use super::RowError;

/// Converts typed events into records and hands them to the sink, stamping
/// each with the plugin, query and row that produced it.
pub struct Mediator<'a> {
    sink: &'a dyn EventSink,
    plugin: &'a str,
    source: Option<&'a str>,
}

impl<'a> Mediator<'a> {
    pub fn new(sink: &'a dyn EventSink, plugin: &'a str, source: Option<&'a str>) -> Self {
        Self {
            sink,
            plugin,
            source,
        }
    }

    pub fn plugin(&self) -> &str {
        self.plugin
    }

    /// Produce one event for `row`.
    pub fn produce<E: EventData>(&self, row: &Row, event: &E) -> Result<(), RowError> {
        let origin = RecordOrigin {
            plugin: self.plugin.to_string(),
            query_hash: row.query_hash(),
            row_offset: row.offset(),
            source: self.source.map(str::to_string),
        };
        let record = EventRecord::from_event(event, &origin)?;
        self.sink.produce(record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RawValue;
    use crate::sink::MemorySink;
    use serde::Serialize;
    use sift_common::QueryHash;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct Hit {
        n: i64,
    }

    impl EventData for Hit {
        const DATA_TYPE: &'static str = "test:hit";
    }

    #[test]
    fn test_produce_stamps_origin() {
        let sink = MemorySink::new();
        let mediator = Mediator::new(&sink, "hits", Some("/tmp/hits.db"));
        let columns: Arc<[String]> = vec!["n".to_string()].into();
        let row = Row::new(
            QueryHash::from_query("SELECT n FROM hits"),
            9,
            columns,
            vec![RawValue::Integer(1)],
        );

        mediator.produce(&row, &Hit { n: 1 }).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parser(), "sqlite/hits");
        assert_eq!(records[0].row_offset(), 9);
        assert_eq!(records[0].source(), Some("/tmp/hits.db"));
        assert_eq!(
            records[0].query_hash(),
            QueryHash::from_query("SELECT n FROM hits")
        );
    }
}
