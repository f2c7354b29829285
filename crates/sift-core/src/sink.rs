//! Event sinks.
//!
//! The sink is the only state shared between plugin runs, so every
//! implementation must accept concurrent `produce` calls. Records are owned
//! by the sink from the moment they are produced.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::event::EventRecord;

/// Errors from delivering a record.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sink lock poisoned")]
    Poisoned,
}

impl From<SinkError> for sift_common::Error {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Io(e) => sift_common::Error::Io(e),
            other => sift_common::Error::Sink(other.to_string()),
        }
    }
}

/// Receiver of produced records.
pub trait EventSink: Send + Sync {
    fn produce(&self, record: EventRecord) -> Result<(), SinkError>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SinkError> {
    mutex.lock().map_err(|_| SinkError::Poisoned)
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything produced so far, in arrival order.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Records of one data type, in arrival order.
    pub fn records_of(&self, data_type: &str) -> Vec<EventRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.data_type() == data_type)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn produce(&self, record: EventRecord) -> Result<(), SinkError> {
        lock(&self.records)?.push(record);
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        lock(&self.writer)?.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|_| SinkError::Poisoned)
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn produce(&self, record: EventRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(&record)?;
        let mut writer = lock(&self.writer)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Counts records on their way to another sink.
pub struct CountingSink<'a, S: EventSink + ?Sized> {
    inner: &'a S,
    count: AtomicU64,
}

impl<'a, S: EventSink + ?Sized> CountingSink<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            count: AtomicU64::new(0),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl<S: EventSink + ?Sized> EventSink for CountingSink<'_, S> {
    fn produce(&self, record: EventRecord) -> Result<(), SinkError> {
        self.inner.produce(record)?;
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventData, RecordOrigin};
    use serde::Serialize;
    use sift_common::QueryHash;
    use std::sync::Arc;

    #[derive(Serialize)]
    struct Note {
        text: String,
    }

    impl EventData for Note {
        const DATA_TYPE: &'static str = "test:note";
    }

    fn record(text: &str, offset: u64) -> EventRecord {
        let origin = RecordOrigin {
            plugin: "notes".into(),
            query_hash: QueryHash::from_query("SELECT text FROM notes"),
            row_offset: offset,
            source: None,
        };
        EventRecord::from_event(&Note { text: text.into() }, &origin).unwrap()
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.produce(record("a", 0)).unwrap();
        sink.produce(record("b", 1)).unwrap();
        let offsets: Vec<u64> = sink.records().iter().map(|r| r.row_offset()).collect();
        assert_eq!(offsets, vec![0, 1]);
        assert_eq!(sink.records_of("test:note").len(), 2);
        assert!(sink.records_of("other").is_empty());
    }

    #[test]
    fn test_json_lines_sink() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.produce(record("a", 0)).unwrap();
        sink.produce(record("b", 1)).unwrap();
        let bytes = sink.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: EventRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.attribute("text").unwrap(), "a");
    }

    #[test]
    fn test_counting_sink() {
        let inner = MemorySink::new();
        let counting = CountingSink::new(&inner);
        counting.produce(record("a", 0)).unwrap();
        counting.produce(record("b", 1)).unwrap();
        assert_eq!(counting.count(), 2);
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn test_memory_sink_concurrent_produce() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        sink.produce(record(&format!("{t}-{i}"), i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.len(), 200);
    }
}
