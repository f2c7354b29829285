//! Event data model.
//!
//! Plugins define one struct per record kind and implement [`EventData`] for
//! it. The typed struct is converted into an [`EventRecord`] envelope at the
//! moment it is produced; the envelope is what sinks receive.
//!
//! # Record format (one JSON object per line)
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "data_type": "android:google:callscreen",
//!   "parser": "sqlite/google_callscreen",
//!   "query_hash": "5d1c0a7e9b3f2c11",
//!   "row_offset": 0,
//!   "source": "/evidence/callscreen_transcripts",
//!   "attributes": {
//!     "conversation": "hello",
//!     "audio_recording_file_path": "/rec/1.m4a",
//!     "start_time": "2016-03-12T08:26:50Z"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sift_common::schema::is_compatible;
use sift_common::{QueryHash, SCHEMA_VERSION};
use thiserror::Error;

/// A typed event produced by a row handler.
///
/// `DATA_TYPE` is a colon-separated namespaced discriminator such as
/// `android:twitter:status`. It is fixed per type, so a record can never
/// change its kind after construction.
pub trait EventData: Serialize {
    const DATA_TYPE: &'static str;
}

/// Errors building an [`EventRecord`] from a typed event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event {data_type} could not be encoded: {source}")]
    Encode {
        data_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("event {data_type} did not encode to an object")]
    NotAnObject { data_type: &'static str },
}

/// Provenance of a record: which plugin and query row produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOrigin {
    pub plugin: String,
    pub query_hash: QueryHash,
    pub row_offset: u64,
    pub source: Option<String>,
}

/// Envelope handed to sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    schema_version: String,
    data_type: String,
    parser: String,
    query_hash: QueryHash,
    row_offset: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    attributes: Map<String, Value>,
}

impl EventRecord {
    /// Encode a typed event. Absent (`None`) attributes are kept as JSON
    /// `null` so consumers can tell "absent" from "never extracted".
    pub fn from_event<E: EventData>(event: &E, origin: &RecordOrigin) -> Result<Self, EventError> {
        let value = serde_json::to_value(event).map_err(|source| EventError::Encode {
            data_type: E::DATA_TYPE,
            source,
        })?;
        let Value::Object(attributes) = value else {
            return Err(EventError::NotAnObject {
                data_type: E::DATA_TYPE,
            });
        };

        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            data_type: E::DATA_TYPE.to_string(),
            parser: format!("sqlite/{}", origin.plugin),
            query_hash: origin.query_hash,
            row_offset: origin.row_offset,
            source: origin.source.clone(),
            attributes,
        })
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Parser chain, `sqlite/<plugin>`.
    pub fn parser(&self) -> &str {
        &self.parser
    }

    pub fn query_hash(&self) -> QueryHash {
        self.query_hash
    }

    pub fn row_offset(&self) -> u64 {
        self.row_offset
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Attribute by name; `None` both when missing and when null.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// Decode the attributes back into the typed event. `None` when the
    /// record holds another data type or was written under an incompatible
    /// schema major version.
    pub fn decode<E: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> Option<Result<E, serde_json::Error>> {
        if self.data_type != E::DATA_TYPE || !is_compatible(&self.schema_version) {
            return None;
        }
        Some(serde_json::from_value(Value::Object(self.attributes.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        host: Option<String>,
        count: i64,
    }

    impl EventData for Ping {
        const DATA_TYPE: &'static str = "test:net:ping";
    }

    #[derive(Serialize)]
    struct Scalar(i64);

    impl EventData for Scalar {
        const DATA_TYPE: &'static str = "test:scalar";
    }

    fn origin() -> RecordOrigin {
        RecordOrigin {
            plugin: "ping".into(),
            query_hash: QueryHash::from_query("SELECT 1"),
            row_offset: 4,
            source: Some("/tmp/ping.db".into()),
        }
    }

    #[test]
    fn test_from_event() {
        let event = Ping {
            host: None,
            count: 3,
        };
        let record = EventRecord::from_event(&event, &origin()).unwrap();
        assert_eq!(record.data_type(), "test:net:ping");
        assert_eq!(record.parser(), "sqlite/ping");
        assert_eq!(record.row_offset(), 4);
        assert_eq!(record.schema_version(), SCHEMA_VERSION);
        assert_eq!(record.attribute("count"), Some(&Value::from(3)));
        assert!(record.attributes().contains_key("host"));
        assert_eq!(record.attribute("host"), None);
    }

    #[test]
    fn test_decode_checks_data_type() {
        let event = Ping {
            host: Some("a".into()),
            count: 1,
        };
        let record = EventRecord::from_event(&event, &origin()).unwrap();
        let back: Ping = record.decode().unwrap().unwrap();
        assert_eq!(back, event);
        assert!(record.decode::<Ping2>().is_none());
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping2 {
        count: i64,
    }

    impl EventData for Ping2 {
        const DATA_TYPE: &'static str = "test:net:ping2";
    }

    #[test]
    fn test_decode_rejects_future_major() {
        let mut record = EventRecord::from_event(
            &Ping {
                host: None,
                count: 2,
            },
            &origin(),
        )
        .unwrap();
        record.schema_version = "2.0.0".to_string();
        assert!(record.decode::<Ping>().is_none());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = EventRecord::from_event(&Scalar(1), &origin()).unwrap_err();
        assert!(matches!(err, EventError::NotAnObject { .. }));
    }

    #[test]
    fn test_json_roundtrip_keeps_envelope() {
        let record = EventRecord::from_event(&Ping { host: None, count: 0 }, &origin()).unwrap();
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"data_type\":\"test:net:ping\""));
        let back: EventRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }
}
