//! Value coercion: raw storage cells to typed domain values.
//!
//! Every getter returns `Ok(None)` for a NULL cell. A missing value is never
//! replaced by an empty string, zero, or the epoch.
//!
//! Integer getters also accept TEXT cells holding a decimal integer, since
//! SQLite stores numbers written into TEXT-affinity columns as text.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::{RawValue, Row};

/// Seconds between 1601-01-01 and 1970-01-01.
const WEBKIT_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Seconds between 1970-01-01 and 2001-01-01.
const COCOA_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Errors from coercing a row value.
#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("row has no field '{field}'")]
    UnknownField { field: String },

    #[error("field '{field}' holds {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported epoch: {0}")]
    UnsupportedEpoch(String),

    #[error("field '{field}' value {value} is out of range for {epoch} time")]
    TimestampOutOfRange {
        field: String,
        value: i64,
        epoch: EpochKind,
    },

    #[error("malformed payload in field '{field}': {reason}")]
    MalformedPayload { field: String, reason: String },
}

impl From<CoercionError> for sift_common::Error {
    fn from(err: CoercionError) -> Self {
        let reason = err.to_string();
        match err {
            CoercionError::UnsupportedEpoch(epoch) => sift_common::Error::UnsupportedEpoch(epoch),
            CoercionError::MalformedPayload { field, reason } => {
                sift_common::Error::MalformedPayload { field, reason }
            }
            CoercionError::UnknownField { field }
            | CoercionError::TypeMismatch { field, .. }
            | CoercionError::TimestampOutOfRange { field, .. } => {
                sift_common::Error::MalformedPayload { field, reason }
            }
        }
    }
}

/// Reference point and unit of an integer timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochKind {
    /// Seconds since 1970-01-01.
    Posix,
    /// Milliseconds since 1970-01-01 (Java time).
    PosixMillis,
    /// Microseconds since 1970-01-01.
    PosixMicros,
    /// Microseconds since 1601-01-01 (WebKit/Chrome time).
    WebKit,
    /// Seconds since 2001-01-01 (Cocoa/Core Data time).
    Cocoa,
}

impl EpochKind {
    /// Convert a raw offset from this epoch to UTC. `None` when the result
    /// is outside the representable range.
    pub fn to_datetime(self, value: i64) -> Option<DateTime<Utc>> {
        match self {
            EpochKind::Posix => DateTime::from_timestamp(value, 0),
            EpochKind::PosixMillis => DateTime::from_timestamp_millis(value),
            EpochKind::PosixMicros => DateTime::from_timestamp_micros(value),
            EpochKind::WebKit => value
                .checked_sub(WEBKIT_EPOCH_OFFSET_SECS * 1_000_000)
                .and_then(DateTime::from_timestamp_micros),
            EpochKind::Cocoa => value
                .checked_add(COCOA_EPOCH_OFFSET_SECS)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EpochKind::Posix => "posix",
            EpochKind::PosixMillis => "posix_ms",
            EpochKind::PosixMicros => "posix_us",
            EpochKind::WebKit => "webkit",
            EpochKind::Cocoa => "cocoa",
        }
    }
}

impl fmt::Display for EpochKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpochKind {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "posix" | "posix_s" | "unix" => Ok(EpochKind::Posix),
            "posix_ms" | "java" => Ok(EpochKind::PosixMillis),
            "posix_us" => Ok(EpochKind::PosixMicros),
            "webkit" | "chrome" => Ok(EpochKind::WebKit),
            "cocoa" | "mac" => Ok(EpochKind::Cocoa),
            _ => Err(CoercionError::UnsupportedEpoch(s.to_string())),
        }
    }
}

/// A point in time extracted from a row, normalized to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn from_epoch(epoch: EpochKind, value: i64) -> Option<Self> {
        epoch.to_datetime(value).map(Timestamp)
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Whole seconds since 1970-01-01.
    pub fn posix_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

fn mismatch(field: &str, expected: &'static str, found: &RawValue) -> CoercionError {
    CoercionError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.kind(),
    }
}

impl Row {
    /// Raw value of `field`, or `None` when the cell is NULL.
    pub fn get_value(&self, field: &str) -> Result<Option<&RawValue>, CoercionError> {
        match self.raw(field) {
            None => Err(CoercionError::UnknownField {
                field: field.to_string(),
            }),
            Some(RawValue::Null) => Ok(None),
            Some(value) => Ok(Some(value)),
        }
    }

    pub fn get_string(&self, field: &str) -> Result<Option<String>, CoercionError> {
        match self.get_value(field)? {
            None => Ok(None),
            Some(RawValue::Text(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(field, "text", other)),
        }
    }

    pub fn get_blob(&self, field: &str) -> Result<Option<Vec<u8>>, CoercionError> {
        match self.get_value(field)? {
            None => Ok(None),
            Some(RawValue::Blob(b)) => Ok(Some(b.clone())),
            Some(other) => Err(mismatch(field, "blob", other)),
        }
    }

    pub fn get_integer(&self, field: &str) -> Result<Option<i64>, CoercionError> {
        match self.get_value(field)? {
            None => Ok(None),
            Some(RawValue::Integer(i)) => Ok(Some(*i)),
            Some(RawValue::Text(s)) => {
                s.trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| CoercionError::TypeMismatch {
                        field: field.to_string(),
                        expected: "integer",
                        found: "text",
                    })
            }
            Some(other) => Err(mismatch(field, "integer", other)),
        }
    }

    pub fn get_real(&self, field: &str) -> Result<Option<f64>, CoercionError> {
        match self.get_value(field)? {
            None => Ok(None),
            Some(RawValue::Real(x)) => Ok(Some(*x)),
            Some(RawValue::Integer(i)) => Ok(Some(*i as f64)),
            Some(other) => Err(mismatch(field, "real", other)),
        }
    }

    /// Integer flag, nonzero meaning true.
    pub fn get_bool(&self, field: &str) -> Result<Option<bool>, CoercionError> {
        Ok(self.get_integer(field)?.map(|i| i != 0))
    }

    /// Interpret an integer field as an offset from `epoch`.
    pub fn get_date_time(
        &self,
        field: &str,
        epoch: EpochKind,
    ) -> Result<Option<Timestamp>, CoercionError> {
        let Some(value) = self.get_integer(field)? else {
            return Ok(None);
        };
        Timestamp::from_epoch(epoch, value)
            .map(Some)
            .ok_or_else(|| CoercionError::TimestampOutOfRange {
                field: field.to_string(),
                value,
                epoch,
            })
    }

    /// Like [`Row::get_date_time`] with the epoch given by name.
    pub fn get_date_time_named(
        &self,
        field: &str,
        epoch: &str,
    ) -> Result<Option<Timestamp>, CoercionError> {
        let epoch = epoch.parse::<EpochKind>()?;
        self.get_date_time(field, epoch)
    }

    /// Decode a JSON document stored as a BLOB or TEXT cell.
    pub fn get_json<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, CoercionError> {
        let bytes = match self.get_value(field)? {
            None => return Ok(None),
            Some(RawValue::Blob(b)) => b.as_slice(),
            Some(RawValue::Text(s)) => s.as_bytes(),
            Some(other) => return Err(mismatch(field, "blob", other)),
        };

        let text = std::str::from_utf8(bytes).map_err(|e| CoercionError::MalformedPayload {
            field: field.to_string(),
            reason: format!("not valid UTF-8: {e}"),
        })?;

        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| CoercionError::MalformedPayload {
                field: field.to_string(),
                reason: e.to_string(),
            })
    }
}
