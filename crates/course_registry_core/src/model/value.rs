//! Document value model shared by stores and registration mapping.
//!
//! # Responsibility
//! - Define the flat field values a document collection can hold.
//! - Represent the server-assigned timestamp sentinel explicitly on writes.
//!
//! # Invariants
//! - Documents are flat: no nested maps or arrays.
//! - `WriteValue::ServerTimestamp` never reaches persisted storage; stores
//!   replace it with one clock reading per write.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Store-assigned document identifier.
pub type DocumentId = String;

/// Persisted document body.
pub type Document = BTreeMap<String, FieldValue>;

/// Write payload; may carry server timestamp sentinels.
pub type WriteDocument = BTreeMap<String, WriteValue>;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Point in time as Unix epoch seconds plus sub-second nanos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self {
            seconds: seconds + i64::from(nanos / NANOS_PER_SECOND),
            nanos: nanos % NANOS_PER_SECOND,
        }
    }

    /// Current wall-clock reading. Pre-epoch clocks collapse to zero.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from_duration(elapsed)
    }

    pub fn from_duration(elapsed: Duration) -> Self {
        let seconds = i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX);
        Self::new(seconds, elapsed.subsec_nanos())
    }

    /// Smallest timestamp strictly after `self`.
    pub fn next_tick(self) -> Self {
        if self.nanos + 1 >= NANOS_PER_SECOND {
            Self {
                seconds: self.seconds.saturating_add(1),
                nanos: 0,
            }
        } else {
            Self {
                seconds: self.seconds,
                nanos: self.nanos + 1,
            }
        }
    }
}

/// One persisted field value.
///
/// Serialized untagged so stored JSON stays readable: strings are JSON
/// strings and timestamps are `{"seconds": .., "nanos": ..}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(Timestamp),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

/// Value accepted on the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteValue {
    /// Persist the value as given.
    Set(FieldValue),
    /// Substitute the store's clock reading at commit time.
    ServerTimestamp,
}

impl From<FieldValue> for WriteValue {
    fn from(value: FieldValue) -> Self {
        Self::Set(value)
    }
}

impl From<&str> for WriteValue {
    fn from(value: &str) -> Self {
        Self::Set(value.into())
    }
}

impl From<String> for WriteValue {
    fn from(value: String) -> Self {
        Self::Set(value.into())
    }
}

impl From<bool> for WriteValue {
    fn from(value: bool) -> Self {
        Self::Set(value.into())
    }
}

impl From<i64> for WriteValue {
    fn from(value: i64) -> Self {
        Self::Set(value.into())
    }
}

/// Replaces every sentinel in `fields` with `commit_time`.
pub fn resolve_write(fields: &WriteDocument, commit_time: Timestamp) -> Document {
    fields
        .iter()
        .map(|(key, value)| {
            let resolved = match value {
                WriteValue::Set(inner) => inner.clone(),
                WriteValue::ServerTimestamp => FieldValue::Timestamp(commit_time),
            };
            (key.clone(), resolved)
        })
        .collect()
}
