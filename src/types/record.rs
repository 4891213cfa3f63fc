//! Record types and utilities

use crate::{EchoLogError, Result};
use bytes::Bytes;
use chrono::{DateTime, Local};
use std::fmt;

/// Delimiter byte terminating every record.
pub const DELIMITER: u8 = b'\n';

/// Formatting pattern for emitter-generated timestamp records:
/// day-of-week, day, month, year, time, timezone offset.
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// A single delimiter-terminated unit of the journal.
///
/// Records come from two sources: payloads submitted by clients over TCP
/// and the lines injected by the periodic timestamp emitter. Either way the
/// bytes are immutable and the final byte is always the delimiter, so a
/// record enters the journal as a whole unit or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(Bytes);

impl Record {
    /// Wrap a client-submitted payload.
    ///
    /// The payload must be non-empty and must end with the delimiter.
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        match bytes.last() {
            Some(&DELIMITER) => Ok(Self(bytes)),
            Some(_) => Err(EchoLogError::Client(
                "record does not end with the delimiter".to_string(),
            )),
            None => Err(EchoLogError::Client("record is empty".to_string())),
        }
    }

    /// Build a `timestamp:<formatted local time>` record for the given
    /// instant.
    pub fn timestamp(now: DateTime<Local>) -> Self {
        let line = format!("timestamp:{}\n", now.format(TIMESTAMP_FORMAT));
        Self(Bytes::from(line))
    }

    /// The record's bytes, trailing delimiter included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes, trailing delimiter included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record holds no bytes. Never true for a record built
    /// through either constructor.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0).trim_end_matches('\n'))
    }
}
