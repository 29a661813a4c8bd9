//! Turning a [`LogRecord`] into one line of JSON text.
//!
//! The output keeps the separators of the log lines this crate replaces
//! (`", "` between members, `": "` after keys) so existing log queries and
//! dashboards keep matching, and writes non-ASCII characters literally.

use crate::record::{ExtraData, LogRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::io;

/// Second-resolution UTC timestamp pattern, e.g. `2023-03-21T04:05:06Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a timestamp with [`TIMESTAMP_FORMAT`]. Sub-second precision is dropped.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Extract the root trace id from a trace header.
///
/// `Root=1-64193bc5-14fda5f13f1ccef9177e2502;Parent=a9094f386f8990fc;Sampled=1`
/// yields `1-64193bc5-14fda5f13f1ccef9177e2502`. Blank input yields `None`.
pub fn parse_trace_id(header: &str) -> Option<String> {
    let first = header.split(';').next().unwrap_or_default().trim();
    let id = first.strip_prefix("Root=").unwrap_or(first);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Serialize a record into a single newline-terminated JSON line.
///
/// This never fails. If the record cannot be serialized its `extra_data`
/// is swapped for a placeholder, and as a last resort a line carrying only
/// the mandatory fields is produced.
pub fn format_record(record: &LogRecord) -> String {
    match to_line(record) {
        Ok(line) => line,
        Err(e) => {
            let mut fallback = record.clone();
            fallback.extra_data = Some(ExtraData::placeholder(e.to_string()));
            to_line(&fallback).unwrap_or_else(|_| minimal_line(record))
        }
    }
}

fn to_line<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    // serde_json only ever writes valid UTF-8.
    String::from_utf8(buf).map_err(|e| <serde_json::Error as serde::ser::Error>::custom(e))
}

fn minimal_line(record: &LogRecord) -> String {
    format!(
        "{{\"level\": {}, \"code\": {}, \"timestamp\": {}, \"message\": {}}}\n",
        Value::from(record.level.as_str()),
        Value::from(record.code.as_str()),
        Value::from(format_timestamp(record.timestamp)),
        Value::from(record.message.as_str()),
    )
}

/// Compact JSON with a space after every `,` and `:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}
