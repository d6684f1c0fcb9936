//! Append-only newline-delimited JSON event log.
//!
//! Grounded in the teacher's `BacktestResult`/reporting artifact writers:
//! `serde_json` to a sink, schema-versioned via a `schema_version` field
//! defaulted on deserialize for forward compatibility.

use std::io::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("I/O error writing event log: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One append-only record. Readers MUST tolerate unknown fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub timestamp: i64,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Appends [`EventRecord`]s as newline-delimited JSON to any [`Write`]r.
pub struct EventLog<W: Write> {
    writer: W,
}

impl<W: Write> EventLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_event(
        &mut self,
        timestamp: i64,
        kind: &str,
        payload: &impl Serialize,
    ) -> Result<(), EventLogError> {
        let record = EventRecord {
            schema_version: SCHEMA_VERSION,
            timestamp,
            kind: kind.to_string(),
            payload: serde_json::to_value(payload)?,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), EventLogError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_ndjson_line_per_event() {
        let mut buf = Vec::new();
        {
            let mut log = EventLog::new(&mut buf);
            log.write_event(1, "trade", &serde_json::json!({"price": 0.2})).unwrap();
            log.write_event(2, "fill", &serde_json::json!({"qty": 5.0})).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: EventRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.kind, "trade");
        assert_eq!(first.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn reader_tolerates_missing_schema_version() {
        let json = r#"{"timestamp":1,"kind":"snapshot","payload":{}}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.schema_version, SCHEMA_VERSION);
    }
}
