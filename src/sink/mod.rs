//! Record sinks
//!
//! A sink stores extracted records. The engine calls it exactly once per
//! successful extraction, before the unit is checkpointed `done`; a sink
//! failure therefore surfaces as a retryable outcome instead of a unit
//! recorded complete without a durable record.

use crate::strategy::Record;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while storing a record
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for record storage backends
pub trait RecordSink: Send + Sync + 'static {
    /// Stores the record for an IMO number
    ///
    /// Must be idempotent: re-delivery after a crash stores the same
    /// record again.
    fn store(&self, imo: u64, record: &Record) -> SinkResult<()>;
}

impl<T: RecordSink> RecordSink for std::sync::Arc<T> {
    fn store(&self, imo: u64, record: &Record) -> SinkResult<()> {
        (**self).store(imo, record)
    }
}

/// Stores each record as `<dir>/<imo>.json`, pretty-printed
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    /// Creates the sink, creating the directory if needed
    pub fn new(dir: &Path) -> SinkResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path of the record file for an IMO number
    pub fn record_path(&self, imo: u64) -> PathBuf {
        self.dir.join(format!("{}.json", imo))
    }
}

impl RecordSink for JsonDirSink {
    fn store(&self, imo: u64, record: &Record) -> SinkResult<()> {
        let json = serde_json::to_string_pretty(&record.0)?;
        std::fs::write(self.record_path(imo), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stores_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonDirSink::new(dir.path()).unwrap();

        let record = Record(json!({"Vessel name": "EMMA MAERSK", "IMO number": "9321483"}));
        sink.store(9321483, &record).unwrap();

        let content = std::fs::read_to_string(dir.path().join("9321483.json")).unwrap();
        assert!(content.contains("EMMA MAERSK"));
        // Pretty-printed output spans multiple lines
        assert!(content.lines().count() > 1);

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["IMO number"], "9321483");
    }

    #[test]
    fn test_store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonDirSink::new(dir.path()).unwrap();

        let record = Record(json!({"Flag": "Denmark"}));
        sink.store(9074729, &record).unwrap();
        sink.store(9074729, &record).unwrap();

        let content = std::fs::read_to_string(sink.record_path(9074729)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["Flag"], "Denmark");
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("records").join("json");
        let sink = JsonDirSink::new(&nested).unwrap();

        sink.store(9176187, &Record(json!({"a": 1}))).unwrap();
        assert!(nested.join("9176187.json").exists());
    }
}
