#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! JSON-lines logging for impact scoring runs.
//!
//! Every record is one JSON object per line so scoring logs can be replayed
//! or grepped per sentence id.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Per-rule and per-candidate detail.
    Debug,
    /// Batch lifecycle events.
    Info,
    /// Contained failures (skipped candidates, unparsable sentences).
    Warn,
    /// Failures that abort a run.
    Error,
}

impl LogLevel {
    /// Parses a level name case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Component emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Event name, e.g. `impact.batch.start`.
    pub message: String,
    /// Sentence the record refers to, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<String>,
    /// Extra fields such as counts or error text.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            sentence_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attaches the sentence id.
    #[must_use]
    pub fn for_sentence(mut self, sentence_id: impl Into<String>) -> Self {
        self.sentence_id = Some(sentence_id.into());
        self
    }

    /// Merges the fields of a JSON object into the metadata. Non-object
    /// values are ignored.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        if let serde_json::Value::Object(fields) = metadata {
            self.metadata.extend(fields);
        }
        self
    }
}

/// Append-only JSON-lines logger, safe to share between scoring threads.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the desired path, accepting every level.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_min_level(path, LogLevel::Debug)
    }

    /// Creates or opens a logger that drops records below `min_level`.
    pub fn with_min_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Returns true when a record at `level` would be written.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Writes a log record as a JSON line, unless filtered by level.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Returns the underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines_with_sentence_id() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("impact.log")).unwrap();
        let record = LogRecord::new("matcher", LogLevel::Info, "impact.sentence.scored")
            .for_sentence("s-17")
            .with_metadata(json!({ "matches": 3 }));
        logger.log(&record).unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        let parsed: LogRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.sentence_id.as_deref(), Some("s-17"));
        assert_eq!(parsed.metadata["matches"], json!(3));
    }

    #[test]
    fn drops_records_below_min_level() {
        let dir = tempdir().unwrap();
        let logger =
            JsonLogger::with_min_level(dir.path().join("impact.log"), LogLevel::Warn).unwrap();
        logger
            .log(&LogRecord::new("matcher", LogLevel::Debug, "noise"))
            .unwrap();
        logger
            .log(&LogRecord::new("matcher", LogLevel::Warn, "kept"))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"message\":\"kept\""));
    }

    #[test]
    fn parses_level_names() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
