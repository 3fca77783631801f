use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use impact_logging::{JsonLogger, LogLevel, LogRecord};
use serde_json::Value;

/// Builder configuring telemetry for scoring runs.
pub struct MatcherTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
}

impl MatcherTelemetryBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops records below `level`.
    #[must_use]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<MatcherTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_min_level(path, self.min_level)?),
            None => None,
        };
        Ok(MatcherTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
            }),
        })
    }
}

/// Cloneable logging handle shared by scoring tasks.
#[derive(Clone)]
pub struct MatcherTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for MatcherTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherTelemetry")
            .field("module", &self.inner.module)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
}

impl MatcherTelemetry {
    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> MatcherTelemetryBuilder {
        MatcherTelemetryBuilder::new(module)
    }

    /// Logs a structured record.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        self.write(LogRecord::new(&self.inner.module, level, message).with_metadata(metadata))
    }

    /// Logs a structured record about one sentence.
    pub fn log_sentence(
        &self,
        level: LogLevel,
        message: &str,
        sentence_id: &str,
        metadata: Value,
    ) -> Result<()> {
        self.write(
            LogRecord::new(&self.inner.module, level, message)
                .for_sentence(sentence_id)
                .with_metadata(metadata),
        )
    }

    fn write(&self, record: LogRecord) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            logger.log(&record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_sentence_records() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("impact.log");
        let telemetry = MatcherTelemetry::builder("impact-matcher")
            .log_path(&log_path)
            .min_level(LogLevel::Info)
            .build()
            .unwrap();
        telemetry
            .log_sentence(LogLevel::Warn, "impact.sentence.failed", "s-3", json!({ "error": "x" }))
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "impact.rule", json!({}))
            .unwrap();
        let content = std::fs::read_to_string(log_path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"sentence_id\":\"s-3\""));
    }

    #[test]
    fn telemetry_without_path_is_silent() {
        let telemetry = MatcherTelemetry::builder("impact-matcher").build().unwrap();
        assert!(telemetry.log(LogLevel::Error, "nothing", json!({})).is_ok());
    }
}
