use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use impact_logging::LogLevel;
use serde::Deserialize;

use crate::scoring::IMPACT_SCALES;

/// Scoring run configuration, read from TOML.
///
/// ```toml
/// model_file = "impact_model.json"
/// log_path = "logs/impact.log"
/// log_level = "info"
/// impact_scales = ["emotional_scale", "style_scale"]
/// max_parallel = 8
/// ```
#[derive(Debug, Clone)]
pub struct ImpactConfig {
    /// JSON rule catalogue.
    pub model_file: PathBuf,
    /// JSON-lines log file; logging is off when absent.
    pub log_path: Option<PathBuf>,
    /// Minimum level written to the log.
    pub log_level: LogLevel,
    /// Scales reported per sentence.
    pub impact_scales: Vec<String>,
    /// Sentences scored concurrently.
    pub max_parallel: usize,
    source_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ImpactConfigSerde {
    model_file: PathBuf,
    #[serde(default)]
    log_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_impact_scales")]
    impact_scales: Vec<String>,
    #[serde(default = "default_max_parallel")]
    max_parallel: usize,
}

impl ImpactConfig {
    /// Loads configuration from a TOML file. Relative paths resolve against
    /// the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading impact config {}", path.display()))?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml_str(&raw, source_dir)
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses configuration text, resolving relative paths against `source_dir`.
    pub fn from_toml_str(raw: &str, source_dir: impl Into<PathBuf>) -> Result<Self> {
        let document: ImpactConfigSerde = toml::from_str(raw)?;
        let Some(log_level) = LogLevel::parse(&document.log_level) else {
            bail!("unknown log level {:?}", document.log_level);
        };
        if document.impact_scales.is_empty() {
            bail!("impact_scales must name at least one scale");
        }
        if let Some(unknown) = document
            .impact_scales
            .iter()
            .find(|scale| !IMPACT_SCALES.contains(&scale.as_str()))
        {
            bail!("unknown impact scale {unknown:?}");
        }
        let mut config = Self {
            model_file: document.model_file,
            log_path: document.log_path,
            log_level,
            impact_scales: document.impact_scales,
            max_parallel: document.max_parallel.max(1),
            source_dir: source_dir.into(),
        };
        config.model_file = config.resolve_path(&config.model_file);
        config.log_path = config.log_path.as_ref().map(|p| config.resolve_path(p));
        Ok(config)
    }

    /// Resolves a path relative to the configuration file.
    #[must_use]
    pub fn resolve_path(&self, candidate: impl AsRef<Path>) -> PathBuf {
        let candidate = candidate.as_ref();
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.source_dir.join(candidate)
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_impact_scales() -> Vec<String> {
    IMPACT_SCALES.iter().map(ToString::to_string).collect()
}

const fn default_max_parallel() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_with_defaults_and_resolves_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("impact.toml");
        fs::write(&path, "model_file = \"data/impact_model.json\"\nlog_path = \"logs/impact.log\"\n").unwrap();
        let config = ImpactConfig::load(&path).unwrap();
        assert_eq!(config.model_file, dir.path().join("data/impact_model.json"));
        assert_eq!(config.log_path, Some(dir.path().join("logs/impact.log")));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.impact_scales.len(), 4);
        assert_eq!(config.max_parallel, 8);
    }

    #[test]
    fn rejects_unknown_scale_and_level() {
        let err = ImpactConfig::from_toml_str(
            "model_file = \"m.json\"\nimpact_scales = [\"plot_scale\"]\n",
            ".",
        )
        .unwrap_err();
        assert!(err.to_string().contains("plot_scale"));
        assert!(ImpactConfig::from_toml_str("model_file = \"m.json\"\nlog_level = \"loud\"\n", ".").is_err());
    }

    #[test]
    fn zero_parallelism_is_clamped() {
        let config =
            ImpactConfig::from_toml_str("model_file = \"/abs/m.json\"\nmax_parallel = 0\n", "/cfg").unwrap();
        assert_eq!(config.max_parallel, 1);
        assert_eq!(config.model_file, PathBuf::from("/abs/m.json"));
    }
}
