use thiserror::Error;

/// Errors emitted while building sentences, loading models, or matching.
#[derive(Debug, Error)]
pub enum ImpactError {
    /// The parse is missing a required structural field.
    #[error("malformed Alpino parse: {0}")]
    MalformedInput(String),
    /// A term pattern cannot be interpreted.
    #[error("invalid pattern {pattern:?}: {reason}")]
    Pattern {
        /// Offending pattern as written in the catalogue.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A rule refers to an aspect group the model does not define.
    #[error("unknown aspect group {0:?}")]
    UnknownAspectGroup(String),
    /// A rule carries a condition type the evaluator does not handle.
    #[error("unsupported condition type {0:?}")]
    UnsupportedConditionKind(String),
    /// The rule catalogue violates a model invariant.
    #[error("invalid impact model: {0}")]
    InvalidModel(String),
    /// Filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON decoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImpactError {
    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for failures scoped to a single candidate or rule, which
    /// the matcher contains instead of propagating.
    #[must_use]
    pub const fn is_per_candidate(&self) -> bool {
        matches!(
            self,
            Self::Pattern { .. } | Self::UnknownAspectGroup(_) | Self::UnsupportedConditionKind(_)
        )
    }
}

/// Convenience alias used across the crate.
pub type ImpactResult<T> = Result<T, ImpactError>;
