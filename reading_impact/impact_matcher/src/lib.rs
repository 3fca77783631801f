#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Rule-based reading impact matching over Alpino dependency parses.
//!
//! A loaded [`ImpactModel`] is matched against [`Sentence`]s built from
//! parser output; every firing rule yields a [`MatchRecord`]. Matching is a
//! pure function of model and sentence, so one `Arc<ImpactModel>` can serve
//! any number of scoring threads.

/// Concurrent batch scoring with per-sentence failure reporting.
pub mod batch;
/// Aspect and context condition evaluation.
pub mod condition;
/// TOML configuration for scoring runs.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Rule orchestration: the engine entry point.
pub mod matcher;
/// Match output records.
pub mod record;
/// Rule catalogue and model loading.
pub mod rule;
/// Category counts and scale mapping.
pub mod scoring;
/// Alpino parse flattening.
pub mod sentence;
/// Primitive term and phrase matching.
pub mod term;

/// Telemetry builder/hook for scoring runs.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use batch::{BatchReport, BatchScorer, ScoredSentence, SentenceInput, SentenceOutcome};
pub use condition::{ConditionEvaluator, ConditionOutcome};
pub use config::ImpactConfig;
pub use error::{ImpactError, ImpactResult};
pub use matcher::{match_all, match_rule, ImpactMatcher};
pub use record::{AspectMatch, AspectStage, ContextMatch, Evidence, MatchPosition, MatchRecord};
pub use rule::{AspectGroup, Condition, ImpactModel, ImpactRule, ImpactTerm, Location, TermKind};
pub use scoring::{ImpactScore, ScaleScores, IMPACT_SCALES};
pub use sentence::{build_sentence, Sentence, WordToken};
pub use telemetry::{MatcherTelemetry, MatcherTelemetryBuilder};
pub use term::{
    find_phrase_occurrences, find_tokens_matching, is_wildcard, term_match, wildcard_match,
    PhraseMatches, TermPattern, TokenField, TokenMatches,
};
