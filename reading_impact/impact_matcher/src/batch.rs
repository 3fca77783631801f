use std::sync::Arc;

use anyhow::{Context, Result};
use impact_logging::LogLevel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::ImpactConfig,
    matcher::ImpactMatcher,
    record::MatchRecord,
    rule::ImpactModel,
    scoring::{ImpactScore, ScaleScores, IMPACT_SCALES},
    sentence::Sentence,
    telemetry::MatcherTelemetry,
};

/// A parse waiting to be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceInput {
    /// Caller's identifier for the sentence.
    pub sentence_id: String,
    /// Alpino parse as JSON.
    pub parse: Value,
}

/// Result for a sentence that could be matched, possibly without any match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSentence {
    /// Caller's identifier for the sentence.
    pub sentence_id: String,
    /// Every match, in catalogue then occurrence order.
    pub matches: Vec<MatchRecord>,
    /// Counts per impact category.
    pub score: ImpactScore,
    /// Counts for the configured impact scales, in configuration order.
    pub scales: IndexMap<String, usize>,
}

/// Per-sentence result of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SentenceOutcome {
    /// The sentence was matched.
    Scored(ScoredSentence),
    /// The parse was rejected; the sentence has no score.
    Failed {
        /// Caller's identifier for the sentence.
        sentence_id: String,
        /// Why the parse was rejected.
        error: String,
    },
}

impl SentenceOutcome {
    /// Identifier of the sentence.
    #[must_use]
    pub fn sentence_id(&self) -> &str {
        match self {
            Self::Scored(scored) => &scored.sentence_id,
            Self::Failed { sentence_id, .. } => sentence_id,
        }
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// One outcome per input sentence.
    pub outcomes: Vec<SentenceOutcome>,
}

impl BatchReport {
    /// Sentences that were matched, including those without matches.
    #[must_use]
    pub fn scored(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SentenceOutcome::Scored(_)))
            .count()
    }

    /// Sentences whose parse was rejected.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.scored()
    }

    /// Matched sentences that produced no match at all.
    #[must_use]
    pub fn zero_match(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SentenceOutcome::Scored(s) if s.matches.is_empty()))
            .count()
    }
}

/// Scores sentences against one shared model.
#[derive(Debug, Clone)]
pub struct BatchScorer {
    matcher: ImpactMatcher,
    telemetry: Option<MatcherTelemetry>,
    max_parallel: usize,
    impact_scales: Arc<[String]>,
}

impl BatchScorer {
    /// Creates a scorer over a loaded model.
    #[must_use]
    pub fn new(model: Arc<ImpactModel>, telemetry: Option<MatcherTelemetry>) -> Self {
        Self {
            matcher: ImpactMatcher::new(model),
            telemetry,
            max_parallel: 8,
            impact_scales: IMPACT_SCALES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Restricts the scales reported per sentence. Names outside
    /// [`IMPACT_SCALES`] are ignored.
    #[must_use]
    pub fn with_impact_scales<I, S>(mut self, scales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.impact_scales = scales
            .into_iter()
            .map(Into::into)
            .filter(|scale| IMPACT_SCALES.contains(&scale.as_str()))
            .collect();
        self
    }

    /// Limits how many sentences are scored at once.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Loads the model and telemetry described by a configuration.
    pub fn from_config(config: &ImpactConfig) -> Result<Self> {
        let model = ImpactModel::load(&config.model_file)
            .with_context(|| format!("loading impact model {}", config.model_file.display()))?;
        let telemetry = match &config.log_path {
            Some(path) => Some(
                MatcherTelemetry::builder("impact-matcher")
                    .log_path(path)
                    .min_level(config.log_level)
                    .build()?,
            ),
            None => None,
        };
        let scorer = Self::new(Arc::new(model), telemetry)
            .with_max_parallel(config.max_parallel)
            .with_impact_scales(config.impact_scales.iter().cloned());
        let unresolved = scorer.matcher.model().unresolved_aspect_groups();
        if !unresolved.is_empty() {
            tracing::warn!(groups = ?unresolved, "rules refer to undefined aspect groups");
            scorer.log(
                LogLevel::Warn,
                "impact.model.unresolved_aspect_groups",
                json!({ "groups": unresolved }),
            );
        }
        Ok(scorer)
    }

    /// Scores one sentence. A rejected parse becomes a failed outcome.
    #[must_use]
    pub fn score_sentence(&self, input: SentenceInput) -> SentenceOutcome {
        let SentenceInput { sentence_id, parse } = input;
        let sentence = match Sentence::from_parse(parse) {
            Ok(sentence) => sentence,
            Err(err) => {
                self.log_sentence(
                    LogLevel::Warn,
                    "impact.sentence.failed",
                    &sentence_id,
                    json!({ "error": err.to_string() }),
                );
                return SentenceOutcome::Failed {
                    sentence_id,
                    error: err.to_string(),
                };
            }
        };
        let matches = self.matcher.match_all(&sentence);
        let score = ImpactScore::from_matches(&matches);
        let all_scales = ScaleScores::from_score(&score);
        let scales = self
            .impact_scales
            .iter()
            .filter_map(|scale| all_scales.get(scale).map(|value| (scale.clone(), value)))
            .collect();
        self.log_sentence(
            LogLevel::Debug,
            "impact.sentence.scored",
            &sentence_id,
            json!({ "matches": matches.len(), "tokens": sentence.len() }),
        );
        SentenceOutcome::Scored(ScoredSentence {
            sentence_id,
            matches,
            score,
            scales,
        })
    }

    /// Scores a batch on blocking worker threads, `max_parallel` at a time.
    /// The report keeps input order.
    pub async fn process_batch(&self, inputs: Vec<SentenceInput>) -> Result<BatchReport> {
        self.log(
            LogLevel::Info,
            "impact.batch.start",
            json!({ "count": inputs.len() }),
        );
        let mut outcomes = Vec::with_capacity(inputs.len());
        let mut pending = inputs.into_iter().peekable();
        while pending.peek().is_some() {
            let tasks: Vec<_> = pending
                .by_ref()
                .take(self.max_parallel)
                .map(|input| {
                    let scorer = self.clone();
                    tokio::task::spawn_blocking(move || scorer.score_sentence(input))
                })
                .collect();
            for task in tasks {
                outcomes.push(task.await?);
            }
        }
        let report = BatchReport { outcomes };
        self.log(
            LogLevel::Info,
            "impact.batch.complete",
            json!({
                "scored": report.scored(),
                "failed": report.failed(),
                "zero_match": report.zero_match(),
            }),
        );
        Ok(report)
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(tel) = &self.telemetry {
            if let Err(err) = tel.log(level, message, metadata) {
                tracing::error!(error = %err, "impact telemetry write failed");
            }
        }
    }

    fn log_sentence(&self, level: LogLevel, message: &str, sentence_id: &str, metadata: Value) {
        if let Some(tel) = &self.telemetry {
            if let Err(err) = tel.log_sentence(level, message, sentence_id, metadata) {
                tracing::error!(error = %err, "impact telemetry write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rule::{ImpactRule, ImpactTerm},
        sentence::fixtures::parse_of,
    };
    use indexmap::IndexMap;
    use std::fs;
    use tempfile::tempdir;

    fn scorer(telemetry: Option<MatcherTelemetry>) -> BatchScorer {
        let model = ImpactModel::from_parts(
            vec![
                ImpactRule::new(ImpactTerm::lemma("zucht"), "Affect"),
                ImpactRule::new(ImpactTerm::phrase("aan het einde"), "Narrative"),
            ],
            IndexMap::new(),
        );
        BatchScorer::new(Arc::new(model), telemetry).with_max_parallel(2)
    }

    fn inputs() -> Vec<SentenceInput> {
        let mut broken = parse_of("kapot", &[("kapot", "kapot", "adj")]);
        broken.as_object_mut().unwrap().remove("@version");
        vec![
            SentenceInput {
                sentence_id: "s-1".into(),
                parse: parse_of("een zucht aan het einde", &[("een", "een", "det"), ("zucht", "zucht", "noun")]),
            },
            SentenceInput {
                sentence_id: "s-2".into(),
                parse: broken,
            },
            SentenceInput {
                sentence_id: "s-3".into(),
                parse: parse_of("niets", &[("niets", "niets", "pron")]),
            },
        ]
    }

    #[test]
    fn failed_and_zero_match_sentences_are_distinct() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime
            .block_on(scorer(None).process_batch(inputs()))
            .unwrap();
        let ids: Vec<_> = report.outcomes.iter().map(SentenceOutcome::sentence_id).collect();
        assert_eq!(ids, ["s-1", "s-2", "s-3"]);
        assert_eq!(report.scored(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.zero_match(), 1);
        let SentenceOutcome::Scored(first) = &report.outcomes[0] else {
            panic!("s-1 should score");
        };
        assert_eq!(first.scales.len(), 4);
        assert_eq!(first.scales["emotional_scale"], 2);
        assert_eq!(first.scales["narrative_scale"], 1);
    }

    #[test]
    fn reports_only_selected_scales() {
        let scorer = scorer(None).with_impact_scales(["narrative_scale", "plot_scale", "emotional_scale"]);
        let SentenceOutcome::Scored(scored) = scorer.score_sentence(inputs().remove(0)) else {
            panic!("s-1 should score");
        };
        let scales: Vec<_> = scored.scales.iter().map(|(name, value)| (name.as_str(), *value)).collect();
        assert_eq!(scales, [("narrative_scale", 1), ("emotional_scale", 2)]);
    }

    #[tokio::test]
    async fn batch_logs_lifecycle_and_failures() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("impact.log");
        let telemetry = MatcherTelemetry::builder("impact-matcher")
            .log_path(&log_path)
            .min_level(LogLevel::Info)
            .build()
            .unwrap();
        scorer(Some(telemetry)).process_batch(inputs()).await.unwrap();
        let content = fs::read_to_string(log_path).unwrap();
        assert!(content.contains("impact.batch.start"));
        assert!(content.contains("\"sentence_id\":\"s-2\""));
        assert!(content.contains("\"failed\":1"));
        assert!(!content.contains("impact.sentence.scored"));
    }

    #[test]
    fn builds_from_config() {
        let dir = tempdir().unwrap();
        let model = json!({
            "impact_rules": [{
                "impact_term": { "pattern": "zucht", "kind": "lemma" },
                "impact_type": "Affect",
                "condition": { "condition_type": "aspect_term", "aspect_group": "Geluid" }
            }]
        });
        fs::write(dir.path().join("model.json"), model.to_string()).unwrap();
        let config_path = dir.path().join("impact.toml");
        fs::write(
            &config_path,
            "model_file = \"model.json\"\nlog_path = \"impact.log\"\nlog_level = \"warn\"\nimpact_scales = [\"style_scale\"]\n",
        )
        .unwrap();
        let config = ImpactConfig::load(&config_path).unwrap();
        let scorer = BatchScorer::from_config(&config).unwrap();
        let outcome = scorer.score_sentence(SentenceInput {
            sentence_id: "s-1".into(),
            parse: parse_of("zucht", &[("zucht", "zucht", "noun")]),
        });
        let SentenceOutcome::Scored(scored) = outcome else {
            panic!("expected a score");
        };
        assert!(scored.matches.is_empty());
        assert_eq!(scored.scales.keys().collect::<Vec<_>>(), ["style_scale"]);
        let content = fs::read_to_string(dir.path().join("impact.log")).unwrap();
        assert!(content.contains("impact.model.unresolved_aspect_groups"));
    }
}
