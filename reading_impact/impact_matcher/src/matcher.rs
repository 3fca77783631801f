use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    condition::{ConditionEvaluator, ConditionOutcome},
    error::ImpactResult,
    record::{MatchPosition, MatchRecord},
    rule::{ImpactModel, ImpactRule, Location, TermKind},
    sentence::Sentence,
    term::{find_phrase_occurrences, find_tokens_matching, TokenField},
};

/// Matches one rule against a sentence.
///
/// Candidates come from the rule term; the condition, which depends only on
/// the rule and the sentence, then keeps or drops all of them. Pattern and
/// condition failures are logged and yield no records.
#[must_use]
pub fn match_rule(model: &ImpactModel, rule: &ImpactRule, sentence: &Sentence) -> Vec<MatchRecord> {
    let candidates = match candidates(rule, sentence) {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(
                impact_term = %rule.impact_term.pattern,
                error = %err,
                "impact term skipped"
            );
            return Vec::new();
        }
    };
    if candidates.is_empty() {
        return candidates;
    }
    match ConditionEvaluator::new(model).evaluate(rule, sentence) {
        Ok(ConditionOutcome::Accepted(evidence)) => {
            debug!(
                impact_term = %rule.impact_term.pattern,
                matches = candidates.len(),
                "impact rule fired"
            );
            candidates
                .into_iter()
                .map(|mut record| {
                    record.evidence.clone_from(&evidence);
                    record
                })
                .collect()
        }
        Ok(ConditionOutcome::Rejected) => Vec::new(),
        Err(err) => {
            warn!(
                impact_term = %rule.impact_term.pattern,
                error = %err,
                "condition evaluation failed; candidates skipped"
            );
            Vec::new()
        }
    }
}

/// Matches every rule of the model, in catalogue order.
#[must_use]
pub fn match_all(model: &ImpactModel, sentence: &Sentence) -> Vec<MatchRecord> {
    model
        .rules()
        .iter()
        .flat_map(|rule| match_rule(model, rule, sentence))
        .collect()
}

fn candidates(rule: &ImpactRule, sentence: &Sentence) -> ImpactResult<Vec<MatchRecord>> {
    let term = &rule.impact_term;
    let record = |match_term: String, match_lemma: Option<String>, position| MatchRecord {
        impact_type: rule.impact_type.clone(),
        impact_term: term.pattern.clone(),
        impact_term_type: term.kind,
        match_term,
        match_lemma,
        position,
        evidence: None,
    };
    let field = match term.kind {
        TermKind::Phrase => {
            return Ok(
                find_phrase_occurrences(sentence, &term.pattern, Location::Anywhere, rule.case_sensitive)?
                    .map(|(offset, text)| record(text.to_string(), None, MatchPosition::Offset(offset)))
                    .collect(),
            );
        }
        TermKind::Word => TokenField::Word,
        TermKind::Lemma => TokenField::Lemma,
    };
    Ok(find_tokens_matching(
        sentence,
        &term.pattern,
        rule.case_sensitive,
        field,
        term.pos.as_deref(),
    )?
    .map(|(index, token)| {
        record(
            token.word.clone(),
            Some(token.lemma.clone()),
            MatchPosition::TokenIndex(index),
        )
    })
    .collect())
}

/// Entry point holding the shared model.
#[derive(Debug, Clone)]
pub struct ImpactMatcher {
    model: Arc<ImpactModel>,
}

impl ImpactMatcher {
    /// Creates a matcher over a loaded model.
    #[must_use]
    pub const fn new(model: Arc<ImpactModel>) -> Self {
        Self { model }
    }

    /// The shared model.
    #[must_use]
    pub fn model(&self) -> &Arc<ImpactModel> {
        &self.model
    }

    /// All records for a sentence: catalogue order, then occurrence order.
    #[must_use]
    pub fn match_all(&self, sentence: &Sentence) -> Vec<MatchRecord> {
        match_all(&self.model, sentence)
    }

    /// Records of a single rule.
    #[must_use]
    pub fn match_rule(&self, rule: &ImpactRule, sentence: &Sentence) -> Vec<MatchRecord> {
        match_rule(&self.model, rule, sentence)
    }

    /// Builds the sentence from an Alpino parse, then matches it.
    pub fn match_parse(&self, parse: Value) -> ImpactResult<Vec<MatchRecord>> {
        let sentence = Sentence::from_parse(parse)?;
        Ok(self.match_all(&sentence))
    }
}
