use tracing::warn;

use crate::{
    error::{ImpactError, ImpactResult},
    record::{AspectMatch, AspectStage, ContextMatch, Evidence},
    rule::{Condition, ImpactModel, ImpactRule},
    sentence::Sentence,
    term::{find_phrase_occurrences, find_tokens_matching, TokenField},
};

/// Verdict of a rule's condition on a sentence, after inversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// The rule may fire; carries evidence when a (non-inverted) condition held.
    Accepted(Option<Evidence>),
    /// The rule must not fire.
    Rejected,
}

impl ConditionOutcome {
    /// True for [`ConditionOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Evaluates rule conditions against a sentence using the model's aspect
/// groups.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator<'m> {
    model: &'m ImpactModel,
}

impl<'m> ConditionEvaluator<'m> {
    /// Creates an evaluator over a model.
    #[must_use]
    pub const fn new(model: &'m ImpactModel) -> Self {
        Self { model }
    }

    /// Decides whether `rule` may fire in `sentence`.
    ///
    /// Errors are scoped to this rule: an unsupported condition type or an
    /// unusable term pattern. A missing aspect group is logged and counts as
    /// an absent condition, so inverted rules still fire.
    pub fn evaluate(&self, rule: &ImpactRule, sentence: &Sentence) -> ImpactResult<ConditionOutcome> {
        let Some(condition) = &rule.condition else {
            return Ok(ConditionOutcome::Accepted(None));
        };
        let evidence = match condition {
            Condition::Aspect { aspect_group } => self.aspect_evidence(rule, aspect_group, sentence)?,
            Condition::Context {
                context_term,
                location,
                term_type,
            } => {
                let matches: Vec<ContextMatch> =
                    find_phrase_occurrences(sentence, context_term, *location, rule.case_sensitive)?
                        .map(|(offset, text)| ContextMatch {
                            offset,
                            match_string: text.to_string(),
                            context_term: context_term.clone(),
                            term_type: term_type.clone(),
                        })
                        .collect();
                (!matches.is_empty()).then_some(Evidence::Context(matches))
            }
            Condition::Unsupported { condition_type } => {
                return Err(ImpactError::UnsupportedConditionKind(condition_type.clone()));
            }
        };
        let holds = evidence.is_some();
        Ok(if holds == rule.invert {
            ConditionOutcome::Rejected
        } else if rule.invert {
            ConditionOutcome::Accepted(None)
        } else {
            ConditionOutcome::Accepted(evidence)
        })
    }

    // Per-term fallback: the first aspect term that occurs, either directly
    // or through a lemma, supplies all the evidence.
    fn aspect_evidence(
        &self,
        rule: &ImpactRule,
        aspect_group: &str,
        sentence: &Sentence,
    ) -> ImpactResult<Option<Evidence>> {
        let Some(group) = self.model.aspect_group(aspect_group) else {
            warn!(
                impact_term = %rule.impact_term.pattern,
                error = %ImpactError::UnknownAspectGroup(aspect_group.to_string()),
                "aspect condition treated as absent"
            );
            return Ok(None);
        };
        for aspect_term in &group.terms {
            for (field, stage) in [
                (TokenField::Word, AspectStage::Word),
                (TokenField::Lemma, AspectStage::Lemma),
            ] {
                let matches: Vec<AspectMatch> =
                    find_tokens_matching(sentence, aspect_term, rule.case_sensitive, field, None)?
                        .map(|(token_index, token)| AspectMatch {
                            token_index,
                            match_term: token.word.clone(),
                            match_lemma: token.lemma.clone(),
                            aspect_term: aspect_term.clone(),
                            aspect_group: aspect_group.to_string(),
                            stage,
                        })
                        .collect();
                if !matches.is_empty() {
                    return Ok(Some(Evidence::Aspect(matches)));
                }
            }
        }
        Ok(None)
    }
}
