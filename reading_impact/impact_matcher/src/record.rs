use serde::{Deserialize, Serialize};

use crate::rule::TermKind;

/// Where in the sentence a rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchPosition {
    /// Index into the sentence's word tokens (word and lemma terms).
    TokenIndex(usize),
    /// Character offset into the sentence string (phrase terms).
    Offset(usize),
}

/// Which search stage found an aspect term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectStage {
    /// Direct match on the token surface form.
    Word,
    /// Fallback match on the token lemma.
    Lemma,
}

/// Occurrence of an aspect-group term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectMatch {
    /// Token index of the occurrence.
    pub token_index: usize,
    /// Surface form of the token.
    pub match_term: String,
    /// Lemma of the token.
    pub match_lemma: String,
    /// Aspect term that matched.
    pub aspect_term: String,
    /// Group the term belongs to.
    pub aspect_group: String,
    /// Stage that produced the occurrence.
    pub stage: AspectStage,
}

/// Occurrence of a context term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMatch {
    /// Character offset into the sentence string.
    pub offset: usize,
    /// Matched text as it appears in the sentence.
    pub match_string: String,
    /// Context term searched for.
    pub context_term: String,
    /// Label of the context term.
    pub term_type: String,
}

/// Sub-matches supporting a conditional rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// The aspect condition held through these tokens.
    Aspect(Vec<AspectMatch>),
    /// The context condition held through these occurrences.
    Context(Vec<ContextMatch>),
}

impl Evidence {
    /// Number of supporting occurrences.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Aspect(matches) => matches.len(),
            Self::Context(matches) => matches.len(),
        }
    }

    /// True when no occurrence is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One firing of one rule in one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Impact category of the rule.
    pub impact_type: String,
    /// Rule term as written in the catalogue.
    pub impact_term: String,
    /// Kind of the rule term.
    pub impact_term_type: TermKind,
    /// Matched sentence text (token surface or phrase slice).
    pub match_term: String,
    /// Lemma of the matched token; absent for phrases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_lemma: Option<String>,
    /// Token index or string offset.
    pub position: MatchPosition,
    /// Condition sub-matches, when a condition fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}
