use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ImpactError, ImpactResult},
    term::{phrase_regex, TermPattern},
};

/// How an impact term is compared against a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    /// Matched against token surface forms.
    Word,
    /// Matched against token lemmas.
    Lemma,
    /// Matched against the sentence string.
    Phrase,
}

impl TermKind {
    /// Catalogue label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Lemma => "lemma",
            Self::Phrase => "phrase",
        }
    }
}

/// Pattern an impact rule looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactTerm {
    /// Term text, possibly with a single-sided wildcard.
    #[serde(alias = "string")]
    pub pattern: String,
    /// Matching mode.
    #[serde(alias = "type")]
    pub kind: TermKind,
    /// Required part-of-speech for word and lemma terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
}

impl ImpactTerm {
    /// Surface-form term.
    #[must_use]
    pub fn word(pattern: impl Into<String>) -> Self {
        Self::new(pattern, TermKind::Word)
    }

    /// Lemma term.
    #[must_use]
    pub fn lemma(pattern: impl Into<String>) -> Self {
        Self::new(pattern, TermKind::Lemma)
    }

    /// Multi-word phrase term.
    #[must_use]
    pub fn phrase(pattern: impl Into<String>) -> Self {
        Self::new(pattern, TermKind::Phrase)
    }

    /// Restricts the term to a part-of-speech.
    #[must_use]
    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }

    fn new(pattern: impl Into<String>, kind: TermKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            pos: None,
        }
    }
}

/// Where a context term must occur in the sentence string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Anywhere in the sentence.
    Anywhere,
    /// Anchored to the start of the sentence.
    SentenceStart,
    /// Anchored to the end of the sentence.
    SentenceEnd,
    /// Near the impact term; searched as anywhere.
    #[default]
    Neighbourhood,
}

/// Extra requirement a rule places on the sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    /// A term of the named aspect group must occur in the sentence.
    Aspect {
        /// Aspect group name.
        aspect_group: String,
    },
    /// A context phrase must occur at the given location.
    Context {
        /// Phrase searched in the sentence string.
        context_term: String,
        /// Where the phrase must occur.
        location: Location,
        /// Label of the context term, copied into evidence.
        term_type: String,
    },
    /// A condition type this version does not know. Never satisfied.
    Unsupported {
        /// Tag as found in the catalogue.
        condition_type: String,
    },
}

impl Condition {
    /// Aspect-group condition.
    #[must_use]
    pub fn aspect(aspect_group: impl Into<String>) -> Self {
        Self::Aspect {
            aspect_group: aspect_group.into(),
        }
    }

    /// Context-term condition.
    #[must_use]
    pub fn context(
        context_term: impl Into<String>,
        location: Location,
        term_type: impl Into<String>,
    ) -> Self {
        Self::Context {
            context_term: context_term.into(),
            location,
            term_type: term_type.into(),
        }
    }

    /// Catalogue tag of the condition.
    #[must_use]
    pub fn condition_type(&self) -> &str {
        match self {
            Self::Aspect { .. } => ASPECT_TERM,
            Self::Context { .. } => CONTEXT_TERM,
            Self::Unsupported { condition_type } => condition_type,
        }
    }
}

const ASPECT_TERM: &str = "aspect_term";
const CONTEXT_TERM: &str = "context_term";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCondition {
    condition_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aspect_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    term_type: Option<String>,
}

impl TryFrom<RawCondition> for Condition {
    type Error = String;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        match raw.condition_type.as_str() {
            ASPECT_TERM => raw
                .aspect_group
                .map(Self::aspect)
                .ok_or_else(|| "aspect_term condition without aspect_group".to_string()),
            CONTEXT_TERM => {
                let context_term = raw
                    .context_term
                    .ok_or_else(|| "context_term condition without context_term".to_string())?;
                Ok(Self::Context {
                    context_term,
                    location: raw.location.unwrap_or_default(),
                    term_type: raw.term_type.unwrap_or_default(),
                })
            }
            _ => Ok(Self::Unsupported {
                condition_type: raw.condition_type,
            }),
        }
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        let mut raw = Self {
            condition_type: condition.condition_type().to_string(),
            aspect_group: None,
            context_term: None,
            location: None,
            term_type: None,
        };
        match condition {
            Condition::Aspect { aspect_group } => raw.aspect_group = Some(aspect_group),
            Condition::Context {
                context_term,
                location,
                term_type,
            } => {
                raw.context_term = Some(context_term);
                raw.location = Some(location);
                raw.term_type = Some(term_type);
            }
            Condition::Unsupported { .. } => {}
        }
        raw
    }
}

/// Catalogue entry tying a term to an impact category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRule")]
pub struct ImpactRule {
    /// What to look for.
    pub impact_term: ImpactTerm,
    /// Impact category (`Affect`, `Style`, `Narrative`, `Reflection`, ...).
    pub impact_type: String,
    /// Optional extra requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Fire only when the condition does NOT hold.
    #[serde(default, alias = "filter")]
    pub invert: bool,
    /// Compare terms without lowercasing.
    #[serde(default)]
    pub case_sensitive: bool,
}

// Older catalogues spell case handling as `ignorecase`; an explicit
// `case_sensitive` wins when both are present.
#[derive(Debug, Deserialize)]
struct RawRule {
    impact_term: ImpactTerm,
    impact_type: String,
    #[serde(default)]
    condition: Option<Condition>,
    #[serde(default, alias = "filter")]
    invert: bool,
    #[serde(default)]
    case_sensitive: Option<bool>,
    #[serde(default)]
    ignorecase: Option<bool>,
}

impl From<RawRule> for ImpactRule {
    fn from(raw: RawRule) -> Self {
        let case_sensitive = raw
            .case_sensitive
            .or_else(|| raw.ignorecase.map(|ignore| !ignore))
            .unwrap_or(false);
        Self {
            impact_term: raw.impact_term,
            impact_type: raw.impact_type,
            condition: raw.condition,
            invert: raw.invert,
            case_sensitive,
        }
    }
}

impl ImpactRule {
    /// Unconditional, case-insensitive rule.
    #[must_use]
    pub fn new(impact_term: ImpactTerm, impact_type: impl Into<String>) -> Self {
        Self {
            impact_term,
            impact_type: impact_type.into(),
            condition: None,
            invert: false,
            case_sensitive: false,
        }
    }

    /// Attaches a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Inverts the condition.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Makes term comparison case-sensitive.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// Named set of terms used by aspect conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectGroup {
    /// Terms in definition order; tried first to last.
    #[serde(rename = "aspect_term", alias = "aspect_terms")]
    pub terms: Vec<String>,
}

impl AspectGroup {
    /// Creates a group from its terms.
    #[must_use]
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }
}

/// Immutable rule catalogue shared by every matching call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactModel {
    #[serde(default)]
    impact_rules: Vec<ImpactRule>,
    #[serde(default)]
    aspect_groups: IndexMap<String, AspectGroup>,
}

impl ImpactModel {
    /// Assembles a model without validating it.
    #[must_use]
    pub fn from_parts(
        impact_rules: Vec<ImpactRule>,
        aspect_groups: IndexMap<String, AspectGroup>,
    ) -> Self {
        Self {
            impact_rules,
            aspect_groups,
        }
    }

    /// Decodes and validates a JSON catalogue.
    pub fn from_json_str(json: &str) -> ImpactResult<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Reads and validates a JSON catalogue from disk.
    pub fn load(path: impl AsRef<Path>) -> ImpactResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Rules in catalogue order.
    #[must_use]
    pub fn rules(&self) -> &[ImpactRule] {
        &self.impact_rules
    }

    /// Looks up an aspect group by name.
    #[must_use]
    pub fn aspect_group(&self, name: &str) -> Option<&AspectGroup> {
        self.aspect_groups.get(name)
    }

    /// All aspect groups in definition order.
    #[must_use]
    pub const fn aspect_groups(&self) -> &IndexMap<String, AspectGroup> {
        &self.aspect_groups
    }

    /// Checks every pattern in the catalogue.
    ///
    /// Rules referring to undefined aspect groups are not an error here; see
    /// [`Self::unresolved_aspect_groups`].
    pub fn validate(&self) -> ImpactResult<()> {
        for (index, rule) in self.impact_rules.iter().enumerate() {
            let invalid = |err: ImpactError| {
                ImpactError::InvalidModel(format!(
                    "rule {index} ({:?}): {err}",
                    rule.impact_term.pattern
                ))
            };
            match rule.impact_term.kind {
                TermKind::Phrase => {
                    phrase_regex(&rule.impact_term.pattern, Location::Anywhere, rule.case_sensitive)
                        .map_err(invalid)?;
                }
                TermKind::Word | TermKind::Lemma => {
                    TermPattern::parse(&rule.impact_term.pattern).map_err(invalid)?;
                }
            }
            if let Some(Condition::Context {
                context_term,
                location,
                ..
            }) = &rule.condition
            {
                phrase_regex(context_term, *location, rule.case_sensitive).map_err(invalid)?;
            }
        }
        for (name, group) in &self.aspect_groups {
            if group.terms.is_empty() {
                return Err(ImpactError::InvalidModel(format!(
                    "aspect group {name:?} has no terms"
                )));
            }
            for term in &group.terms {
                TermPattern::parse(term).map_err(|err| {
                    ImpactError::InvalidModel(format!("aspect group {name:?}: {err}"))
                })?;
            }
        }
        Ok(())
    }

    /// Aspect groups referenced by rules but not defined, in rule order.
    #[must_use]
    pub fn unresolved_aspect_groups(&self) -> Vec<&str> {
        let mut missing: Vec<&str> = Vec::new();
        for rule in &self.impact_rules {
            if let Some(Condition::Aspect { aspect_group }) = &rule.condition {
                if !self.aspect_groups.contains_key(aspect_group)
                    && !missing.contains(&aspect_group.as_str())
                {
                    missing.push(aspect_group);
                }
            }
        }
        missing
    }
}
