use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::MatchRecord;

/// Impact categories that feed the reading impact scales.
pub const AFFECT: &str = "Affect";
/// Style category.
pub const STYLE: &str = "Style";
/// Narrative category.
pub const NARRATIVE: &str = "Narrative";
/// Reflection category.
pub const REFLECTION: &str = "Reflection";

/// Scale names in reporting order.
pub const IMPACT_SCALES: [&str; 4] = [
    "emotional_scale",
    "style_scale",
    "reflection_scale",
    "narrative_scale",
];

/// Match counts per impact category, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactScore {
    counts: IndexMap<String, usize>,
}

impl ImpactScore {
    /// Counts records per category. Records without a category are ignored.
    #[must_use]
    pub fn from_matches(matches: &[MatchRecord]) -> Self {
        let mut counts = IndexMap::new();
        for record in matches.iter().filter(|r| !r.impact_type.is_empty()) {
            *counts.entry(record.impact_type.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Count for a category; zero when absent.
    #[must_use]
    pub fn count(&self, impact_type: &str) -> usize {
        self.counts.get(impact_type).copied().unwrap_or(0)
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Iterates `(category, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Per-scale scores derived from category counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleScores {
    /// Affect, Style and Narrative together.
    pub emotional_scale: usize,
    /// Style only.
    pub style_scale: usize,
    /// Reflection only.
    pub reflection_scale: usize,
    /// Narrative only.
    pub narrative_scale: usize,
}

impl ScaleScores {
    /// Maps category counts onto the four scales.
    #[must_use]
    pub fn from_score(score: &ImpactScore) -> Self {
        Self {
            emotional_scale: score.count(AFFECT) + score.count(STYLE) + score.count(NARRATIVE),
            style_scale: score.count(STYLE),
            reflection_scale: score.count(REFLECTION),
            narrative_scale: score.count(NARRATIVE),
        }
    }

    /// Score by scale name, as listed in [`IMPACT_SCALES`].
    #[must_use]
    pub fn get(&self, scale: &str) -> Option<usize> {
        match scale {
            "emotional_scale" => Some(self.emotional_scale),
            "style_scale" => Some(self.style_scale),
            "reflection_scale" => Some(self.reflection_scale),
            "narrative_scale" => Some(self.narrative_scale),
            _ => None,
        }
    }
}
