use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ImpactError, ImpactResult},
    rule::Location,
    sentence::{Sentence, WordToken},
};

/// Marker for prefix/suffix wildcards in catalogue terms.
pub const WILDCARD: char = '*';

/// Part-of-speech tag that satisfies any part-of-speech constraint.
pub const NAME_POS: &str = "name";

/// Returns true iff the pattern carries a wildcard marker on exactly one end.
///
/// Patterns marked on both ends (`*zucht*`) are literals: the markers are part
/// of the term.
#[must_use]
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.starts_with(WILDCARD) != pattern.ends_with(WILDCARD)
}

/// A validated term pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    /// Token must equal the pattern.
    Exact(String),
    /// `*heid`: token must end with the fixed part.
    Suffix(String),
    /// `hart*`: token must start with the fixed part.
    Prefix(String),
}

impl TermPattern {
    /// Validates a catalogue pattern.
    pub fn parse(pattern: &str) -> ImpactResult<Self> {
        if pattern.is_empty() {
            return Err(ImpactError::pattern(pattern, "empty pattern"));
        }
        if !is_wildcard(pattern) {
            return Ok(Self::Exact(pattern.to_string()));
        }
        let leading = pattern.strip_prefix(WILDCARD);
        let fixed = leading
            .or_else(|| pattern.strip_suffix(WILDCARD))
            .unwrap_or_default();
        if fixed.is_empty() {
            return Err(ImpactError::pattern(pattern, "wildcard without fixed part"));
        }
        if fixed.contains(WILDCARD) {
            return Err(ImpactError::pattern(
                pattern,
                "wildcard marker inside the term",
            ));
        }
        Ok(if leading.is_some() {
            Self::Suffix(fixed.to_string())
        } else {
            Self::Prefix(fixed.to_string())
        })
    }

    /// Same pattern with the fixed part lowercased.
    #[must_use]
    pub fn to_lowercase(&self) -> Self {
        match self {
            Self::Exact(term) => Self::Exact(term.to_lowercase()),
            Self::Suffix(term) => Self::Suffix(term.to_lowercase()),
            Self::Prefix(term) => Self::Prefix(term.to_lowercase()),
        }
    }

    /// Tests a token against the pattern.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        match self {
            Self::Exact(term) => token == term,
            Self::Suffix(term) => token.ends_with(term.as_str()),
            Self::Prefix(term) => token.starts_with(term.as_str()),
        }
    }
}

/// Matches a token against a single-sided wildcard pattern.
///
/// Anything else, including both-sided patterns, is a pattern error: callers
/// must route those through [`term_match`].
pub fn wildcard_match(token: &str, pattern: &str) -> ImpactResult<bool> {
    if !is_wildcard(pattern) {
        return Err(ImpactError::pattern(
            pattern,
            "not a single-sided wildcard pattern",
        ));
    }
    Ok(TermPattern::parse(pattern)?.matches(token))
}

/// Wildcard match for wildcard patterns, exact equality otherwise.
pub fn term_match(token: &str, pattern: &str) -> ImpactResult<bool> {
    Ok(TermPattern::parse(pattern)?.matches(token))
}

/// Token attribute a term is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenField {
    /// Surface form.
    Word,
    /// Lemma.
    Lemma,
}

/// Lazy iterator over tokens matching a term. Clone it to restart.
#[derive(Debug, Clone)]
pub struct TokenMatches<'a> {
    tokens: std::slice::Iter<'a, WordToken>,
    pattern: TermPattern,
    case_sensitive: bool,
    field: TokenField,
    pos: Option<String>,
}

impl<'a> Iterator for TokenMatches<'a> {
    type Item = (usize, &'a WordToken);

    fn next(&mut self) -> Option<Self::Item> {
        for token in self.tokens.by_ref() {
            let value = match self.field {
                TokenField::Word => token.word.as_str(),
                TokenField::Lemma => token.lemma.as_str(),
            };
            let hit = if self.case_sensitive {
                self.pattern.matches(value)
            } else {
                self.pattern.matches(&value.to_lowercase())
            };
            if !hit {
                continue;
            }
            let pos_ok = self
                .pos
                .as_deref()
                .map_or(true, |pos| token.pos == pos || token.pos == NAME_POS);
            if pos_ok {
                return Some((token.index, token));
            }
        }
        None
    }
}

/// Finds every token whose word (or lemma) matches `pattern`.
///
/// With a part-of-speech constraint, proper names (`name`) qualify whatever
/// the constraint is.
pub fn find_tokens_matching<'a>(
    sentence: &'a Sentence,
    pattern: &str,
    case_sensitive: bool,
    field: TokenField,
    pos: Option<&str>,
) -> ImpactResult<TokenMatches<'a>> {
    let mut pattern = TermPattern::parse(pattern)?;
    if !case_sensitive {
        pattern = pattern.to_lowercase();
    }
    Ok(TokenMatches {
        tokens: sentence.tokens().iter(),
        pattern,
        case_sensitive,
        field,
        pos: pos.filter(|pos| !pos.is_empty()).map(str::to_string),
    })
}

/// Lazy iterator over `(character offset, matched text)` phrase
/// occurrences. Clone it to restart.
#[derive(Debug, Clone)]
pub struct PhraseMatches<'a> {
    regex: Regex,
    haystack: &'a str,
    cursor: usize,
}

impl<'a> Iterator for PhraseMatches<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor > self.haystack.len() {
            return None;
        }
        let found = self.regex.find_at(self.haystack, self.cursor)?;
        self.cursor = if found.start() == found.end() {
            self.haystack[found.end()..]
                .chars()
                .next()
                .map_or(self.haystack.len() + 1, |c| found.end() + c.len_utf8())
        } else {
            found.end()
        };
        let offset = self.haystack[..found.start()].chars().count();
        Some((offset, found.as_str()))
    }
}

/// Compiles the word-boundary expression for a phrase at a location.
pub fn phrase_regex(phrase: &str, location: Location, case_sensitive: bool) -> ImpactResult<Regex> {
    if phrase.trim().is_empty() {
        return Err(ImpactError::pattern(phrase, "empty phrase"));
    }
    let bounded = format!(r"\b(?:{phrase})\b");
    let expression = match location {
        Location::SentenceStart => format!("^{bounded}"),
        Location::SentenceEnd => format!("{bounded}$"),
        Location::Anywhere | Location::Neighbourhood => bounded,
    };
    RegexBuilder::new(&expression)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|err| ImpactError::pattern(phrase, err.to_string()))
}

/// Finds word-bounded occurrences of `phrase` in the sentence string.
pub fn find_phrase_occurrences<'a>(
    sentence: &'a Sentence,
    phrase: &str,
    location: Location,
    case_sensitive: bool,
) -> ImpactResult<PhraseMatches<'a>> {
    Ok(PhraseMatches {
        regex: phrase_regex(phrase, location, case_sensitive)?,
        haystack: sentence.text(),
        cursor: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::fixtures::sentence_of;

    #[test]
    fn wildcard_detection() {
        assert!(is_wildcard("*heid"));
        assert!(is_wildcard("hart*"));
        assert!(!is_wildcard("*zucht*"));
        assert!(!is_wildcard("zucht"));
        assert!(!is_wildcard("*"));
    }

    #[test]
    fn exact_patterns_match_by_equality() {
        let tokens = ["zucht", "Zucht", "zuchten", "*zucht*", "hart"];
        let patterns = ["zucht", "*zucht*", "hart", "ontroerend"];
        for token in tokens {
            for pattern in patterns {
                assert_eq!(term_match(token, pattern).unwrap(), token == pattern);
            }
        }
    }

    #[test]
    fn single_sided_wildcards_anchor_fixed_part() {
        assert!(wildcard_match("hartverscheurend", "hart*").unwrap());
        assert!(!wildcard_match("ophartelijk", "hart*").unwrap());
        assert!(wildcard_match("schoonheid", "*heid").unwrap());
        assert!(!wildcard_match("heidens", "*heid").unwrap());
    }

    #[test]
    fn both_sided_patterns_are_not_wildcards() {
        assert!(wildcard_match("zucht", "*zucht*").is_err());
        assert!(!term_match("zucht", "*zucht*").unwrap());
        assert!(term_match("*zucht*", "*zucht*").unwrap());
    }

    #[test]
    fn malformed_patterns_are_errors() {
        assert!(term_match("a", "").is_err());
        assert!(term_match("hartje", "ha*rt*").is_err());
        assert!(TermPattern::parse("*he*id").is_err());
    }

    #[test]
    fn pos_constraint_admits_names() {
        let sentence = sentence_of(
            "Roos roos roos",
            &[("Roos", "Roos", "name"), ("roos", "roos", "noun"), ("roos", "roos", "verb")],
        );
        let hits: Vec<usize> =
            find_tokens_matching(&sentence, "roos", false, TokenField::Lemma, Some("verb"))
                .unwrap()
                .map(|(index, _)| index)
                .collect();
        assert_eq!(hits, [0, 2]);
    }

    #[test]
    fn case_sensitivity_is_honoured() {
        let sentence = sentence_of("Zucht", &[("Zucht", "zucht", "noun")]);
        let count = |case_sensitive| {
            find_tokens_matching(&sentence, "zucht", case_sensitive, TokenField::Word, None)
                .unwrap()
                .count()
        };
        assert_eq!(count(false), 1);
        assert_eq!(count(true), 0);
    }

    #[test]
    fn token_matches_restart_when_cloned() {
        let sentence = sentence_of("hart hartje", &[("hart", "hart", "noun"), ("hartje", "hart", "noun")]);
        let matches =
            find_tokens_matching(&sentence, "hart*", true, TokenField::Word, None).unwrap();
        let first: Vec<_> = matches.clone().collect();
        let second: Vec<_> = matches.collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn phrase_at_sentence_end_reports_offset() {
        let text = "het verhaal liep naar aan het einde";
        let sentence = sentence_of(text, &[]);
        let hits: Vec<_> =
            find_phrase_occurrences(&sentence, "aan het einde", Location::SentenceEnd, false)
                .unwrap()
                .collect();
        assert_eq!(hits, [(22, "aan het einde")]);
        assert_eq!(&text[22..], "aan het einde");
    }

    #[test]
    fn phrase_offsets_count_characters() {
        let sentence = sentence_of("één keer, aan het einde", &[]);
        let hits: Vec<_> =
            find_phrase_occurrences(&sentence, "aan het einde", Location::SentenceEnd, false)
                .unwrap()
                .collect();
        assert_eq!(hits, [(10, "aan het einde")]);
    }

    #[test]
    fn phrase_matches_restart_when_cloned() {
        let sentence = sentence_of("echt, echt waar", &[]);
        let matches = find_phrase_occurrences(&sentence, "echt", Location::Anywhere, false).unwrap();
        let first: Vec<_> = matches.clone().collect();
        let second: Vec<_> = matches.collect();
        assert_eq!(first, [(0, "echt"), (6, "echt")]);
        assert_eq!(first, second);
    }

    #[test]
    fn case_sensitive_phrase_search() {
        let sentence = sentence_of("Toch was het mooi, toch", &[]);
        let exact: Vec<_> = find_phrase_occurrences(&sentence, "toch", Location::Anywhere, true)
            .unwrap()
            .collect();
        assert_eq!(exact, [(19, "toch")]);
        let capitalised = find_phrase_occurrences(&sentence, "Toch", Location::SentenceEnd, true).unwrap();
        assert_eq!(capitalised.count(), 0);
    }

    #[test]
    fn phrase_locations_anchor() {
        let sentence = sentence_of("Toch was het mooi, toch", &[]);
        let start: Vec<_> =
            find_phrase_occurrences(&sentence, "toch", Location::SentenceStart, false)
                .unwrap()
                .collect();
        assert_eq!(start, [(0, "Toch")]);
        let anywhere: Vec<_> =
            find_phrase_occurrences(&sentence, "toch", Location::Neighbourhood, false)
                .unwrap()
                .map(|(offset, _)| offset)
                .collect();
        assert_eq!(anywhere, [0, 19]);
        let none =
            find_phrase_occurrences(&sentence, "mooi", Location::SentenceEnd, false).unwrap();
        assert_eq!(none.count(), 0);
    }

    #[test]
    fn phrase_respects_word_boundaries() {
        let sentence = sentence_of("een prachtig boek", &[]);
        let hits = find_phrase_occurrences(&sentence, "pracht", Location::Anywhere, false).unwrap();
        assert_eq!(hits.count(), 0);
    }

    #[test]
    fn invalid_phrase_is_pattern_error() {
        let sentence = sentence_of("tekst", &[]);
        let err = find_phrase_occurrences(&sentence, "(open", Location::Anywhere, false).unwrap_err();
        assert!(matches!(err, ImpactError::Pattern { .. }));
    }
}
