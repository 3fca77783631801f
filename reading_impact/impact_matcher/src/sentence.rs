use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ImpactError, ImpactResult};

/// Keys every Alpino parse must carry at the top level.
pub const REQUIRED_FIELDS: [&str; 4] = ["@version", "parser", "node", "sentence"];

static EDGE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\W*(.*?)\W*$").expect("edge punctuation pattern is valid")
});

/// One leaf of the parse tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordToken {
    /// Position in left-to-right leaf order.
    pub index: usize,
    /// Surface form, punctuation-trimmed.
    pub word: String,
    /// Lemma, punctuation-trimmed.
    pub lemma: String,
    /// Alpino part-of-speech tag (`noun`, `verb`, `name`, ...).
    pub pos: String,
}

/// A parsed sentence flattened into word tokens.
#[derive(Debug, Clone)]
pub struct Sentence {
    tokens: Vec<WordToken>,
    text: String,
    raw: Value,
}

impl Sentence {
    /// Validates an Alpino parse and flattens it. Fails before any token is
    /// produced when a required field is missing.
    pub fn from_parse(parse: Value) -> ImpactResult<Self> {
        let fields = parse.as_object().ok_or_else(|| {
            ImpactError::MalformedInput("parse must be a JSON object".to_string())
        })?;
        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|field| !fields.contains_key(**field))
        {
            return Err(ImpactError::MalformedInput(format!(
                "missing required field {missing:?}"
            )));
        }
        let text = sentence_text(&fields["sentence"])
            .ok_or_else(|| {
                ImpactError::MalformedInput("sentence field carries no text".to_string())
            })?
            .to_string();
        let mut tokens = Vec::new();
        collect_leaves(&fields["node"], &mut tokens);
        Ok(Self {
            tokens,
            text,
            raw: parse,
        })
    }

    /// Parses a JSON string and builds the sentence from it.
    pub fn from_json_str(json: &str) -> ImpactResult<Self> {
        let parse: Value = serde_json::from_str(json)?;
        Self::from_parse(parse)
    }

    /// Word tokens in sentence order.
    #[must_use]
    pub fn tokens(&self) -> &[WordToken] {
        &self.tokens
    }

    /// The sentence string as given by the parser.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The parse this sentence was built from.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Number of word tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the parse has no word leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Builds a [`Sentence`] from an Alpino parse.
pub fn build_sentence(parse: Value) -> ImpactResult<Sentence> {
    Sentence::from_parse(parse)
}

/// Strips leading and trailing non-word characters, keeping inner content.
/// A token made only of punctuation trims to the empty string.
#[must_use]
pub fn trim_punctuation(value: &str) -> &str {
    EDGE_PUNCTUATION
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map_or(value, |inner| inner.as_str())
}

// `<sentence sentid="..">text</sentence>` renders as an object, a bare
// `<sentence>` as a string.
fn sentence_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text),
        Value::Object(fields) => fields.get("#text").and_then(Value::as_str),
        _ => None,
    }
}

fn collect_leaves(node: &Value, out: &mut Vec<WordToken>) {
    match node {
        Value::Array(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
        Value::Object(fields) => {
            if let Some(children) = fields.get("node") {
                collect_leaves(children, out);
            } else if let Some(word) = fields.get("@word").and_then(Value::as_str) {
                let lemma = fields
                    .get("@lemma")
                    .and_then(Value::as_str)
                    .unwrap_or(word);
                let pos = fields.get("@pos").and_then(Value::as_str).unwrap_or("");
                out.push(WordToken {
                    index: out.len(),
                    word: trim_punctuation(word).to_string(),
                    lemma: trim_punctuation(lemma).to_string(),
                    pos: pos.to_string(),
                });
            }
        }
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    /// Builds a minimal Alpino-shaped parse from `(word, lemma, pos)` leaves.
    pub(crate) fn parse_of(text: &str, leaves: &[(&str, &str, &str)]) -> Value {
        let nodes: Vec<Value> = leaves
            .iter()
            .map(|(word, lemma, pos)| json!({ "@word": word, "@lemma": lemma, "@pos": pos }))
            .collect();
        json!({
            "@version": "1.6",
            "parser": { "@build": "test" },
            "node": { "@cat": "top", "node": [{ "@cat": "smain", "node": nodes }] },
            "sentence": { "@sentid": "1", "#text": text }
        })
    }

    pub(crate) fn sentence_of(text: &str, leaves: &[(&str, &str, &str)]) -> super::Sentence {
        super::Sentence::from_parse(parse_of(text, leaves)).unwrap()
    }
}
