use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Rule id the service uses for words missing from its term list.
pub const NON_LISTED_RULE: &str = "non-listed";

/// Language the service detected or was told to use.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub name: String,
    pub code: String,
}

impl DetectedLanguage {
    pub fn short_code(&self) -> &str {
        crate::language::short_code(&self.code)
    }
}

/// Parsed body of a successful check. Matches stay untyped here so that
/// one broken entry cannot fail the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckResult {
    pub language: DetectedLanguage,
    #[serde(default)]
    pub matches: Vec<Value>,
}

impl CheckResult {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Glossary entry attached to a match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Term {
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default, rename = "approved-example")]
    pub approved_example: Option<String>,
}

/// One issue reported by the checking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub rule_id: String,
    pub rule_description: String,
    pub message: String,
    /// Position in the submitted text.
    pub offset: usize,
    pub length: usize,
    pub context_text: String,
    /// Position of the issue inside `context_text`.
    pub context_offset: usize,
    pub color: Option<String>,
    pub replacements: Vec<String>,
    pub term: Option<Term>,
    pub is_spelling_error: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("Malformed match: {0}")]
pub struct MalformedMatch(#[from] serde_json::Error);

#[derive(Deserialize)]
struct RawMatch {
    #[serde(deserialize_with = "lenient_usize")]
    offset: usize,
    #[serde(deserialize_with = "lenient_usize")]
    length: usize,
    context: RawContext,
    rule: RawRule,
    #[serde(default)]
    message: String,
    #[serde(default)]
    replacements: Vec<RawReplacement>,
    #[serde(default)]
    term: Option<Term>,
}

#[derive(Deserialize)]
struct RawContext {
    text: String,
    #[serde(deserialize_with = "lenient_usize")]
    offset: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    issue_type: Option<String>,
}

#[derive(Deserialize)]
struct RawReplacement {
    value: String,
}

/// Offsets arrive as numbers, occasionally as numeric strings.
fn lenient_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(usize),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn is_spelling_rule(rule_id: &str, issue_type: Option<&str>) -> bool {
    issue_type == Some("misspelling")
        || rule_id == NON_LISTED_RULE
        || rule_id.contains("SPELLER_RULE")
        || rule_id.contains("MORFOLOGIK_RULE")
        || rule_id.starts_with("HUNSPELL")
}

impl Match {
    pub fn from_value(value: &Value) -> Result<Self, MalformedMatch> {
        let raw = RawMatch::deserialize(value)?;
        let is_spelling_error = is_spelling_rule(&raw.rule.id, raw.rule.issue_type.as_deref());
        Ok(Self {
            rule_id: raw.rule.id,
            rule_description: raw.rule.description,
            message: raw.message,
            offset: raw.offset,
            length: raw.length,
            context_text: raw.context.text,
            context_offset: raw.context.offset,
            color: raw.rule.color,
            replacements: raw.replacements.into_iter().map(|r| r.value).collect(),
            term: raw.term,
            is_spelling_error,
        })
    }

    /// The flagged text, cut out of the context. Offsets count UTF-16
    /// code units.
    pub fn word(&self) -> String {
        let units: Vec<u16> = self
            .context_text
            .encode_utf16()
            .skip(self.context_offset)
            .take(self.length)
            .collect();
        String::from_utf16_lossy(&units)
    }

    pub fn span(&self) -> (usize, usize) {
        (self.offset, self.length)
    }
}
