//! Turns the raw match list of one check into the list the user sees.
//!
//! Order of work: parse each match (a malformed entry is logged and
//! dropped, the rest of the response still counts), collapse matches
//! sharing a span, hide what the dictionary or the ignored rules cover,
//! then annotate what is left.

use crate::matches::{DetectedLanguage, Match};
use crate::settings::{IgnoredRule, Settings};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Suggestions beyond this many are dropped.
pub const MAX_REPLACEMENTS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledMatch {
    #[serde(flatten)]
    pub issue: Match,
    /// The flagged text.
    pub word: String,
    /// Replacements can be applied to the page with one click.
    pub can_apply: bool,
    /// Offer "add to dictionary".
    pub can_add_to_dictionary: bool,
}

/// Display-ready result of one check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReconciledMatchSet {
    pub language: DetectedLanguage,
    pub matches: Vec<ReconciledMatch>,
    /// Hidden hits per rule id.
    pub suppressed_counts: BTreeMap<String, usize>,
    /// Rule descriptions seen in this response, by rule id.
    pub rule_descriptions: BTreeMap<String, String>,
    pub skipped_malformed: usize,
    pub quoted_lines_ignored: bool,
}

/// An ignored rule that would have produced hits in this result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredRuleSummary {
    pub id: String,
    pub description: String,
    pub count: usize,
}

impl ReconciledMatchSet {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn suppressed_count(&self, rule_id: &str) -> usize {
        self.suppressed_counts.get(rule_id).copied().unwrap_or(0)
    }

    /// Ignored rules of the current language with at least one hidden hit.
    pub fn ignored_rule_summary(&self, ignored_rules: &[IgnoredRule]) -> Vec<IgnoredRuleSummary> {
        let language = self.language.short_code();
        ignored_rules
            .iter()
            .filter(|rule| rule.language == language)
            .filter_map(|rule| {
                let count = self.suppressed_count(&rule.id);
                if count == 0 {
                    return None;
                }
                let description = rule
                    .description
                    .clone()
                    .filter(|d| !d.is_empty())
                    .or_else(|| self.rule_descriptions.get(&rule.id).cloned())
                    .unwrap_or_else(|| rule.id.clone());
                Some(IgnoredRuleSummary {
                    id: rule.id.clone(),
                    description,
                    count,
                })
            })
            .collect()
    }
}

/// Collapse matches that share (offset, length).
///
/// Scans from the end and keeps a match only when its span differs from
/// the last kept one, so of several matches on one span the last in
/// server order survives. Output is back in server order.
pub fn dedup_by_span(matches: Vec<Match>) -> Vec<Match> {
    let mut kept: Vec<Match> = Vec::with_capacity(matches.len());
    let mut prev: Option<(usize, usize)> = None;
    for m in matches.into_iter().rev() {
        let span = m.span();
        if prev != Some(span) {
            prev = Some(span);
            kept.push(m);
        }
    }
    kept.reverse();
    kept
}

/// Known if listed as-is, or if capitalized and listed with a lowercase
/// first letter.
pub fn is_known_word(word: &str, dictionary: &[String]) -> bool {
    if dictionary.iter().any(|w| w == word) {
        return true;
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            let lowered: String = first.to_lowercase().chain(chars).collect();
            dictionary.iter().any(|w| *w == lowered)
        }
        _ => false,
    }
}

/// First ignored-rule entry for this rule id in this language.
pub fn find_ignored_rule<'a>(
    ignored_rules: &'a [IgnoredRule],
    rule_id: &str,
    language_short_code: &str,
) -> Option<&'a IgnoredRule> {
    ignored_rules
        .iter()
        .find(|r| r.id == rule_id && r.language == language_short_code)
}

pub struct MatchReconciler<'a> {
    settings: &'a Settings,
    language: DetectedLanguage,
    apply_enabled: bool,
}

impl<'a> MatchReconciler<'a> {
    pub fn new(settings: &'a Settings, language: DetectedLanguage) -> Self {
        Self {
            settings,
            language,
            apply_enabled: false,
        }
    }

    /// Whether the page is an editable surface where replacements can be
    /// applied.
    pub fn with_apply_enabled(mut self, enabled: bool) -> Self {
        self.apply_enabled = enabled;
        self
    }

    fn is_suppressed(&self, m: &Match) -> bool {
        if m.is_spelling_error {
            is_known_word(&m.word(), &self.settings.dictionary)
        } else {
            find_ignored_rule(
                &self.settings.ignored_rules,
                &m.rule_id,
                self.language.short_code(),
            )
            .is_some()
        }
    }

    pub fn reconcile(&self, raw_matches: &[Value]) -> ReconciledMatchSet {
        let mut set = ReconciledMatchSet {
            language: self.language.clone(),
            ..Default::default()
        };

        let mut parsed = Vec::with_capacity(raw_matches.len());
        for (index, value) in raw_matches.iter().enumerate() {
            match Match::from_value(value) {
                Ok(m) => parsed.push(m),
                Err(e) => {
                    log::warn!("Skipping match #{index}: {e}");
                    set.skipped_malformed += 1;
                }
            }
        }

        for mut m in dedup_by_span(parsed) {
            set.rule_descriptions
                .entry(m.rule_id.clone())
                .or_insert_with(|| m.rule_description.clone());

            if self.is_suppressed(&m) {
                *set.suppressed_counts.entry(m.rule_id.clone()).or_insert(0) += 1;
                continue;
            }

            m.replacements.truncate(MAX_REPLACEMENTS);
            let word = m.word();
            let can_add_to_dictionary = m.is_spelling_error;
            set.matches.push(ReconciledMatch {
                can_apply: self.apply_enabled,
                can_add_to_dictionary,
                word,
                issue: m,
            });
        }

        log::debug!(
            "Reconciled {} raw matches: {} shown, {} suppressed, {} malformed",
            raw_matches.len(),
            set.matches.len(),
            set.suppressed_counts.values().sum::<usize>(),
            set.skipped_malformed
        );
        set
    }
}
