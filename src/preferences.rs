use crate::settings::IgnoredRule;

/// Add the rule unless (id, language) is already ignored.
/// Returns whether the list changed.
pub fn ignore_rule(ignored_rules: &mut Vec<IgnoredRule>, rule: IgnoredRule) -> bool {
    if ignored_rules
        .iter()
        .any(|r| r.id == rule.id && r.language == rule.language)
    {
        return false;
    }
    ignored_rules.push(rule);
    true
}

/// Remove the first entry for (id, language); duplicates beyond it stay.
pub fn unignore_rule(ignored_rules: &mut Vec<IgnoredRule>, rule_id: &str, language: &str) -> bool {
    match ignored_rules
        .iter()
        .position(|r| r.id == rule_id && r.language == language)
    {
        Some(index) => {
            ignored_rules.remove(index);
            true
        }
        None => false,
    }
}

pub fn add_word(dictionary: &mut Vec<String>, word: &str) -> bool {
    if word.is_empty() || dictionary.iter().any(|w| w == word) {
        return false;
    }
    dictionary.push(word.to_string());
    true
}
