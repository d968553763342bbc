pub mod store;

pub use store::{JsonFileSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};

use crate::server::DEFAULT_SERVER_URL;
use serde::{Deserialize, Serialize};

/// A (rule id, language) pair the user chose to hide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredRule {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Short language code, e.g. "en".
    pub language: String,
}

/// Snapshot of the persisted user preferences.
///
/// Field names serialize to the settings-store keys; any key missing from
/// the stored map takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_server_url: String,
    pub ignore_quoted_lines: bool,
    pub auto_check: bool,
    pub disabled_domains: Vec<String>,
    pub ignore_check_on_domains: Vec<String>,
    pub auto_check_on_domains: Vec<String>,
    pub ignored_rules: Vec<IgnoredRule>,
    pub dictionary: Vec<String>,
    pub mother_tongue: String,
    pub en_variant: String,
    pub de_variant: String,
    pub pt_variant: String,
    pub ca_variant: String,
    pub allow_remote_check: bool,
    pub usage_counter: u64,
    pub have_premium_account: bool,
    pub show_shortcut_hint: bool,
    pub show_premium_hint: bool,
    pub review_request_link_clicked: bool,
    pub last_check: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_server_url: DEFAULT_SERVER_URL.to_string(),
            ignore_quoted_lines: true,
            auto_check: false,
            disabled_domains: Vec::new(),
            ignore_check_on_domains: Vec::new(),
            auto_check_on_domains: Vec::new(),
            ignored_rules: Vec::new(),
            dictionary: Vec::new(),
            mother_tongue: String::new(),
            en_variant: "en-US".to_string(),
            de_variant: "de-DE".to_string(),
            pt_variant: "pt-PT".to_string(),
            ca_variant: "ca-ES".to_string(),
            allow_remote_check: false,
            usage_counter: 0,
            have_premium_account: false,
            show_shortcut_hint: true,
            show_premium_hint: true,
            review_request_link_clicked: false,
            last_check: None,
        }
    }
}

impl Settings {
    /// Non-empty preferred variants in en, de, pt, ca order.
    pub fn preferred_variants(&self) -> Vec<String> {
        [
            &self.en_variant,
            &self.de_variant,
            &self.pt_variant,
            &self.ca_variant,
        ]
        .into_iter()
        .filter(|v| !v.is_empty())
        .cloned()
        .collect()
    }

    pub fn apply(&mut self, patch: SettingsPatch) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        merge!(
            api_server_url,
            ignore_quoted_lines,
            auto_check,
            disabled_domains,
            ignore_check_on_domains,
            auto_check_on_domains,
            ignored_rules,
            dictionary,
            mother_tongue,
            en_variant,
            de_variant,
            pt_variant,
            ca_variant,
            allow_remote_check,
            usage_counter,
            have_premium_account,
            show_shortcut_hint,
            show_premium_hint,
            review_request_link_clicked,
        );
        if let Some(ts) = patch.last_check {
            self.last_check = Some(ts);
        }
    }
}

/// Partial write: only the `Some` fields are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_quoted_lines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_check_on_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_check_on_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_rules: Option<Vec<IgnoredRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_tongue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub de_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pt_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_remote_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_counter: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub have_premium_account: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_shortcut_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_premium_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_request_link_clicked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"autoCheck": true, "dictionary": ["foo"]}"#).unwrap();

        assert!(settings.auto_check);
        assert_eq!(settings.dictionary, vec!["foo".to_string()]);
        assert_eq!(settings.api_server_url, DEFAULT_SERVER_URL);
        assert!(settings.ignore_quoted_lines);
        assert_eq!(settings.de_variant, "de-DE");
        assert_eq!(settings.usage_counter, 0);
    }

    #[test]
    fn test_keys_use_store_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        for key in [
            "apiServerUrl",
            "ignoreQuotedLines",
            "autoCheck",
            "disabledDomains",
            "ignoreCheckOnDomains",
            "autoCheckOnDomains",
            "ignoredRules",
            "dictionary",
            "motherTongue",
            "enVariant",
            "allowRemoteCheck",
            "usageCounter",
            "havePremiumAccount",
            "showShortcutHint",
            "showPremiumHint",
            "reviewRequestLinkClicked",
            "lastCheck",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut settings = Settings {
            usage_counter: 3,
            ..Settings::default()
        };
        settings.apply(SettingsPatch {
            allow_remote_check: Some(true),
            auto_check: Some(true),
            ..Default::default()
        });

        assert!(settings.allow_remote_check);
        assert!(settings.auto_check);
        assert_eq!(settings.usage_counter, 3);
        assert!(settings.show_shortcut_hint);
    }

    #[test]
    fn test_preferred_variants_skip_empty() {
        let settings = Settings {
            pt_variant: String::new(),
            ..Settings::default()
        };
        assert_eq!(
            settings.preferred_variants(),
            vec!["en-US".to_string(), "de-DE".to_string(), "ca-ES".to_string()]
        );
    }
}
