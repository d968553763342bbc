use crate::settings::SettingsPatch;
use serde::{Deserialize, Serialize};

/// Language groups that have a preferred-variant setting.
pub const VARIANT_GROUPS: [&str; 4] = ["en", "de", "pt", "ca"];

/// "en-US" -> "en"; codes without a region are returned unchanged.
pub fn short_code(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Language choices the page remembers between checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageSettings {
    pub init_language: Option<String>,
    pub manually_selected_language: Option<String>,
}

impl LanguageSettings {
    /// Variant to offer as the new default, if the manual choice is a
    /// different variant of the same language and not already preferred.
    pub fn variant_to_save(&self, preferred_variants: &[String]) -> Option<VariantChoice> {
        let init = self.init_language.as_deref().filter(|l| !l.is_empty())?;
        let selected = self
            .manually_selected_language
            .as_deref()
            .filter(|l| !l.is_empty())?;

        let init_group = variant_group(init)?;
        let selected_group = variant_group(selected)?;
        if init_group != selected_group || !VARIANT_GROUPS.contains(&init_group) {
            return None;
        }
        if preferred_variants.iter().any(|v| v == selected) {
            return None;
        }
        Some(VariantChoice {
            group: selected_group.to_string(),
            variant: selected.to_string(),
        })
    }
}

/// Group of a regional code; `None` for codes without a region.
fn variant_group(code: &str) -> Option<&str> {
    code.find('-').map(|i| &code[..i])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantChoice {
    pub group: String,
    pub variant: String,
}

impl VariantChoice {
    pub fn to_patch(&self) -> SettingsPatch {
        let variant = Some(self.variant.clone());
        match self.group.as_str() {
            "en" => SettingsPatch {
                en_variant: variant,
                ..Default::default()
            },
            "de" => SettingsPatch {
                de_variant: variant,
                ..Default::default()
            },
            "pt" => SettingsPatch {
                pt_variant: variant,
                ..Default::default()
            },
            "ca" => SettingsPatch {
                ca_variant: variant,
                ..Default::default()
            },
            other => {
                log::warn!("No variant setting for language group: {other}");
                SettingsPatch::default()
            }
        }
    }
}
