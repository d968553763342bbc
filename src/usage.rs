use crate::server::is_default_server;
use crate::settings::{Settings, SettingsError, SettingsPatch, SettingsStore};
use serde::Serialize;

/// Ask for a store review from this many checks on.
pub const MIN_USAGE_FOR_REVIEW_REQUEST: u64 = 40;
/// Mention the premium service from this many checks on.
pub const MIN_USAGE_FOR_PREMIUM_HINT: u64 = 30;
/// Below this many checks an empty result gets an extra explanation.
pub const FIRST_USES: u64 = 5;

pub const UNINSTALL_SURVEY_URL: &str = "https://languagetool.org/webextension/uninstall.php";

/// Count one dispatched check. Returns the new counter.
pub async fn record_check<S: SettingsStore>(store: &S) -> Result<u64, SettingsError> {
    let counter = store.load().await?.usage_counter + 1;
    store
        .update(SettingsPatch {
            usage_counter: Some(counter),
            ..Default::default()
        })
        .await?;
    log::debug!("Usage counter now {counter}");
    Ok(counter)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hint {
    Shortcut,
    Premium,
}

/// At most one hint at a time; the shortcut hint goes first.
pub fn hint_to_show(settings: &Settings, server_url: &str, shortcut_bound: bool) -> Option<Hint> {
    if settings.show_shortcut_hint && shortcut_bound {
        Some(Hint::Shortcut)
    } else if settings.show_premium_hint
        && is_default_server(server_url)
        && settings.usage_counter >= MIN_USAGE_FOR_PREMIUM_HINT
    {
        Some(Hint::Premium)
    } else {
        None
    }
}

pub fn show_review_request(settings: &Settings) -> bool {
    !settings.review_request_link_clicked && settings.usage_counter >= MIN_USAGE_FOR_REVIEW_REQUEST
}

pub fn show_first_uses_note(settings: &Settings) -> bool {
    settings.usage_counter < FIRST_USES
}

pub fn dismiss_patch(hint: Hint) -> SettingsPatch {
    match hint {
        Hint::Shortcut => SettingsPatch {
            show_shortcut_hint: Some(false),
            ..Default::default()
        },
        Hint::Premium => SettingsPatch {
            show_premium_hint: Some(false),
            ..Default::default()
        },
    }
}

pub fn review_clicked_patch() -> SettingsPatch {
    SettingsPatch {
        review_request_link_clicked: Some(true),
        ..Default::default()
    }
}

/// Survey link opened on uninstall. Firefox gets the bare link.
pub fn uninstall_survey_url(
    usage_counter: u64,
    last_used_on: &str,
    version: &str,
    is_firefox: bool,
) -> String {
    if is_firefox {
        return UNINSTALL_SURVEY_URL.to_string();
    }
    match url::Url::parse_with_params(
        UNINSTALL_SURVEY_URL,
        &[
            ("usageCounter", usage_counter.to_string()),
            ("lastUsedOn", last_used_on.to_string()),
            ("version", version.to_string()),
        ],
    ) {
        Ok(url) => url.to_string(),
        Err(e) => {
            log::warn!("Could not build uninstall URL: {e}");
            UNINSTALL_SURVEY_URL.to_string()
        }
    }
}
