//! Drives one check session: consent, page text, remote check, result.
//!
//! The orchestrator suspends in three places only: reading settings,
//! waiting for the page's text and waiting for the checking service.
//! Every public method takes `&mut self`, so a session never has two
//! checks in flight. Dropping a pending future abandons that check; no
//! state is written after the point it was dropped at.

use crate::classifier::{classify_failure, CheckOutcome, FailureKind};
use crate::consent::{ConsentGate, ConsentPrompter, ConsentState};
use crate::domain_policy::{without_domain, DomainPolicy};
use crate::domain_utils::DomainUtils;
use crate::language::LanguageSettings;
use crate::matches::CheckResult;
use crate::preferences;
use crate::reconcile::{MatchReconciler, ReconciledMatch};
use crate::server::resolve_server_url;
use crate::service::{CheckRequest, CheckService};
use crate::settings::{IgnoredRule, Settings, SettingsError, SettingsPatch, SettingsStore};
use crate::site_support::{replacement_supported, SiteExclusion};
use crate::transport::{decode_reply, PageMessage, PageResponse, PageTransport};
use crate::usage::{self, Hint};
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Why a check was started; only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckCause {
    ManuallyTriggered,
    AutoTriggered,
    TurnOnRule,
    TurnOffRule,
    AddToDictionary,
    ApplySuggestion,
}

impl fmt::Display for CheckCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ManuallyTriggered => "manually_triggered",
            Self::AutoTriggered => "auto_triggered",
            Self::TurnOnRule => "turn_on_rule",
            Self::TurnOffRule => "turn_off_rule",
            Self::AddToDictionary => "add_to_dict",
            Self::ApplySuggestion => "apply_suggestion",
        };
        f.write_str(name)
    }
}

/// Per-session state, built once from the settings snapshot of the
/// first check and reused by every re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub server_url: String,
    pub page_url: String,
    pub hostname: Option<String>,
    pub mother_tongue: String,
    pub preferred_variants: Vec<String>,
    pub ignore_quoted_lines: bool,
    pub policy: DomainPolicy,
    pub languages: LanguageSettings,
    /// Short code of the language of the latest result.
    pub language_short_code: Option<String>,
    pub last_response: Option<PageResponse>,
    pub close_after_recheck: bool,
    pub uninstall_url: Option<String>,
}

impl SessionContext {
    pub fn from_settings(settings: &Settings, page_url: &str) -> Self {
        Self {
            server_url: resolve_server_url(settings),
            page_url: page_url.to_string(),
            hostname: DomainUtils::hostname(page_url),
            mother_tongue: settings.mother_tongue.clone(),
            preferred_variants: settings.preferred_variants(),
            ignore_quoted_lines: settings.ignore_quoted_lines,
            policy: DomainPolicy::for_page(page_url, settings),
            languages: LanguageSettings::default(),
            language_short_code: None,
            last_response: None,
            close_after_recheck: false,
            uninstall_url: None,
        }
    }

    fn check_request(&self, text: String, meta_data: Value) -> CheckRequest {
        CheckRequest {
            text,
            language: self
                .languages
                .manually_selected_language
                .clone()
                .filter(|l| !l.is_empty()),
            mother_tongue: Some(self.mother_tongue.clone()).filter(|m| !m.is_empty()),
            preferred_variants: self.preferred_variants.clone(),
            meta_data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// How long to wait for the page before giving up on it.
    pub page_timeout: Duration,
    pub extension_version: String,
    pub is_firefox: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(10),
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
            is_firefox: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("No check has run in this session yet")]
    NoSession,
    #[error("No result language to scope the rule to")]
    NoLanguage,
    #[error("Replacements cannot be applied on this page")]
    NotApplicable,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Blank out lines quoted with '>' (e-mail replies). Each quoted line is
/// replaced by spaces of the same UTF-16 length, so server offsets still
/// point into the page's own text. Returns the text and whether anything
/// was blanked.
pub fn blank_quoted_lines(text: &str) -> (String, bool) {
    let mut blanked = false;
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with('>') {
                blanked = true;
                " ".repeat(line.encode_utf16().count())
            } else {
                line.to_string()
            }
        })
        .collect();
    (lines.join("\n"), blanked)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

async fn send_to_page<T: PageTransport>(
    page: &T,
    timeout: Duration,
    message: PageMessage,
) -> Option<Value> {
    let action = message.action();
    match tokio::time::timeout(timeout, page.send(message)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            log::warn!("Page message {action} failed: {e}");
            None
        }
        Err(_) => {
            log::warn!("Page did not answer {action} within {timeout:?}");
            None
        }
    }
}

pub struct CheckOrchestrator<S, T, C, P> {
    store: S,
    page: T,
    service: C,
    prompter: P,
    options: OrchestratorOptions,
    consent: ConsentGate,
    session: Option<SessionContext>,
}

impl<S, T, C, P> CheckOrchestrator<S, T, C, P>
where
    S: SettingsStore,
    T: PageTransport,
    C: CheckService,
    P: ConsentPrompter,
{
    pub fn new(store: S, page: T, service: C, prompter: P) -> Self {
        Self::with_options(store, page, service, prompter, OrchestratorOptions::default())
    }

    pub fn with_options(
        store: S,
        page: T,
        service: C,
        prompter: P,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            store,
            page,
            service,
            prompter,
            options,
            consent: ConsentGate::new(),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn consent_state(&self) -> &ConsentState {
        self.consent.state()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn page(&self) -> &T {
        &self.page
    }

    async fn send(&self, message: PageMessage) -> Option<Value> {
        send_to_page(&self.page, self.options.page_timeout, message).await
    }

    /// Full check of `page_url`: resolve the server, skip excluded pages,
    /// get consent, then check the page's current text.
    pub async fn run(&mut self, page_url: &str, cause: CheckCause) -> CheckOutcome {
        let settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Could not load settings: {e}");
                return FailureKind::GenericError(e.to_string()).into();
            }
        };
        let mut session = SessionContext::from_settings(&settings, page_url);

        if let Some(exclusion) = SiteExclusion::for_url(page_url) {
            log::info!(
                "Site not supported ({exclusion:?}): {}",
                SiteExclusion::loggable_url(page_url)
            );
            return CheckOutcome::excluded(exclusion);
        }

        match self
            .consent
            .acquire(&settings, &session.server_url, &self.store, &self.prompter)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                self.send(PageMessage::ClosePopup).await;
                return CheckOutcome::Cancelled;
            }
            Err(e) => {
                log::error!("Could not store consent: {e}");
                return FailureKind::GenericError(e.to_string()).into();
            }
        }

        match decode_reply::<LanguageSettings>(self.send(PageMessage::GetLanguagesSettings).await) {
            Ok(Some(languages)) => session.languages = languages,
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring language settings from page: {e}"),
        }

        log::info!("check_trigger:{cause} on {}", session.page_url);
        self.session = Some(session);
        self.check_page(&settings, true).await
    }

    /// Check the same page again with the same server and consent, e.g.
    /// after the suppression lists changed.
    pub async fn recheck(&mut self, cause: CheckCause) -> CheckOutcome {
        if self.session.is_none() {
            return FailureKind::GenericError(ActionError::NoSession.to_string()).into();
        }
        let settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Could not load settings: {e}");
                return FailureKind::GenericError(e.to_string()).into();
            }
        };
        log::info!("check_trigger:{cause}");
        let outcome = self.check_page(&settings, false).await;
        if let Some(session) = self.session.as_mut() {
            session.close_after_recheck = false;
        }
        outcome
    }

    async fn check_page(&mut self, settings: &Settings, count_usage: bool) -> CheckOutcome {
        let timeout = self.options.page_timeout;
        let Some(session) = self.session.as_mut() else {
            return FailureKind::GenericError(ActionError::NoSession.to_string()).into();
        };

        let reply = send_to_page(
            &self.page,
            timeout,
            PageMessage::CheckText {
                server_url: session.server_url.clone(),
                page_url: session.page_url.clone(),
            },
        )
        .await;
        let response = match decode_reply::<PageResponse>(reply) {
            Ok(Some(response)) => response,
            Ok(None) => {
                log::info!("No response from page, reload needed");
                return CheckOutcome::NoResponse;
            }
            Err(e) => {
                log::warn!("Unreadable page response: {e}");
                return CheckOutcome::NoResponse;
            }
        };

        if let Err(e) = self
            .store
            .update(SettingsPatch {
                last_check: Some(now_millis()),
                ..Default::default()
            })
            .await
        {
            log::warn!("Could not store lastCheck: {e}");
        }

        if let Some(kind) = classify_failure(response.status, response.message.as_deref()) {
            log::info!("Page reported failure: {kind:?}");
            session.last_response = Some(response);
            return kind.into();
        }

        let mut text = response.text();
        let mut quoted_lines_ignored = false;
        if session.ignore_quoted_lines {
            (text, quoted_lines_ignored) = blank_quoted_lines(&text);
        }
        if text.trim().is_empty() {
            log::info!("No text found on page");
            session.last_response = Some(response);
            return CheckOutcome::Empty;
        }

        let request = session.check_request(text, response.meta_data.clone());
        if count_usage {
            match usage::record_check(&self.store).await {
                Ok(counter) => {
                    let host = session.hostname.as_deref().unwrap_or("");
                    session.uninstall_url = Some(usage::uninstall_survey_url(
                        counter,
                        host,
                        &self.options.extension_version,
                        self.options.is_firefox,
                    ));
                }
                Err(e) => log::warn!("Could not update usage counter: {e}"),
            }
        }

        let result = match self.service.check(&session.server_url, &request).await {
            Ok(result) => result,
            Err(e) => {
                let outcome = classify_failure(e.status(), Some(&e.message()))
                    .unwrap_or_else(|| FailureKind::GenericError(e.to_string()));
                log::warn!("Could not check text: {e}");
                session.last_response = Some(response);
                return outcome.into();
            }
        };

        let page_url = response.url.as_deref().unwrap_or(&session.page_url);
        let apply_enabled = response.is_editable_text && replacement_supported(page_url);
        let mut set = MatchReconciler::new(settings, result.language.clone())
            .with_apply_enabled(apply_enabled)
            .reconcile(&result.matches);
        set.quoted_lines_ignored = quoted_lines_ignored;

        session.language_short_code = Some(set.language.short_code().to_string());
        session.last_response = Some(response);
        let close_page = set.is_empty() && session.policy.auto_check && session.close_after_recheck;

        send_to_page(
            &self.page,
            timeout,
            PageMessage::ShowErrorNumberOnMarker {
                data: marker_data(&result),
            },
        )
        .await;
        if close_page {
            send_to_page(&self.page, timeout, PageMessage::ClosePopup).await;
        }

        CheckOutcome::Matches(set)
    }

    /// Hide a rule for the current language, then re-check.
    pub async fn turn_off_rule(
        &mut self,
        rule_id: &str,
        description: Option<&str>,
    ) -> Result<CheckOutcome, ActionError> {
        let language = self.result_language()?;
        let mut settings = self.store.load().await?;
        let added = preferences::ignore_rule(
            &mut settings.ignored_rules,
            IgnoredRule {
                id: rule_id.to_string(),
                description: description.map(str::to_string),
                language,
            },
        );
        if added {
            self.store
                .update(SettingsPatch {
                    ignored_rules: Some(settings.ignored_rules),
                    ..Default::default()
                })
                .await?;
        }
        self.arm_close_after_recheck();
        Ok(self.recheck(CheckCause::TurnOffRule).await)
    }

    /// Show a previously hidden rule again, then re-check.
    pub async fn turn_on_rule(&mut self, rule_id: &str) -> Result<CheckOutcome, ActionError> {
        let language = self.result_language()?;
        let mut settings = self.store.load().await?;
        if preferences::unignore_rule(&mut settings.ignored_rules, rule_id, &language) {
            self.store
                .update(SettingsPatch {
                    ignored_rules: Some(settings.ignored_rules),
                    ..Default::default()
                })
                .await?;
        }
        Ok(self.recheck(CheckCause::TurnOnRule).await)
    }

    pub async fn add_to_dictionary(&mut self, word: &str) -> Result<CheckOutcome, ActionError> {
        if self.session.is_none() {
            return Err(ActionError::NoSession);
        }
        let mut settings = self.store.load().await?;
        if preferences::add_word(&mut settings.dictionary, word) {
            self.store
                .update(SettingsPatch {
                    dictionary: Some(settings.dictionary),
                    ..Default::default()
                })
                .await?;
        }
        Ok(self.recheck(CheckCause::AddToDictionary).await)
    }

    /// Replace the flagged text on the page, then re-check, since the
    /// edit can shift every other match.
    pub async fn apply_correction(
        &mut self,
        issue: &ReconciledMatch,
        replacement: &str,
    ) -> Result<CheckOutcome, ActionError> {
        if !issue.can_apply {
            return Err(ActionError::NotApplicable);
        }
        let session = self.session.as_ref().ok_or(ActionError::NoSession)?;
        let message = PageMessage::ApplyCorrection {
            error_offset: issue.issue.offset,
            error_text: issue.word.clone(),
            replacement: replacement.to_string(),
            markup_list: session
                .last_response
                .as_ref()
                .map(|r| r.markup_list.clone())
                .unwrap_or_default(),
            server_url: session.server_url.clone(),
            page_url: session.page_url.clone(),
        };
        self.send(message).await;
        self.arm_close_after_recheck();
        Ok(self.recheck(CheckCause::ApplySuggestion).await)
    }

    /// Take the page's host off the disabled list.
    pub async fn reactivate_domain(&mut self) -> Result<(), ActionError> {
        let session = self.session.as_ref().ok_or(ActionError::NoSession)?;
        let page_url = session.page_url.clone();
        if let Some(hostname) = session.hostname.clone() {
            let settings = self.store.load().await?;
            self.store
                .update(SettingsPatch {
                    disabled_domains: Some(without_domain(&settings.disabled_domains, &hostname)),
                    ..Default::default()
                })
                .await?;
            log::info!("Re-activated checking on {hostname}");
        }
        if let Some(session) = self.session.as_mut() {
            session.policy.disabled = false;
        }
        self.send(PageMessage::ReactivateIcon { page_url }).await;
        Ok(())
    }

    /// Persist the page's manually chosen variant as the preferred one.
    pub async fn save_language_variant(&mut self) -> Result<bool, ActionError> {
        let session = self.session.as_mut().ok_or(ActionError::NoSession)?;
        let Some(choice) = session.languages.variant_to_save(&session.preferred_variants) else {
            return Ok(false);
        };
        self.store.update(choice.to_patch()).await?;
        let settings = self.store.load().await?;
        session.preferred_variants = settings.preferred_variants();
        Ok(true)
    }

    pub async fn dismiss_hint(&self, hint: Hint) -> Result<(), ActionError> {
        Ok(self.store.update(usage::dismiss_patch(hint)).await?)
    }

    pub async fn review_request_clicked(&self) -> Result<(), ActionError> {
        Ok(self.store.update(usage::review_clicked_patch()).await?)
    }

    /// The user closed the result list.
    pub async fn close(&self) {
        self.send(PageMessage::ClosePopup).await;
    }

    fn result_language(&self) -> Result<String, ActionError> {
        let session = self.session.as_ref().ok_or(ActionError::NoSession)?;
        session
            .language_short_code
            .clone()
            .ok_or(ActionError::NoLanguage)
    }

    fn arm_close_after_recheck(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.close_after_recheck = true;
        }
    }
}

fn marker_data(result: &CheckResult) -> Value {
    json!({
        "language": result.language,
        "matches": result.matches,
    })
}
