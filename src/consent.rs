//! One-time consent before page text leaves the browser.

use crate::server::is_default_server;
use crate::settings::{Settings, SettingsError, SettingsPatch, SettingsStore};
use serde::Serialize;

pub const PRIVACY_POLICY_URL: &str = "https://www.etteplan.com/privacy-statement";
pub const PRODUCT_URL: &str = "https://hyperste.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConsentState {
    Unknown,
    PendingPrompt(ConsentPrompt),
    Granted,
    Cancelled,
}

/// What the user is asked before the first check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConsentPrompt {
    DefaultServer {
        product_url: String,
        privacy_url: String,
        /// Initial state of the "check automatically" checkbox.
        auto_check: bool,
    },
    CustomServer {
        server_url: String,
        auto_check: bool,
    },
}

impl ConsentPrompt {
    pub fn for_server(server_url: &str) -> Self {
        if is_default_server(server_url) {
            Self::DefaultServer {
                product_url: PRODUCT_URL.to_string(),
                privacy_url: PRIVACY_POLICY_URL.to_string(),
                auto_check: true,
            }
        } else {
            Self::CustomServer {
                server_url: server_url.to_string(),
                auto_check: true,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    Accept { auto_check: bool },
    Cancel,
}

/// Asks the user and waits for the answer.
#[allow(async_fn_in_trait)]
pub trait ConsentPrompter {
    async fn ask(&self, prompt: &ConsentPrompt) -> ConsentDecision;
}

/// Consent state machine for one session.
#[derive(Debug, Clone)]
pub struct ConsentGate {
    state: ConsentState,
}

impl Default for ConsentGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsentGate {
    pub fn new() -> Self {
        Self {
            state: ConsentState::Unknown,
        }
    }

    pub fn state(&self) -> &ConsentState {
        &self.state
    }

    pub fn is_granted(&self) -> bool {
        self.state == ConsentState::Granted
    }

    /// Move out of `Unknown` once settings are loaded. Already granted
    /// sessions stay granted and never prompt again.
    pub fn load(&mut self, settings: &Settings, server_url: &str) -> &ConsentState {
        if self.is_granted() {
            return &self.state;
        }
        self.state = if settings.allow_remote_check {
            ConsentState::Granted
        } else {
            ConsentState::PendingPrompt(ConsentPrompt::for_server(server_url))
        };
        &self.state
    }

    /// Apply the user's answer to a pending prompt, persisting an acceptance.
    pub async fn resolve<S: SettingsStore>(
        &mut self,
        decision: ConsentDecision,
        store: &S,
    ) -> Result<&ConsentState, SettingsError> {
        if !matches!(self.state, ConsentState::PendingPrompt(_)) {
            return Ok(&self.state);
        }
        match decision {
            ConsentDecision::Accept { auto_check } => {
                store
                    .update(SettingsPatch {
                        allow_remote_check: Some(true),
                        auto_check: Some(auto_check),
                        ..Default::default()
                    })
                    .await?;
                log::info!("Remote check accepted (autoCheck: {auto_check})");
                self.state = ConsentState::Granted;
            }
            ConsentDecision::Cancel => {
                log::info!("Remote check consent cancelled");
                self.state = ConsentState::Cancelled;
            }
        }
        Ok(&self.state)
    }

    /// Load, prompt if needed, and report whether a check may proceed.
    pub async fn acquire<S: SettingsStore, P: ConsentPrompter>(
        &mut self,
        settings: &Settings,
        server_url: &str,
        store: &S,
        prompter: &P,
    ) -> Result<bool, SettingsError> {
        let prompt = match self.load(settings, server_url) {
            ConsentState::Granted => return Ok(true),
            ConsentState::PendingPrompt(prompt) => prompt.clone(),
            ConsentState::Unknown | ConsentState::Cancelled => return Ok(false),
        };
        let decision = prompter.ask(&prompt).await;
        Ok(matches!(
            self.resolve(decision, store).await?,
            ConsentState::Granted
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::DEFAULT_SERVER_URL;
    use crate::settings::MemorySettingsStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPrompter {
        decision: ConsentDecision,
        asked: AtomicUsize,
    }

    impl CountingPrompter {
        fn new(decision: ConsentDecision) -> Self {
            Self {
                decision,
                asked: AtomicUsize::new(0),
            }
        }
    }

    impl ConsentPrompter for CountingPrompter {
        async fn ask(&self, _prompt: &ConsentPrompt) -> ConsentDecision {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.decision
        }
    }

    #[test]
    fn test_starts_unknown() {
        assert_eq!(ConsentGate::new().state(), &ConsentState::Unknown);
    }

    #[test]
    fn test_granted_flag_never_prompts() {
        let settings = Settings {
            allow_remote_check: true,
            ..Settings::default()
        };
        let mut gate = ConsentGate::new();
        assert_eq!(gate.load(&settings, DEFAULT_SERVER_URL), &ConsentState::Granted);
        assert_eq!(gate.load(&settings, DEFAULT_SERVER_URL), &ConsentState::Granted);
    }

    #[test]
    fn test_prompt_variant_depends_on_server() {
        let settings = Settings::default();
        let mut gate = ConsentGate::new();
        assert!(matches!(
            gate.load(&settings, DEFAULT_SERVER_URL),
            ConsentState::PendingPrompt(ConsentPrompt::DefaultServer { .. })
        ));

        let mut gate = ConsentGate::new();
        match gate.load(&settings, "http://localhost:8081/v2") {
            ConsentState::PendingPrompt(ConsentPrompt::CustomServer { server_url, .. }) => {
                assert_eq!(server_url, "http://localhost:8081/v2");
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_persists_and_grants() {
        let store = MemorySettingsStore::default();
        let prompter = CountingPrompter::new(ConsentDecision::Accept { auto_check: false });
        let mut gate = ConsentGate::new();

        let granted = gate
            .acquire(&Settings::default(), DEFAULT_SERVER_URL, &store, &prompter)
            .await
            .unwrap();

        assert!(granted);
        assert!(gate.is_granted());
        let saved = store.snapshot().await;
        assert!(saved.allow_remote_check);
        assert!(!saved.auto_check);

        // Same session, stale snapshot: still no second prompt.
        assert!(gate
            .acquire(&Settings::default(), DEFAULT_SERVER_URL, &store, &prompter)
            .await
            .unwrap());
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_does_not_persist() {
        let store = MemorySettingsStore::default();
        let prompter = CountingPrompter::new(ConsentDecision::Cancel);
        let mut gate = ConsentGate::new();

        let granted = gate
            .acquire(&Settings::default(), DEFAULT_SERVER_URL, &store, &prompter)
            .await
            .unwrap();

        assert!(!granted);
        assert_eq!(gate.state(), &ConsentState::Cancelled);
        assert!(!store.snapshot().await.allow_remote_check);
    }

    #[tokio::test]
    async fn test_resolve_without_prompt_is_noop() {
        let store = MemorySettingsStore::default();
        let mut gate = ConsentGate::new();
        let state = gate
            .resolve(ConsentDecision::Accept { auto_check: true }, &store)
            .await
            .unwrap();
        assert_eq!(state, &ConsentState::Unknown);
        assert!(!store.snapshot().await.allow_remote_check);
    }
}
