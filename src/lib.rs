pub mod classifier;
pub mod config;
pub mod consent;
pub mod domain_policy;
pub mod domain_utils;
pub mod language;
pub mod matches;
pub mod orchestrator;
pub mod preferences;
pub mod reconcile;
pub mod server;
pub mod service;
pub mod settings;
pub mod site_support;
pub mod transport;
pub mod usage;

pub use classifier::{classify_failure, CheckOutcome, FailureKind};
pub use config::AppConfig;
pub use consent::{ConsentDecision, ConsentGate, ConsentPrompt, ConsentPrompter};
pub use orchestrator::{CheckCause, CheckOrchestrator, OrchestratorOptions};
pub use reconcile::{MatchReconciler, ReconciledMatch, ReconciledMatchSet};
pub use service::{CheckService, LanguageToolClient};
pub use settings::{JsonFileSettingsStore, MemorySettingsStore, Settings, SettingsStore};
pub use transport::{PageTransport, StaticPageTransport};
