use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Process configuration for the `textcheck` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file holding the persisted user settings.
    pub settings_path: String,
    pub service: ServiceConfig,
    pub extension_version: String,
    pub is_firefox: bool,
    /// Seconds to wait for the page to answer.
    pub page_timeout_seconds: u64,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: "textcheck-settings.json".to_string(),
            service: ServiceConfig::default(),
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
            is_firefox: false,
            page_timeout_seconds: 10,
            logging: Some(LoggingConfig {
                level: "info".to_string(),
            }),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: concat!("textcheck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {path}"))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {path}"))?;
        Ok(())
    }

    /// Configured log level; unknown names fall back to `Info`.
    pub fn log_level(&self) -> LevelFilter {
        self.logging
            .as_ref()
            .and_then(|l| l.level.parse().ok())
            .unwrap_or(LevelFilter::Info)
    }
}

pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    if Path::new(path).exists() {
        AppConfig::from_file(path)
    } else {
        anyhow::bail!("Configuration file '{path}' not found")
    }
}

/// Like `load_config`, but never fails: a missing or broken file yields
/// the defaults.
pub fn load_config_or_default(path: &str) -> AppConfig {
    config_or_default(load_config(path))
}

/// Level the logger starts with: `--verbose` wins, then the config
/// file, then `Info`.
pub fn startup_log_level(verbose: bool, config: Option<&AppConfig>) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        config.map(AppConfig::log_level).unwrap_or(LevelFilter::Info)
    }
}

/// Fall back to the defaults, warning about why.
pub fn config_or_default(loaded: anyhow::Result<AppConfig>) -> AppConfig {
    loaded.unwrap_or_else(|e| {
        log::warn!("{e:#}, using default configuration");
        AppConfig::default()
    })
}
