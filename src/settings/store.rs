use super::{Settings, SettingsPatch};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read/write gateway to the persisted preferences.
///
/// Writes are read-then-write without locking across surfaces: two
/// concurrent sessions writing the same key resolve as last write wins.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn load(&self) -> Result<Settings, SettingsError>;
    async fn update(&self, patch: SettingsPatch) -> Result<(), SettingsError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub async fn snapshot(&self) -> Settings {
        self.inner.read().await.clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.inner.read().await.clone())
    }

    async fn update(&self, patch: SettingsPatch) -> Result<(), SettingsError> {
        self.inner.write().await.apply(patch);
        Ok(())
    }
}

/// Settings kept as a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Settings::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "No settings file at {}, using defaults",
                    self.path.display()
                );
                Ok(Settings::default())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn update(&self, patch: SettingsPatch) -> Result<(), SettingsError> {
        let mut settings = self.load().await?;
        settings.apply(patch);
        let content = serde_json::to_string_pretty(&settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))?;
        log::debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}
