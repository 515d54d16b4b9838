use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use uuid::Uuid;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8787";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClientSettings {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.into()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_id: None,
            api_base_url: default_api_base_url(),
        }
    }
}

/// Client-local settings file. Holds the player's opaque identity, which is
/// generated once and reused by every later session.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                ClientSettings::default()
            })
        } else {
            ClientSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Existing identity, or a freshly generated one persisted before
    /// returning.
    pub fn user_id(&self) -> Result<String> {
        if let Some(user_id) = self.read().user_id.clone() {
            return Ok(user_id);
        }

        let mut guard = self.write();
        // Another caller may have generated it while we waited for the lock.
        if let Some(user_id) = guard.user_id.clone() {
            return Ok(user_id);
        }

        let user_id = Uuid::new_v4().to_string();
        guard.user_id = Some(user_id.clone());
        self.persist(&guard)?;
        info!("Generated new player identity");
        Ok(user_id)
    }

    pub fn api_base_url(&self) -> String {
        self.read().api_base_url.clone()
    }

    pub fn set_api_base_url(&self, url: impl Into<String>) -> Result<()> {
        let mut guard = self.write();
        guard.api_base_url = url.into();
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, ClientSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &ClientSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
