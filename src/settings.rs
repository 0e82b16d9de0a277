use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

pub const DEFAULT_VAULT: &str = "Obsidian Sandbox";
pub const DEFAULT_DAILY_FOLDER: &str = "daily";
pub const DEFAULT_AUTO_SYNC_SECS: u64 = 300;

/// Where captured notes are delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JournalSettings {
    /// Vault to append to; blank or missing means `DEFAULT_VAULT`.
    pub vault: Option<String>,
    pub daily_folder: String,
    /// Ask the journal app not to show its own confirmation.
    pub silent: bool,
    /// Interval of the background sync worker.
    pub auto_sync_secs: u64,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            vault: None,
            daily_folder: DEFAULT_DAILY_FOLDER.into(),
            silent: false,
            auto_sync_secs: DEFAULT_AUTO_SYNC_SECS,
        }
    }
}

impl JournalSettings {
    pub fn vault_name(&self) -> &str {
        self.vault
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_VAULT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    journal: JournalSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn journal(&self) -> JournalSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .journal
            .clone()
    }

    pub fn update_journal(&self, settings: JournalSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = guard.clone();
        updated.journal = settings;
        self.persist(&updated)?;
        *guard = updated;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
