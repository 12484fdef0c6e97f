use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::celebration::{CelebrationTiming, MilestonePolicy};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngagementSettings {
    pub milestone_policy: MilestonePolicy,
    pub celebration_duration_ms: u64,
    pub reset_gap_ms: u64,
    pub success_display_ms: u64,
    pub level_up_display_ms: u64,
}

impl Default for EngagementSettings {
    fn default() -> Self {
        Self {
            milestone_policy: MilestonePolicy::default(),
            celebration_duration_ms: 4000,
            reset_gap_ms: 50,
            success_display_ms: 2000,
            level_up_display_ms: 3000,
        }
    }
}

impl EngagementSettings {
    pub fn celebration_timing(&self) -> CelebrationTiming {
        CelebrationTiming {
            duration: Duration::from_millis(self.celebration_duration_ms),
            reset_gap: Duration::from_millis(self.reset_gap_ms),
        }
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    pub fn level_up_display(&self) -> Duration {
        Duration::from_millis(self.level_up_display_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct UserSettings {
    engagement: EngagementSettings,
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
                log_warn!("Ignoring unreadable settings at {}: {err}", path.display());
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

    pub fn engagement(&self) -> EngagementSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .engagement
            .clone()
    }

    pub fn update_engagement(&self, settings: EngagementSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.engagement = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.engagement(), EngagementSettings::default());
    }

    #[test]
    fn updates_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let settings = EngagementSettings {
            milestone_policy: MilestonePolicy::Modulo { every: 100 },
            celebration_duration_ms: 3000,
            ..EngagementSettings::default()
        };
        store.update_engagement(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.engagement(), settings);
        assert_eq!(
            reopened.engagement().celebration_timing().duration,
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn partial_and_corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{"engagement":{"successDisplayMs":1500}}"#).unwrap();
        let store = SettingsStore::new(partial).unwrap();
        assert_eq!(store.engagement().success_display_ms, 1500);
        assert_eq!(store.engagement().reset_gap_ms, 50);
        assert_eq!(
            store.engagement().level_up_display(),
            Duration::from_millis(3000)
        );

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "{not json").unwrap();
        let store = SettingsStore::new(corrupt).unwrap();
        assert_eq!(store.engagement(), EngagementSettings::default());
    }
}
