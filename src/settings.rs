use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::config::DrawConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    drawing: DrawConfig,
}

/// JSON-backed store for the user's drawing preferences.
///
/// A missing or unreadable file falls back to defaults; parse errors are
/// swallowed the same way so a corrupt settings file never blocks startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn drawing(&self) -> DrawConfig {
        self.data.read().unwrap().drawing.clone()
    }

    pub fn update_drawing(&self, config: DrawConfig) -> Result<()> {
        config.validate()?;
        let mut guard = self.data.write().unwrap();
        guard.drawing = config;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write settings to {}", self.path.display()))
    }

    #[allow(dead_code)]
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path() -> PathBuf {
        std::env::temp_dir().join(format!("airsketch-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_settings_path()).unwrap();
        assert_eq!(store.drawing(), DrawConfig::default());
    }

    #[test]
    fn update_round_trips_through_disk() {
        let path = temp_settings_path();
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut config = DrawConfig::default();
        config.line_thickness = 9;
        config.stroke_color = [0, 128, 255];
        store.update_drawing(config.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.drawing(), config);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_persisted() {
        let path = temp_settings_path();
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut config = DrawConfig::default();
        config.min_pinch_distance = 500.0;
        assert!(store.update_drawing(config).is_err());
        assert_eq!(store.drawing(), DrawConfig::default());

        let _ = fs::remove_file(path);
    }
}
