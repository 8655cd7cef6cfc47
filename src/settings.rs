//! User settings
//!
//! Stored in ~/.config/ardysa/settings.json. Every field is optional in the
//! file; anything missing falls back to the built-in default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::games::{Markers, DEFAULT_MOD_MARKER, DEFAULT_SIGNATURE_MARKER};

fn default_step_delay_ms() -> u64 {
    250
}

fn default_mod_marker() -> String {
    DEFAULT_MOD_MARKER.to_string()
}

fn default_signature_marker() -> String {
    DEFAULT_SIGNATURE_MARKER.to_string()
}

/// User settings for the doctor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Dota 2 install folder (the one containing `game/`)
    #[serde(default)]
    pub game_dir: String,

    /// Pause between checks in interactive runs
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Marker expected in gameinfo_branchspecific.gi
    #[serde(default = "default_mod_marker")]
    pub mod_marker: String,

    /// Patch-format line expected in dota.signatures
    #[serde(default = "default_signature_marker")]
    pub signature_marker: String,

    /// External command that re-applies the patch
    #[serde(default)]
    pub patch_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game_dir: String::new(),
            step_delay_ms: default_step_delay_ms(),
            mod_marker: default_mod_marker(),
            signature_marker: default_signature_marker(),
            patch_command: String::new(),
        }
    }
}

impl Settings {
    /// Get the config directory path (~/.config/ardysa)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ardysa");

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path().and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not load settings: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        let settings: Self =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    /// Save settings to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Configured game folder, if any
    pub fn game_dir(&self) -> Option<PathBuf> {
        if self.game_dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.game_dir))
        }
    }

    /// Configured patch command, if any
    pub fn patch_command(&self) -> Option<&str> {
        if self.patch_command.trim().is_empty() {
            None
        } else {
            Some(self.patch_command.trim())
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Content markers, with blank entries replaced by the defaults
    pub fn markers(&self) -> Markers {
        let defaults = Markers::default();
        Markers {
            mod_marker: if self.mod_marker.is_empty() {
                defaults.mod_marker
            } else {
                self.mod_marker.clone()
            },
            signature_marker: if self.signature_marker.is_empty() {
                defaults.signature_marker
            } else {
                self.signature_marker.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.step_delay(), Duration::from_millis(250));
        assert!(settings.game_dir().is_none());
        assert!(settings.patch_command().is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"game_dir": "/games/dota 2 beta", "mod_marker": ""}"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.game_dir(), Some(PathBuf::from("/games/dota 2 beta")));
        assert_eq!(settings.step_delay_ms, 250);
        // Blank marker falls back at use time
        assert_eq!(settings.markers(), Markers::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");

        let settings = Settings {
            step_delay_ms: 0,
            patch_command: "  ardysa-patcher --silent ".to_string(),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.patch_command(), Some("ardysa-patcher --silent"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
