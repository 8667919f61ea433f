use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use validator::Validate;

use crate::error::Result;
use crate::models::voice::{Personality, VoiceSettings};

/// Voice-assistant preferences persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct VoiceSettingsStore {
    path: PathBuf,
}

impl VoiceSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored settings, or defaults when the file is missing, unreadable or invalid.
    pub async fn load(&self) -> VoiceSettings {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return VoiceSettings::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read voice settings: {}", e);
                return VoiceSettings::default();
            }
        };

        match serde_json::from_slice::<VoiceSettings>(&raw) {
            Ok(settings) if settings.validate().is_ok() => settings,
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Voice settings out of range, using defaults");
                VoiceSettings::default()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Corrupt voice settings, using defaults: {}", e);
                VoiceSettings::default()
            }
        }
    }

    pub async fn save(&self, settings: &VoiceSettings) -> Result<()> {
        settings.validate()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, json).await?;

        tracing::debug!(path = %self.path.display(), "voice settings saved");
        Ok(())
    }

    /// Load, modify, save. Nothing is written if the result is invalid.
    pub async fn update<F>(&self, change: F) -> Result<VoiceSettings>
    where
        F: FnOnce(&mut VoiceSettings),
    {
        let mut settings = self.load().await;
        change(&mut settings);
        self.save(&settings).await?;
        Ok(settings)
    }
}

/// Greeting spoken when the user tests a personality.
pub fn preview_phrase(personality: Personality) -> &'static str {
    personality.preview_phrase()
}
