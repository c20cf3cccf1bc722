//! Events settings
//!
//! Stage day-counts and display colours, persisted as a JSON settings
//! file. Colours are carried for the display layer only; the sweep never
//! interprets them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::{MAX_STAGE_DAYS, MIN_STAGE_DAYS};
use crate::error::Result;

/// Staged-reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsSettings {
    /// Days before the due instant at which stage 1 arms.
    #[serde(default = "default_stage1_days")]
    pub stage1_days: u32,
    /// Days before the due instant at which stage 2 arms.
    #[serde(default = "default_stage2_days")]
    pub stage2_days: u32,
    /// Days before the due instant at which stage 3 arms.
    #[serde(default = "default_stage3_days")]
    pub stage3_days: u32,
    #[serde(default = "default_stage1_colour")]
    pub stage1_colour: String,
    #[serde(default = "default_stage2_colour")]
    pub stage2_colour: String,
    #[serde(default = "default_stage3_colour")]
    pub stage3_colour: String,
    #[serde(default = "default_now_colour")]
    pub now_colour: String,
}

fn default_stage1_days() -> u32 {
    5
}

fn default_stage2_days() -> u32 {
    10
}

fn default_stage3_days() -> u32 {
    30
}

fn default_stage1_colour() -> String {
    "red".to_string()
}

fn default_stage2_colour() -> String {
    "yellow".to_string()
}

fn default_stage3_colour() -> String {
    "green".to_string()
}

fn default_now_colour() -> String {
    "blue".to_string()
}

impl Default for EventsSettings {
    fn default() -> Self {
        Self {
            stage1_days: default_stage1_days(),
            stage2_days: default_stage2_days(),
            stage3_days: default_stage3_days(),
            stage1_colour: default_stage1_colour(),
            stage2_colour: default_stage2_colour(),
            stage3_colour: default_stage3_colour(),
            now_colour: default_now_colour(),
        }
    }
}

impl EventsSettings {
    /// Load settings from `path`, falling back to defaults when the file
    /// is missing or unreadable.
    pub async fn load(path: &Path) -> Self {
        match fs::read_to_string(path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse settings file {:?}: {}, using defaults",
                        path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Settings file not found at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read settings file {:?}: {}, using defaults",
                    path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Save settings to `path` as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).await?;

        tracing::debug!("Saved events settings to {:?}", path);
        Ok(())
    }

    /// Clamp the stage day-counts into the accepted range.
    pub fn validate(&mut self) {
        for days in [
            &mut self.stage1_days,
            &mut self.stage2_days,
            &mut self.stage3_days,
        ] {
            *days = (*days).clamp(MIN_STAGE_DAYS, MAX_STAGE_DAYS);
        }
    }
}
