use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::{MatchError, Result};
use crate::model::DisplayMode;

/// Longest accepted impulse lock, in seconds.
pub const MAX_IMPULSE_SECS: f64 = 600.0;

/// Per-session knobs. Immutable once a session starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Seconds of active time before the next empty slot flashes
    pub delay_flash: u32,
    /// Seconds of active time before the spoken hint plays
    pub delay_hint: u32,
    /// Seconds of active time before the guide gesture shows
    pub delay_guide: u32,
    /// Seconds the picture stays covered before tiles can be touched
    pub impulse_time: f64,
    pub show_distractors: bool,
    pub display_mode: DisplayMode,
    pub errorless_mode: bool,
    pub required_stars: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay_flash: 5,
            delay_hint: 10,
            delay_guide: 15,
            impulse_time: 1.5,
            show_distractors: false,
            display_mode: DisplayMode::Single,
            errorless_mode: false,
            required_stars: 5,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.required_stars == 0 {
            return Err(MatchError::InvalidSettings(
                "required_stars must be greater than zero".into(),
            ));
        }
        if !(0.0..=MAX_IMPULSE_SECS).contains(&self.impulse_time)
            || Duration::try_from_secs_f64(self.impulse_time).is_err()
        {
            return Err(MatchError::InvalidSettings(format!(
                "impulse_time must be between 0 and {MAX_IMPULSE_SECS} seconds, got {}",
                self.impulse_time
            )));
        }
        if !(self.delay_flash <= self.delay_hint && self.delay_hint <= self.delay_guide) {
            // Still playable, the tiers just fire out of their usual order.
            warn!(
                flash = self.delay_flash,
                hint = self.delay_hint,
                guide = self.delay_guide,
                "scaffolding delays are not monotonically increasing"
            );
        }
        Ok(())
    }

    /// The impulse lock as a duration. Out-of-range values are clamped so the
    /// engine never panics on settings that skipped `validate`.
    pub fn impulse_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.impulse_time.clamp(0.0, MAX_IMPULSE_SECS))
            .unwrap_or_default()
    }

    pub fn is_multi(&self) -> bool {
        self.display_mode == DisplayMode::Multi
    }
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_file("settings.json")
            .unwrap_or_else(|| PathBuf::from("matchking_settings.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    /// Missing fields take their defaults; an unreadable file yields defaults.
    fn load(&self) -> Settings {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Settings>(&bytes) {
                Ok(settings) => return settings,
                Err(e) => warn!(path = %self.path.display(), error = %e, "ignoring corrupt settings file"),
            }
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
