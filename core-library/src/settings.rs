//! Typed user settings
//!
//! Settings share the `config` table with engine bookkeeping. Values are
//! stored as strings; a missing or unparseable value reads as the default.

use crate::error::{LibraryError, Result};
use crate::repositories::LibraryCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod keys {
    pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";
    pub const LYRICS_OFFSET: &str = "lyrics_offset";
    pub const REPLAY_GAIN_MODE: &str = "replay_gain_mode";
    pub const REPLAY_GAIN_PREAMP: &str = "replay_gain_preamp";
    pub const LYRICS_BLANK_LINE_INTERVAL: &str = "lyrics_blank_line_interval";
}

pub const DEFAULT_LYRICS_OFFSET_MS: i64 = 500;
pub const DEFAULT_LYRICS_BLANK_LINE_INTERVAL_MS: i64 = 12_000;

/// Which ReplayGain value playback should apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayGainMode {
    #[default]
    None,
    Track,
    Album,
}

impl fmt::Display for ReplayGainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplayGainMode::None => "None",
            ReplayGainMode::Track => "Track",
            ReplayGainMode::Album => "Album",
        };
        f.write_str(name)
    }
}

impl FromStr for ReplayGainMode {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "None" => Ok(ReplayGainMode::None),
            "Track" => Ok(ReplayGainMode::Track),
            "Album" => Ok(ReplayGainMode::Album),
            other => Err(LibraryError::InvalidInput {
                field: keys::REPLAY_GAIN_MODE.to_string(),
                message: format!("unknown mode '{}'", other),
            }),
        }
    }
}

/// All settings at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub onboarding_completed: bool,
    pub lyrics_offset_ms: i64,
    pub replay_gain_mode: ReplayGainMode,
    pub replay_gain_preamp: f32,
    pub lyrics_blank_line_interval_ms: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            onboarding_completed: false,
            lyrics_offset_ms: DEFAULT_LYRICS_OFFSET_MS,
            replay_gain_mode: ReplayGainMode::None,
            replay_gain_preamp: 0.0,
            lyrics_blank_line_interval_ms: DEFAULT_LYRICS_BLANK_LINE_INTERVAL_MS,
        }
    }
}

/// Typed accessors over the config table.
#[derive(Clone)]
pub struct SettingsRepository {
    cache: Arc<dyn LibraryCache>,
}

impl SettingsRepository {
    pub fn new(cache: Arc<dyn LibraryCache>) -> Self {
        Self { cache }
    }

    async fn read<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        let value = self.cache.get_config_value(key).await?;
        Ok(value.and_then(|v| v.trim().parse().ok()).unwrap_or(default))
    }

    pub async fn load(&self) -> Result<Settings> {
        Ok(Settings {
            onboarding_completed: self.onboarding_completed().await?,
            lyrics_offset_ms: self.lyrics_offset_ms().await?,
            replay_gain_mode: self.replay_gain_mode().await?,
            replay_gain_preamp: self.replay_gain_preamp().await?,
            lyrics_blank_line_interval_ms: self.lyrics_blank_line_interval_ms().await?,
        })
    }

    pub async fn onboarding_completed(&self) -> Result<bool> {
        self.read(keys::ONBOARDING_COMPLETED, false).await
    }

    pub async fn set_onboarding_completed(&self, completed: bool) -> Result<()> {
        self.cache
            .set_config_value(keys::ONBOARDING_COMPLETED, &completed.to_string())
            .await
    }

    pub async fn lyrics_offset_ms(&self) -> Result<i64> {
        self.read(keys::LYRICS_OFFSET, DEFAULT_LYRICS_OFFSET_MS).await
    }

    pub async fn set_lyrics_offset_ms(&self, offset: i64) -> Result<()> {
        self.cache
            .set_config_value(keys::LYRICS_OFFSET, &offset.to_string())
            .await
    }

    pub async fn replay_gain_mode(&self) -> Result<ReplayGainMode> {
        self.read(keys::REPLAY_GAIN_MODE, ReplayGainMode::None).await
    }

    pub async fn set_replay_gain_mode(&self, mode: ReplayGainMode) -> Result<()> {
        self.cache
            .set_config_value(keys::REPLAY_GAIN_MODE, &mode.to_string())
            .await
    }

    pub async fn replay_gain_preamp(&self) -> Result<f32> {
        self.read(keys::REPLAY_GAIN_PREAMP, 0.0).await
    }

    /// # Errors
    /// `LibraryError::InvalidInput` for a non-finite gain.
    pub async fn set_replay_gain_preamp(&self, gain: f32) -> Result<()> {
        if !gain.is_finite() {
            return Err(LibraryError::InvalidInput {
                field: keys::REPLAY_GAIN_PREAMP.to_string(),
                message: "must be a finite number".to_string(),
            });
        }
        self.cache
            .set_config_value(keys::REPLAY_GAIN_PREAMP, &gain.to_string())
            .await
    }

    pub async fn lyrics_blank_line_interval_ms(&self) -> Result<i64> {
        self.read(
            keys::LYRICS_BLANK_LINE_INTERVAL,
            DEFAULT_LYRICS_BLANK_LINE_INTERVAL_MS,
        )
        .await
    }

    pub async fn set_lyrics_blank_line_interval_ms(&self, interval: i64) -> Result<()> {
        self.cache
            .set_config_value(keys::LYRICS_BLANK_LINE_INTERVAL, &interval.to_string())
            .await
    }
}
