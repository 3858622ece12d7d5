//! Environment configuration
//!
//! Every section falls back to its defaults, so a JSON file only needs the
//! values it wants to override.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CHECKPOINT_COUNT, DEFAULT_TRACK_ID};
use crate::error::{EnvError, EnvResult};
use crate::rl::{ObservationParams, RewardWeights};
use crate::sim::{CarParams, CollisionParams, TrackParams};

/// Episode length limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeParams {
    /// Step count at which the episode is truncated
    pub max_steps: u64,
    /// Consecutive below-threshold ticks at which the episode terminates
    pub stillness_timeout_ticks: u64,
}

impl Default for EpisodeParams {
    fn default() -> Self {
        Self {
            max_steps: 3000,
            stillness_timeout_ticks: 180,
        }
    }
}

/// Complete environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Registry id of the track to race on
    pub track_id: String,
    /// Number of checkpoint gates per lap
    pub checkpoint_count: usize,
    pub track: TrackParams,
    pub car: CarParams,
    pub collision: CollisionParams,
    pub reward: RewardWeights,
    pub episode: EpisodeParams,
    pub observation: ObservationParams,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            track_id: DEFAULT_TRACK_ID.to_string(),
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
            track: TrackParams::default(),
            car: CarParams::default(),
            collision: CollisionParams::default(),
            reward: RewardWeights::default(),
            episode: EpisodeParams::default(),
            observation: ObservationParams::default(),
        }
    }
}

impl EnvConfig {
    /// Default config on a specific track
    pub fn for_track(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json_str(json: &str) -> EnvResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file from disk
    pub fn load(path: impl AsRef<Path>) -> EnvResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EnvError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {} (track {})", path.display(), config.track_id);
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> EnvResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ranges that would otherwise produce NaNs or endless episodes
    pub fn validate(&self) -> EnvResult<()> {
        if self.track_id.trim().is_empty() {
            return Err(EnvError::invalid_config("track_id must not be empty"));
        }
        if self.checkpoint_count == 0 {
            return Err(EnvError::invalid_config("checkpoint_count must be positive"));
        }
        if self.episode.max_steps == 0 {
            return Err(EnvError::invalid_config("episode.max_steps must be positive"));
        }
        if self.episode.stillness_timeout_ticks == 0 {
            return Err(EnvError::invalid_config(
                "episode.stillness_timeout_ticks must be positive",
            ));
        }
        if self.observation.ray_count == 0 {
            return Err(EnvError::invalid_config("observation.ray_count must be positive"));
        }

        let positive = [
            ("observation.ray_max_distance", self.observation.ray_max_distance),
            ("observation.max_yaw_rate", self.observation.max_yaw_rate),
            (
                "observation.max_centerline_distance",
                self.observation.max_centerline_distance,
            ),
            ("car.radius", self.car.radius),
            ("car.max_speed", self.car.max_speed),
            ("car.wheelbase", self.car.wheelbase),
            ("track.road_half_width", self.track.road_half_width),
            ("track.wall_half_width", self.track.wall_half_width),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EnvError::invalid_config(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }

        if self.track.wall_half_width <= self.track.road_half_width {
            return Err(EnvError::invalid_config(
                "track.wall_half_width must exceed track.road_half_width",
            ));
        }

        let threshold = self.collision.severity_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(EnvError::invalid_config(format!(
                "collision.severity_threshold must be in [0, 1), got {threshold}"
            )));
        }

        if !self.reward.all_finite() {
            return Err(EnvError::invalid_config("reward weights must be finite"));
        }

        Ok(())
    }
}
