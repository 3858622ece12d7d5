//! Racer Env - a top-down racing simulation exposed as an RL environment
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track geometry, car stepping, collisions)
//! - `rl`: Reward shaping, observations and the episode controller
//! - `config`: Data-driven environment tuning
//! - `error`: Configuration and protocol errors

pub mod config;
pub mod error;
pub mod rl;
pub mod sim;

pub use config::EnvConfig;
pub use error::{EnvError, EnvResult};
pub use rl::{Action, Info, Observation, RacerEnv, RewardBreakdown, StepResult};

use glam::DVec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// Default track used when no id is configured
    pub const DEFAULT_TRACK_ID: &str = "track-01";
    /// Default number of checkpoint gates per lap
    pub const DEFAULT_CHECKPOINT_COUNT: usize = 8;

    /// Track cross-section (world units from the centerline)
    pub const ROAD_HALF_WIDTH: f64 = 60.0;
    pub const SHOULDER_WIDTH: f64 = 15.0;
    pub const WALL_HALF_WIDTH: f64 = 90.0;
    /// Centerline samples per control-point span
    pub const SAMPLES_PER_SEGMENT: usize = 20;

    /// Car body
    pub const CAR_RADIUS: f64 = 12.0;
    pub const CAR_MAX_SPEED: f64 = 400.0;

    /// Observation defaults
    pub const RAY_COUNT: usize = 9;
    pub const RAY_MAX_DISTANCE: f64 = 400.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Blend `from` toward `to` along the shortest angular path.
///
/// `t = 0` returns `from`, `t = 1` returns `to` (both normalized).
#[inline]
pub fn lerp_angle(from: f64, to: f64, t: f64) -> f64 {
    let delta = normalize_angle(to - from);
    normalize_angle(from + delta * t.clamp(0.0, 1.0))
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Unit vector for a heading angle
#[inline]
pub fn heading_vector(heading: f64) -> DVec2 {
    polar_to_cartesian(1.0, heading)
}
