//! Observation vector layout
//!
//! `[rays.., speed, yaw_rate, steer, lap_progress, centerline_distance]`
//!
//! | slot       | range   |
//! |------------|---------|
//! | rays       | [0, 1]  |
//! | speed      | [0, 1]  |
//! | yaw rate   | [-1, 1] |
//! | steer      | [-1, 1] |
//! | progress   | [0, 1)  |
//! | centerline | [0, 1]  |

use serde::{Deserialize, Serialize};

use crate::consts::{RAY_COUNT, RAY_MAX_DISTANCE};
use crate::sim::{CarState, TrackProgress};

/// Non-ray values appended after the ray distances
pub const KINEMATIC_FEATURES: usize = 5;

/// Flat observation handed to the agent
pub type Observation = Vec<f32>;

/// Sensor layout and normalization scales
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationParams {
    pub ray_count: usize,
    /// Total angular spread of the ray fan (radians)
    pub ray_fov: f64,
    pub ray_max_distance: f64,
    /// Yaw rate (rad/s) mapped to ±1
    pub max_yaw_rate: f64,
    /// Centerline distance mapped to 1
    pub max_centerline_distance: f64,
}

impl Default for ObservationParams {
    fn default() -> Self {
        Self {
            ray_count: RAY_COUNT,
            ray_fov: std::f64::consts::PI,
            ray_max_distance: RAY_MAX_DISTANCE,
            max_yaw_rate: 4.0,
            max_centerline_distance: 90.0,
        }
    }
}

impl ObservationParams {
    /// Length of every observation built with these params
    pub fn observation_len(&self) -> usize {
        self.ray_count + KINEMATIC_FEATURES
    }
}

/// Divide and clamp, mapping a non-positive scale to zero
#[inline]
fn scaled(value: f64, scale: f64, min: f64, max: f64) -> f64 {
    if scale > 0.0 && value.is_finite() {
        (value / scale).clamp(min, max)
    } else {
        0.0
    }
}

/// Build the observation vector for the current tick.
///
/// `rays` are already normalized to [0, 1] and copied through unchanged.
pub fn build_observation(
    rays: &[f64],
    car: &CarState,
    progress: TrackProgress,
    total_length: f64,
    max_speed: f64,
    params: &ObservationParams,
) -> Observation {
    let lap_progress = if total_length > 0.0 {
        (progress.arc_length / total_length).clamp(0.0, 1.0)
    } else {
        0.0
    };
    // f32 rounding can push values just below 1.0 up to exactly 1.0
    let lap_progress = (lap_progress as f32).min(1.0 - f32::EPSILON);

    let mut obs = Vec::with_capacity(rays.len() + KINEMATIC_FEATURES);
    obs.extend(rays.iter().map(|&r| r as f32));
    obs.push(scaled(car.speed, max_speed, 0.0, 1.0) as f32);
    obs.push(scaled(car.yaw_rate, params.max_yaw_rate, -1.0, 1.0) as f32);
    obs.push(car.prev_input.steer.clamp(-1.0, 1.0) as f32);
    obs.push(lap_progress.max(0.0));
    obs.push(scaled(progress.distance, params.max_centerline_distance, 0.0, 1.0) as f32);
    obs
}
