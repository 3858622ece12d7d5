//! Car state and the per-tick stepping function
//!
//! A compact single-track model: steering slews toward the requested angle,
//! longitudinal speed follows throttle/brake/drag, yaw follows the kinematic
//! bicycle model until lateral grip runs out, and lateral velocity bleeds off
//! over time, which gives the car a little slide when it turns hard.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::track::Surface;
use crate::consts::{CAR_MAX_SPEED, CAR_RADIUS};
use crate::{heading_vector, normalize_angle};

/// Driver input for one tick, already clamped to its valid ranges
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarInput {
    /// -1 (full lock clockwise) to +1 (full lock counter-clockwise)
    pub steer: f64,
    /// 0 to 1
    pub throttle: f64,
    /// 0 to 1
    pub brake: f64,
}

impl CarInput {
    /// Clamp raw values into the input box
    pub fn clamped(steer: f64, throttle: f64, brake: f64) -> Self {
        Self {
            steer: steer.clamp(-1.0, 1.0),
            throttle: throttle.clamp(0.0, 1.0),
            brake: brake.clamp(0.0, 1.0),
        }
    }
}

/// Input applied on the previous tick, plus the resulting wheel angle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrevInput {
    pub steer: f64,
    pub throttle: f64,
    pub brake: f64,
    /// Front wheel angle in radians
    pub steer_angle: f64,
}

/// Vehicle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarParams {
    /// Collision radius of the car body
    pub radius: f64,
    pub max_speed: f64,
    /// Full-throttle acceleration on road
    pub engine_accel: f64,
    /// Full-brake deceleration
    pub brake_decel: f64,
    /// Speed-proportional drag coefficient (1/s)
    pub drag: f64,
    /// Constant rolling deceleration
    pub rolling_resistance: f64,
    pub wheelbase: f64,
    /// Front wheel angle at full lock (radians)
    pub max_steer_angle: f64,
    /// Wheel angle slew rate (radians/s)
    pub steer_rate: f64,
    /// Maximum lateral acceleration on road
    pub lateral_grip: f64,
    /// Decay rate of sideways velocity (1/s)
    pub lateral_damping: f64,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            radius: CAR_RADIUS,
            max_speed: CAR_MAX_SPEED,
            engine_accel: 260.0,
            brake_decel: 520.0,
            drag: 0.25,
            rolling_resistance: 12.0,
            wheelbase: 36.0,
            max_steer_angle: 0.55,
            steer_rate: 4.0,
            lateral_grip: 900.0,
            lateral_damping: 6.0,
        }
    }
}

/// Kinematic state of the car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    pub position: DVec2,
    pub velocity: DVec2,
    /// Facing angle in radians, normalized to [-π, π)
    pub heading: f64,
    /// Radians per second
    pub yaw_rate: f64,
    /// Magnitude of `velocity`
    pub speed: f64,
    pub prev_input: PrevInput,
    pub surface: Surface,
    pub accel_longitudinal: f64,
    /// Angle between heading and velocity
    pub slip_angle: f64,
}

impl CarState {
    /// Car at rest
    pub fn at_rest(position: DVec2, heading: f64) -> Self {
        Self {
            position,
            velocity: DVec2::ZERO,
            heading: normalize_angle(heading),
            yaw_rate: 0.0,
            speed: 0.0,
            prev_input: PrevInput::default(),
            surface: Surface::Road,
            accel_longitudinal: 0.0,
            slip_angle: 0.0,
        }
    }

    /// Unit vector along the heading
    pub fn forward(&self) -> DVec2 {
        heading_vector(self.heading)
    }
}

/// Advance the car by one tick on the given surface
pub fn step_car(car: &CarState, input: &CarInput, params: &CarParams, dt: f64) -> CarState {
    let grip = car.surface.grip();

    // Steering slews toward the requested wheel angle
    let target_angle = input.steer * params.max_steer_angle;
    let max_delta = params.steer_rate * dt;
    let steer_angle = car.prev_input.steer_angle
        + (target_angle - car.prev_input.steer_angle).clamp(-max_delta, max_delta);

    let forward = car.forward();
    let lateral = forward.perp();
    let v_long = car.velocity.dot(forward);
    let v_lat = car.velocity.dot(lateral);

    // Longitudinal: no reverse gear, brake only slows toward zero
    let mut accel = input.throttle * params.engine_accel * grip
        - (params.drag + car.surface.drag()) * v_long;
    if v_long > 0.0 {
        accel -= input.brake * params.brake_decel + params.rolling_resistance;
    }
    let new_v_long = (v_long + accel * dt).clamp(0.0, params.max_speed);

    // Kinematic bicycle yaw, limited by available lateral grip
    let mut yaw_rate = new_v_long / params.wheelbase * steer_angle.tan();
    if new_v_long > 1.0 {
        let max_yaw = params.lateral_grip * grip / new_v_long;
        yaw_rate = yaw_rate.clamp(-max_yaw, max_yaw);
    }
    let heading = normalize_angle(car.heading + yaw_rate * dt);

    let new_v_lat = v_lat * (-params.lateral_damping * grip * dt).exp();
    let new_forward = heading_vector(heading);
    let mut velocity = new_forward * new_v_long + new_forward.perp() * new_v_lat;
    let mut speed = velocity.length();
    if speed > params.max_speed {
        velocity *= params.max_speed / speed;
        speed = params.max_speed;
    }

    let slip_angle = if speed > 1.0 {
        new_v_lat.atan2(new_v_long.abs())
    } else {
        0.0
    };

    CarState {
        position: car.position + velocity * dt,
        velocity,
        heading,
        yaw_rate,
        speed,
        prev_input: PrevInput {
            steer: input.steer,
            throttle: input.throttle,
            brake: input.brake,
            steer_angle,
        },
        surface: car.surface,
        accel_longitudinal: (new_v_long - v_long) / dt,
        slip_angle,
    }
}
