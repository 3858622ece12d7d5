//! Collision detection and response against the track walls
//!
//! The car is a circle; walls are the two closed boundary polylines. Contact
//! uses the globally nearest wall point across both polylines, and the
//! response slides the car along the wall instead of bouncing it.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::car::CarState;
use super::geometry::point_to_segment_distance;
use super::track::TrackState;
use crate::lerp_angle;

/// Below this distance the car center is treated as sitting on the wall
const COINCIDENT_EPSILON: f64 = 1e-10;

/// Normal used when the car center coincides with the nearest wall point.
///
/// There is no geometric direction to derive in that case, so a fixed unit
/// vector is reported instead of NaN.
pub const FALLBACK_NORMAL: DVec2 = DVec2::Y;

/// Tuning for the sliding wall response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionParams {
    /// Fraction of tangential velocity kept after an impact
    pub friction: f64,
    /// Impacts with severity above this also redirect heading and damp yaw
    pub severity_threshold: f64,
    /// Floor of the separation nudge along the wall normal
    pub min_separation_speed: f64,
    /// Separation nudge as a fraction of impact speed
    pub separation_speed_factor: f64,
    /// Extra push-out when already moving away from the wall
    pub separating_push_out: f64,
    /// Extra push-out when driving into the wall
    pub colliding_push_out: f64,
    /// Radius padding for the wall-contact flag reported to the reward
    pub contact_padding: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            friction: 0.7,
            severity_threshold: 0.5,
            min_separation_speed: 3.0,
            separation_speed_factor: 0.08,
            separating_push_out: 0.5,
            colliding_push_out: 0.8,
            contact_padding: 1.5,
        }
    }
}

/// Result of a wall collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the car overlaps a wall
    pub collided: bool,
    /// Overlap depth (radius - distance), zero on a miss
    pub penetration: f64,
    /// Unit normal from the wall toward the car center (into the track)
    pub normal: DVec2,
    /// Nearest wall point
    pub contact_point: DVec2,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            collided: false,
            penetration: 0.0,
            normal: DVec2::ZERO,
            contact_point: DVec2::ZERO,
        }
    }
}

/// Check a circular body against both boundary polylines.
///
/// Never fails: non-finite or non-positive radii and empty boundaries
/// report a miss.
pub fn detect_wall_collision(position: DVec2, radius: f64, track: &TrackState) -> CollisionResult {
    if !radius.is_finite() || radius <= 0.0 || !position.is_finite() {
        return CollisionResult::miss();
    }

    let mut best_distance = f64::INFINITY;
    let mut best_point = DVec2::ZERO;

    for (a, b) in track.wall_segments() {
        let proj = point_to_segment_distance(position, a, b);
        if proj.distance < best_distance {
            best_distance = proj.distance;
            best_point = proj.nearest;
        }
    }

    if !best_distance.is_finite() || best_distance >= radius {
        return CollisionResult::miss();
    }

    let normal = if best_distance < COINCIDENT_EPSILON {
        FALLBACK_NORMAL
    } else {
        (position - best_point) / best_distance
    };

    CollisionResult {
        collided: true,
        penetration: radius - best_distance,
        normal,
        contact_point: best_point,
    }
}

/// Impact severity in [0, 1]: 0 for a pure scrape along the wall, 1 head-on
pub fn impact_severity(speed: f64, tangential_speed: f64) -> f64 {
    if speed <= f64::EPSILON {
        return 0.0;
    }
    let ratio = (tangential_speed / speed).clamp(0.0, 1.0);
    (ratio.acos() / std::f64::consts::FRAC_PI_2).clamp(0.0, 1.0)
}

/// Produce the post-impact car state.
///
/// - No collision: the car is returned unchanged.
/// - Already separating: only the position is pushed out.
/// - Driving into the wall: the normal component of velocity is removed,
///   the tangential part is scaled by friction and a small separation nudge
///   is added. Severe impacts also turn the heading toward the wall tangent
///   and damp yaw; scrapes at or below the threshold leave both alone.
pub fn resolve_wall_collision(
    car: &CarState,
    collision: &CollisionResult,
    params: &CollisionParams,
) -> CarState {
    if !collision.collided {
        return car.clone();
    }

    let normal = collision.normal;
    let normal_speed = car.velocity.dot(normal);

    if normal_speed >= 0.0 {
        return CarState {
            position: car.position
                + normal * (collision.penetration + params.separating_push_out),
            ..car.clone()
        };
    }

    let tangential = car.velocity - normal * normal_speed;
    let speed = car.velocity.length();
    let severity = impact_severity(speed, tangential.length());

    let separation = params
        .min_separation_speed
        .max(speed * params.separation_speed_factor);
    let velocity = tangential * params.friction + normal * separation;

    let mut heading = car.heading;
    let mut yaw_rate = car.yaw_rate;
    let threshold = params.severity_threshold;
    if severity > threshold {
        let span = (1.0 - threshold).max(f64::EPSILON);
        let blend = ((severity - threshold) / span).clamp(0.0, 1.0);

        // Pick the tangent direction closest to where the car is facing
        let mut wall_tangent = normal.perp();
        if wall_tangent.dot(car.forward()) < 0.0 {
            wall_tangent = -wall_tangent;
        }
        let wall_heading = wall_tangent.y.atan2(wall_tangent.x);

        heading = lerp_angle(car.heading, wall_heading, blend);
        yaw_rate *= 1.0 - blend;
    }

    CarState {
        position: car.position + normal * (collision.penetration + params.colliding_push_out),
        velocity,
        heading,
        yaw_rate,
        speed: velocity.length(),
        ..car.clone()
    }
}
