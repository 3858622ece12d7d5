//! Built-in track registry
//!
//! Tracks are stored as closed loops of control points; `load_track` turns
//! them into full `TrackState` geometry.

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::DVec2;

use super::track::{TrackParams, TrackState, build_track};
use crate::error::{EnvError, EnvResult};
use crate::polar_to_cartesian;

// Keep in step with the arms of `control_points`
const TRACK_IDS: [&str; 3] = ["track-01", "track-02", "oval"];

/// Ids accepted by [`load_track`], in registration order
pub fn track_ids() -> &'static [&'static str] {
    &TRACK_IDS
}

/// Control points for a registered track, counter-clockwise
pub fn control_points(id: &str) -> Option<Vec<DVec2>> {
    let points = match id {
        // Stadium circuit
        "track-01" => vec![
            DVec2::new(-600.0, -300.0),
            DVec2::new(0.0, -350.0),
            DVec2::new(600.0, -300.0),
            DVec2::new(850.0, 0.0),
            DVec2::new(600.0, 300.0),
            DVec2::new(0.0, 350.0),
            DVec2::new(-600.0, 300.0),
            DVec2::new(-850.0, 0.0),
        ],
        // Kidney with a dent on the top straight
        "track-02" => vec![
            DVec2::new(-700.0, -300.0),
            DVec2::new(0.0, -400.0),
            DVec2::new(700.0, -300.0),
            DVec2::new(900.0, 50.0),
            DVec2::new(600.0, 350.0),
            DVec2::new(200.0, 250.0),
            DVec2::new(-200.0, 350.0),
            DVec2::new(-700.0, 300.0),
            DVec2::new(-900.0, 0.0),
        ],
        // Ellipse sampled at 12 points, starting on the bottom straight
        "oval" => (0..12)
            .map(|i| {
                let theta = -FRAC_PI_2 + TAU * i as f64 / 12.0;
                let unit = polar_to_cartesian(1.0, theta);
                DVec2::new(unit.x * 700.0, unit.y * 400.0)
            })
            .collect(),
        _ => return None,
    };
    Some(points)
}

/// Build the registered track `id`
pub fn load_track(
    id: &str,
    checkpoint_count: usize,
    params: &TrackParams,
) -> EnvResult<TrackState> {
    let points = control_points(id).ok_or_else(|| EnvError::unknown_track(id))?;
    build_track(&points, checkpoint_count, params)
}
