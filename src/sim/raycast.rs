//! Wall-distance rays for the agent's observation

use glam::DVec2;

use super::geometry::segment_intersection;
use super::track::TrackState;
use crate::polar_to_cartesian;

/// Relative angle of ray `index` out of `count`, spread evenly across `fov`
pub fn ray_angle(index: usize, count: usize, fov: f64) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    -fov / 2.0 + fov * index as f64 / (count - 1) as f64
}

/// Distance along one ray to the nearest wall, capped at `max_distance`
pub fn cast_ray(origin: DVec2, angle: f64, track: &TrackState, max_distance: f64) -> f64 {
    let end = origin + polar_to_cartesian(max_distance, angle);
    track
        .wall_segments()
        .filter_map(|(a, b)| segment_intersection(origin, end, a, b))
        .map(|(t, _)| t * max_distance)
        .fold(max_distance, f64::min)
}

/// Cast `count` rays across `fov` centered on `heading`.
///
/// Each value is the hit distance divided by `max_distance`, in [0, 1];
/// 1.0 means no wall within range.
pub fn cast_rays(
    position: DVec2,
    heading: f64,
    track: &TrackState,
    count: usize,
    fov: f64,
    max_distance: f64,
) -> Vec<f64> {
    if max_distance <= 0.0 || !max_distance.is_finite() {
        return vec![1.0; count];
    }
    (0..count)
        .map(|i| {
            let angle = heading + ray_angle(i, count, fov);
            (cast_ray(position, angle, track, max_distance) / max_distance).clamp(0.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::TrackParams;
    use crate::sim::track::fixtures::ring_track;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_ray_angles_span_fov() {
        assert_eq!(ray_angle(0, 1, PI), 0.0);
        assert!((ray_angle(0, 9, PI) + FRAC_PI_2).abs() < 1e-12);
        assert!(ray_angle(4, 9, PI).abs() < 1e-12);
        assert!((ray_angle(8, 9, PI) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_rays_hit_walls_on_ring() {
        let track = ring_track(500.0, 360);
        let wall = TrackParams::default().wall_half_width;
        // At (500, 0) facing +y: rays toward ±x reach the walls after ~90
        let rays = cast_rays(DVec2::new(500.0, 0.0), FRAC_PI_2, &track, 3, PI, 400.0);
        assert_eq!(rays.len(), 3);
        // index 0 points along +x (toward the outer wall)
        assert!((rays[0] * 400.0 - wall).abs() < 1.0);
        // index 2 points along -x (toward the inner wall)
        assert!((rays[2] * 400.0 - wall).abs() < 1.0);
        for r in rays {
            assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn test_ray_without_hit_is_one() {
        let mut track = ring_track(500.0, 90);
        track.inner_boundary.clear();
        track.outer_boundary.clear();
        let rays = cast_rays(DVec2::ZERO, 0.0, &track, 5, PI, 400.0);
        assert_eq!(rays, vec![1.0; 5]);
    }
}
