//! Per-tick reward shaping
//!
//! `compute_reward` is pure: it reads two consecutive world snapshots and
//! returns every component separately along with their sum.

use serde::{Deserialize, Serialize};

use crate::sim::WorldState;

/// Reward weights. Penalties are stored as signed (negative) values and added
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Reward for one full lap of forward progress
    pub progress: f64,
    /// Reward per tick at full speed
    pub speed_bonus: f64,
    pub wall_penalty: f64,
    pub off_track_penalty: f64,
    pub backward_penalty: f64,
    pub stillness_penalty: f64,
    /// Speeds strictly below this count as standing still
    pub stillness_speed_threshold: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            progress: 100.0,
            speed_bonus: 0.01,
            wall_penalty: -0.02,
            off_track_penalty: -0.01,
            backward_penalty: -0.01,
            stillness_penalty: -0.005,
            stillness_speed_threshold: 5.0,
        }
    }
}

impl RewardWeights {
    pub fn all_finite(&self) -> bool {
        [
            self.progress,
            self.speed_bonus,
            self.wall_penalty,
            self.off_track_penalty,
            self.backward_penalty,
            self.stillness_penalty,
            self.stillness_speed_threshold,
        ]
        .iter()
        .all(|w| w.is_finite())
    }
}

/// Individual reward terms for one tick; `total` is their sum
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub progress: f64,
    pub speed: f64,
    pub wall: f64,
    pub off_track: f64,
    pub backward: f64,
    pub stillness: f64,
    pub total: f64,
}

/// Arc lengths of the car on the previous and current tick, when the caller
/// already has them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcLengthPair {
    pub prev: f64,
    pub curr: f64,
}

/// Arc-length delta with start/finish wrap-around removed
pub fn wrapped_arc_delta(prev: f64, curr: f64, total_length: f64) -> f64 {
    let delta = curr - prev;
    let half = total_length / 2.0;
    if delta > half {
        delta - total_length
    } else if delta < -half {
        delta + total_length
    } else {
        delta
    }
}

/// Reward for the transition `prev` -> `curr`.
///
/// Without `arc_lengths` both positions are projected onto the centerline
/// here; the episode controller passes the values it already computed so the
/// reward and observation agree on the car's progress.
pub fn compute_reward(
    prev: &WorldState,
    curr: &WorldState,
    wall_contact: bool,
    weights: &RewardWeights,
    max_speed: f64,
    arc_lengths: Option<ArcLengthPair>,
) -> RewardBreakdown {
    let track = &curr.track;
    let total_length = track.total_length;

    let ArcLengthPair {
        prev: prev_arc,
        curr: curr_arc,
    } = arc_lengths.unwrap_or_else(|| ArcLengthPair {
        prev: track.progress(prev.car.position).arc_length,
        curr: track.progress(curr.car.position).arc_length,
    });

    let delta = if total_length > 0.0 {
        wrapped_arc_delta(prev_arc, curr_arc, total_length)
    } else {
        0.0
    };

    let progress = if total_length > 0.0 {
        delta / total_length * weights.progress
    } else {
        0.0
    };
    let speed = if max_speed > 0.0 {
        curr.car.speed / max_speed * weights.speed_bonus
    } else {
        0.0
    };
    let wall = if wall_contact { weights.wall_penalty } else { 0.0 };
    let off_track = if curr.car.surface.is_road() {
        0.0
    } else {
        weights.off_track_penalty
    };
    let backward = if delta < 0.0 {
        weights.backward_penalty
    } else {
        0.0
    };
    let stillness = if curr.car.speed < weights.stillness_speed_threshold {
        weights.stillness_penalty
    } else {
        0.0
    };

    RewardBreakdown {
        progress,
        speed,
        wall,
        off_track,
        backward,
        stillness,
        total: progress + speed + wall + off_track + backward + stillness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CAR_MAX_SPEED;
    use crate::sim::track::fixtures::square_track;
    use crate::sim::{Surface, create_world};
    use glam::DVec2;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn world_at(position: DVec2, speed: f64, surface: Surface) -> WorldState {
        let mut world = create_world(Arc::new(square_track()));
        world.car.position = position;
        world.car.velocity = DVec2::new(speed, 0.0);
        world.car.speed = speed;
        world.car.surface = surface;
        world
    }

    fn sum(b: &RewardBreakdown) -> f64 {
        b.progress + b.speed + b.wall + b.off_track + b.backward + b.stillness
    }

    #[test]
    fn test_crossing_finish_line_is_forward() {
        let prev = world_at(DVec2::new(0.0, 2.0), 100.0, Surface::Road);
        let curr = world_at(DVec2::new(2.0, 0.0), 100.0, Surface::Road);
        let weights = RewardWeights::default();
        let pair = ArcLengthPair {
            prev: 998.0,
            curr: 2.0,
        };
        let r = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, Some(pair));
        assert!((r.progress - 4.0 / 1000.0 * weights.progress).abs() < 1e-12);
        assert_eq!(r.backward, 0.0);

        // Projecting the positions gives the same answer
        let r2 = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, None);
        assert!((r2.progress - r.progress).abs() < 1e-9);
    }

    #[test]
    fn test_reversing_over_finish_line_is_backward() {
        let prev = world_at(DVec2::new(2.0, 0.0), 100.0, Surface::Road);
        let curr = world_at(DVec2::new(0.0, 2.0), 100.0, Surface::Road);
        let weights = RewardWeights::default();
        let r = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, None);
        assert!(r.progress < 0.0);
        assert!((r.progress + 4.0 / 1000.0 * weights.progress).abs() < 1e-9);
        assert_eq!(r.backward, weights.backward_penalty);
    }

    #[test]
    fn test_progress_is_linear_in_weight() {
        let prev = world_at(DVec2::new(100.0, 0.0), 50.0, Surface::Road);
        let curr = world_at(DVec2::new(110.0, 0.0), 50.0, Surface::Road);
        let weights = RewardWeights::default();
        let doubled = RewardWeights {
            progress: weights.progress * 2.0,
            ..weights.clone()
        };
        let a = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, None);
        let b = compute_reward(&prev, &curr, false, &doubled, CAR_MAX_SPEED, None);
        assert!(a.progress > 0.0);
        assert_eq!(b.progress, 2.0 * a.progress);
    }

    #[test]
    fn test_off_track_for_every_non_road_surface() {
        let weights = RewardWeights::default();
        for surface in Surface::ALL {
            let prev = world_at(DVec2::new(100.0, 0.0), 50.0, surface);
            let curr = world_at(DVec2::new(101.0, 0.0), 50.0, surface);
            let r = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, None);
            let expected = if surface.is_road() {
                0.0
            } else {
                weights.off_track_penalty
            };
            assert_eq!(r.off_track, expected, "{surface:?}");
        }
    }

    #[test]
    fn test_stillness_threshold_is_strict() {
        let weights = RewardWeights::default();
        let threshold = weights.stillness_speed_threshold;
        let prev = world_at(DVec2::new(100.0, 0.0), threshold, Surface::Road);

        let at = world_at(DVec2::new(100.0, 0.0), threshold, Surface::Road);
        let r = compute_reward(&prev, &at, false, &weights, CAR_MAX_SPEED, None);
        assert_eq!(r.stillness, 0.0);

        let below = world_at(DVec2::new(100.0, 0.0), threshold - 1e-9, Surface::Road);
        let r = compute_reward(&prev, &below, false, &weights, CAR_MAX_SPEED, None);
        assert_eq!(r.stillness, weights.stillness_penalty);
    }

    #[test]
    fn test_stationary_car_at_start() {
        let world = create_world(Arc::new(square_track()));
        let weights = RewardWeights::default();
        let r = compute_reward(&world, &world, false, &weights, CAR_MAX_SPEED, None);
        assert_eq!(r.progress, 0.0);
        assert_eq!(r.speed, 0.0);
        assert_eq!(r.stillness, weights.stillness_penalty);
        assert!(r.total < 0.0);
    }

    #[test]
    fn test_all_penalties_at_once() {
        let prev = world_at(DVec2::new(110.0, 0.0), 1.0, Surface::Runoff);
        let curr = world_at(DVec2::new(100.0, 0.0), 1.0, Surface::Runoff);
        let weights = RewardWeights::default();
        let r = compute_reward(&prev, &curr, true, &weights, CAR_MAX_SPEED, None);
        assert!(r.wall < 0.0);
        assert!(r.off_track < 0.0);
        assert!(r.backward < 0.0);
        assert!(r.stillness < 0.0);
        assert!(r.speed >= 0.0);
        assert_eq!(r.total, sum(&r));
    }

    #[test]
    fn test_wall_term_depends_only_on_contact() {
        let weights = RewardWeights::default();
        let cases = [
            (DVec2::new(100.0, 0.0), DVec2::new(110.0, 0.0), 0.0, Surface::Road),
            (DVec2::new(110.0, 0.0), DVec2::new(100.0, 0.0), 1.0, Surface::Runoff),
            (DVec2::new(2.0, 0.0), DVec2::new(0.0, 2.0), CAR_MAX_SPEED, Surface::Shoulder),
        ];
        for (from, to, speed, surface) in cases {
            let prev = world_at(from, speed, surface);
            let curr = world_at(to, speed, surface);
            let hit = compute_reward(&prev, &curr, true, &weights, CAR_MAX_SPEED, None);
            let clear = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, None);
            assert_eq!(hit.wall, weights.wall_penalty);
            assert_eq!(clear.wall, 0.0);
            let without_wall = RewardBreakdown {
                wall: 0.0,
                total: clear.total,
                ..hit
            };
            assert_eq!(without_wall, clear);
        }
    }

    #[test]
    fn test_speed_bonus_scales_with_speed() {
        let weights = RewardWeights::default();
        let prev = world_at(DVec2::new(100.0, 0.0), 0.0, Surface::Road);
        let curr = world_at(DVec2::new(100.0, 0.0), CAR_MAX_SPEED / 2.0, Surface::Road);
        let r = compute_reward(&prev, &curr, false, &weights, CAR_MAX_SPEED, None);
        assert!((r.speed - weights.speed_bonus / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrapped_delta() {
        assert_eq!(wrapped_arc_delta(998.0, 2.0, 1000.0), 4.0);
        assert_eq!(wrapped_arc_delta(2.0, 998.0, 1000.0), -4.0);
        assert_eq!(wrapped_arc_delta(100.0, 400.0, 1000.0), 300.0);
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_of_components(
            prev_arc in 0.0f64..1000.0,
            curr_arc in 0.0f64..1000.0,
            speed in 0.0f64..400.0,
            wall_contact in any::<bool>(),
            surface_index in 0usize..3,
            progress_weight in -500.0f64..500.0,
            wall_penalty in -1.0f64..0.0,
        ) {
            let surface = Surface::ALL[surface_index];
            let prev = world_at(DVec2::new(100.0, 0.0), speed, surface);
            let curr = world_at(DVec2::new(120.0, 0.0), speed, surface);
            let weights = RewardWeights {
                progress: progress_weight,
                wall_penalty,
                ..RewardWeights::default()
            };
            let pair = ArcLengthPair { prev: prev_arc, curr: curr_arc };
            let r = compute_reward(&prev, &curr, wall_contact, &weights, CAR_MAX_SPEED, Some(pair));
            prop_assert!((r.total - sum(&r)).abs() <= 1e-12 * (1.0 + sum(&r).abs()));
            prop_assert_eq!(r.backward != 0.0, wrapped_arc_delta(prev_arc, curr_arc, 1000.0) < 0.0);
            prop_assert_eq!(r.wall, if wall_contact { weights.wall_penalty } else { 0.0 });
        }
    }
}
