//! World snapshot and the fixed-tick world stepping function
//!
//! A `WorldState` is never mutated in place: `step_world` returns the next
//! snapshot and leaves the previous one intact for reward computation.

use std::sync::Arc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::car::{CarInput, CarParams, CarState, step_car};
use super::collision::{CollisionParams, detect_wall_collision, resolve_wall_collision};
use super::geometry::segment_intersection;
use super::track::{TrackProgress, TrackState};

/// Lap and checkpoint bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingState {
    /// Current lap, starting at 1
    pub lap: u32,
    /// Index of the most recently crossed checkpoint
    pub last_checkpoint: usize,
    /// Index of the gate that must be crossed next
    pub next_checkpoint: usize,
    /// Tick at which the current lap started
    pub lap_start_tick: u64,
    pub last_lap_ticks: Option<u64>,
    pub best_lap_ticks: Option<u64>,
}

impl TimingState {
    pub fn new(checkpoint_count: usize) -> Self {
        Self {
            lap: 1,
            last_checkpoint: 0,
            next_checkpoint: if checkpoint_count > 1 { 1 } else { 0 },
            lap_start_tick: 0,
            last_lap_ticks: None,
            best_lap_ticks: None,
        }
    }
}

/// Immutable per-tick snapshot of the simulation
#[derive(Debug, Clone)]
pub struct WorldState {
    pub tick: u64,
    pub car: CarState,
    pub track: Arc<TrackState>,
    pub timing: TimingState,
}

/// Fresh world with the car at rest on the start line
pub fn create_world(track: Arc<TrackState>) -> WorldState {
    let car = CarState::at_rest(track.start_position, track.start_heading);
    let timing = TimingState::new(track.checkpoints.len());
    WorldState {
        tick: 0,
        car,
        track,
        timing,
    }
}

/// A freshly stepped world plus the track progress computed for it
#[derive(Debug, Clone)]
pub struct WorldStep {
    pub world: WorldState,
    /// Progress of the car after the step; the surface was classified from it
    pub progress: TrackProgress,
}

/// Advance the world by one tick.
///
/// Steps the car, slides it out of any wall it hit, reclassifies the surface
/// under it and updates lap timing.
pub fn step_world(
    world: &WorldState,
    input: &CarInput,
    car_params: &CarParams,
    collision_params: &CollisionParams,
    dt: f64,
) -> WorldState {
    advance_world(world, input, car_params, collision_params, dt, None).world
}

/// Like [`step_world`], also returning the one track-progress query made for
/// the new car position.
///
/// With `hint_arc_length` the query searches near that arc length first (see
/// [`TrackState::progress_near`]); the result is the same either way.
pub fn advance_world(
    world: &WorldState,
    input: &CarInput,
    car_params: &CarParams,
    collision_params: &CollisionParams,
    dt: f64,
    hint_arc_length: Option<f64>,
) -> WorldStep {
    let track = &world.track;
    let moved = step_car(&world.car, input, car_params, dt);

    let collision = detect_wall_collision(moved.position, car_params.radius, track);
    let mut car = resolve_wall_collision(&moved, &collision, collision_params);
    if collision.collided {
        log::trace!(
            "tick {}: wall contact, penetration {:.2}",
            world.tick + 1,
            collision.penetration
        );
    }

    let progress = match hint_arc_length {
        Some(hint) => track.progress_near(car.position, hint),
        None => track.progress(car.position),
    };
    car.surface = track.surface_at(progress.distance);

    let tick = world.tick + 1;
    let timing = update_timing(&world.timing, track, world.car.position, car.position, tick);

    WorldStep {
        world: WorldState {
            tick,
            car,
            track: Arc::clone(&world.track),
            timing,
        },
        progress,
    }
}

/// Advance checkpoint/lap state for a car that moved from `from` to `to`
fn update_timing(
    timing: &TimingState,
    track: &TrackState,
    from: DVec2,
    to: DVec2,
    tick: u64,
) -> TimingState {
    let mut timing = timing.clone();
    let Some(gate) = track.checkpoints.get(timing.next_checkpoint) else {
        return timing;
    };
    // Leaving a gate the car is sitting on does not count as crossing it
    let crossed =
        segment_intersection(from, to, gate.left, gate.right).is_some_and(|(t, _)| t > 0.0);
    if !crossed {
        return timing;
    }

    let count = track.checkpoints.len();
    timing.last_checkpoint = gate.index;
    timing.next_checkpoint = (gate.index + 1) % count;

    if gate.index == 0 {
        let lap_ticks = tick - timing.lap_start_tick;
        timing.lap += 1;
        timing.lap_start_tick = tick;
        timing.last_lap_ticks = Some(lap_ticks);
        timing.best_lap_ticks = Some(
            timing
                .best_lap_ticks
                .map_or(lap_ticks, |best| best.min(lap_ticks)),
        );
        log::debug!("Lap {} complete in {} ticks", timing.lap - 1, lap_ticks);
    }

    timing
}
