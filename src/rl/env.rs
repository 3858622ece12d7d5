//! Episode controller
//!
//! `RacerEnv` wraps the simulation in a reset/step interface. It is the only
//! stateful piece of the crate: it owns the current world snapshot, the step
//! and stillness counters and the cached track progress of the last tick.
//!
//! An environment is either not reset (no episode) or active. Termination or
//! truncation ends the episode, and further steps fail until the next reset.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::observation::{Observation, build_observation};
use super::reward::{ArcLengthPair, RewardBreakdown, compute_reward};
use crate::config::EnvConfig;
use crate::consts::SIM_DT;
use crate::error::{EnvError, EnvResult};
use crate::sim::{
    CarInput, TrackProgress, TrackState, WorldState, WorldStep, advance_world, cast_rays,
    create_world, detect_wall_collision, load_track,
};

/// Raw agent action: steer, throttle, brake
pub type Action = [f64; 3];

/// Diagnostic scalars keyed by name, for logging only
pub type Info = BTreeMap<String, f64>;

/// Result of one `step` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// Episode ended on a failure condition (car stood still too long)
    pub terminated: bool,
    /// Episode hit the step limit
    pub truncated: bool,
    pub info: Info,
    pub breakdown: RewardBreakdown,
}

impl StepResult {
    /// Either flag set; the caller must reset before stepping again
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Mutable state of one running episode
#[derive(Debug, Clone)]
struct Episode {
    world: WorldState,
    step_count: u64,
    stillness_ticks: u64,
    /// Progress of the car on the latest tick
    progress: TrackProgress,
}

/// Episodic RL environment around one track
#[derive(Debug)]
pub struct RacerEnv {
    config: EnvConfig,
    track: Arc<TrackState>,
    episode: Option<Episode>,
}

impl RacerEnv {
    /// Validate `config` and build its track from the registry
    pub fn new(config: EnvConfig) -> EnvResult<Self> {
        config.validate()?;
        let track = load_track(&config.track_id, config.checkpoint_count, &config.track)?;
        log::info!(
            "Loaded track {} ({:.0} units, {} checkpoints)",
            config.track_id,
            track.total_length,
            track.checkpoints.len()
        );
        Ok(Self {
            config,
            track: Arc::new(track),
            episode: None,
        })
    }

    /// Environment on an already-built track, shared with other environments
    pub fn with_track(config: EnvConfig, track: Arc<TrackState>) -> EnvResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            track,
            episode: None,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn track(&self) -> &Arc<TrackState> {
        &self.track
    }

    /// Length of every observation this environment produces
    pub fn observation_len(&self) -> usize {
        self.config.observation.observation_len()
    }

    /// Whether an episode is running
    pub fn is_active(&self) -> bool {
        self.episode.is_some()
    }

    /// Start a new episode with the car at rest on the start line
    pub fn reset(&mut self) -> (Observation, Info) {
        let world = create_world(Arc::clone(&self.track));
        let progress = self.track.progress(world.car.position);
        let episode = Episode {
            world,
            step_count: 0,
            stillness_ticks: 0,
            progress,
        };

        let observation = self.observe(&episode.world, progress);
        let info = base_info(&episode);
        log::info!("Episode reset on {}", self.config.track_id);
        self.episode = Some(episode);
        (observation, info)
    }

    /// Advance the episode by one tick.
    ///
    /// Fails with [`EnvError::NotReset`] when no episode is running, and with
    /// [`EnvError::InvalidAction`] when `action` is not three finite numbers.
    /// A failed call leaves the episode untouched.
    pub fn step(&mut self, action: &[f64]) -> EnvResult<StepResult> {
        let Some(episode) = self.episode.as_ref() else {
            return Err(EnvError::NotReset);
        };
        let input = parse_action(action)?;

        let config = &self.config;
        let track = &self.track;
        let WorldStep { world, progress } = advance_world(
            &episode.world,
            &input,
            &config.car,
            &config.collision,
            SIM_DT,
            Some(episode.progress.arc_length),
        );

        // Resolution already pushed the car clear of the wall, so look a
        // little further out to still see the contact
        let contact_radius = config.car.radius + config.collision.contact_padding;
        let wall_contact =
            detect_wall_collision(world.car.position, contact_radius, track).collided;

        let observation = self.observe(&world, progress);

        let arc_lengths = ArcLengthPair {
            prev: episode.progress.arc_length,
            curr: progress.arc_length,
        };
        let breakdown = compute_reward(
            &episode.world,
            &world,
            wall_contact,
            &config.reward,
            config.car.max_speed,
            Some(arc_lengths),
        );

        let stillness_ticks = if world.car.speed < config.reward.stillness_speed_threshold {
            episode.stillness_ticks + 1
        } else {
            0
        };
        let step_count = episode.step_count + 1;

        let terminated = stillness_ticks >= config.episode.stillness_timeout_ticks;
        let truncated = step_count >= config.episode.max_steps;

        let next = Episode {
            world,
            step_count,
            stillness_ticks,
            progress,
        };

        let mut info = base_info(&next);
        insert_breakdown(&mut info, &breakdown);
        info.insert("wall_contact".into(), if wall_contact { 1.0 } else { 0.0 });

        if terminated || truncated {
            log::info!(
                "Episode ended after {} steps (terminated: {}, truncated: {}, lap {})",
                step_count,
                terminated,
                truncated,
                next.world.timing.lap
            );
            self.episode = None;
        } else {
            self.episode = Some(next);
        }

        Ok(StepResult {
            observation,
            reward: breakdown.total,
            terminated,
            truncated,
            info,
            breakdown,
        })
    }

    fn observe(&self, world: &WorldState, progress: TrackProgress) -> Observation {
        let params = &self.config.observation;
        let rays = cast_rays(
            world.car.position,
            world.car.heading,
            &self.track,
            params.ray_count,
            params.ray_fov,
            params.ray_max_distance,
        );
        build_observation(
            &rays,
            &world.car,
            progress,
            self.track.total_length,
            self.config.car.max_speed,
            params,
        )
    }
}

/// Check arity and finiteness, then clamp into the input box
fn parse_action(action: &[f64]) -> EnvResult<CarInput> {
    let &[steer, throttle, brake] = action else {
        return Err(EnvError::invalid_action(format!(
            "expected 3 values (steer, throttle, brake), got {}",
            action.len()
        )));
    };
    if let Some(bad) = action.iter().find(|v| !v.is_finite()) {
        return Err(EnvError::invalid_action(format!(
            "action values must be finite, got {bad}"
        )));
    }
    Ok(CarInput::clamped(steer, throttle, brake))
}

fn base_info(episode: &Episode) -> Info {
    let world = &episode.world;
    let mut info = Info::new();
    info.insert("tick".into(), world.tick as f64);
    info.insert("speed".into(), world.car.speed);
    info.insert("lap".into(), world.timing.lap as f64);
    info.insert("checkpoint".into(), world.timing.last_checkpoint as f64);
    info.insert("step_count".into(), episode.step_count as f64);
    info
}

fn insert_breakdown(info: &mut Info, breakdown: &RewardBreakdown) {
    let entries = [
        ("reward_progress", breakdown.progress),
        ("reward_speed", breakdown.speed),
        ("reward_wall", breakdown.wall),
        ("reward_off_track", breakdown.off_track),
        ("reward_backward", breakdown.backward),
        ("reward_stillness", breakdown.stillness),
        ("reward_total", breakdown.total),
    ];
    for (key, value) in entries {
        info.insert(key.into(), value);
    }
}
