//! Reinforcement-learning surface
//!
//! - `reward`: pure per-tick reward with a full component breakdown
//! - `observation`: fixed-size normalized observation vector
//! - `env`: the reset/step episode controller

pub mod env;
pub mod observation;
pub mod reward;

pub use env::{Action, Info, RacerEnv, StepResult};
pub use observation::{KINEMATIC_FEATURES, Observation, ObservationParams, build_observation};
pub use reward::{ArcLengthPair, RewardBreakdown, RewardWeights, compute_reward};
