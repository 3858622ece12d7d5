//! Deterministic simulation module
//!
//! Track geometry, car physics, wall collision and lap timing. Everything in
//! here is pure and deterministic:
//! - Fixed timestep only
//! - Immutable snapshots in, new snapshots out
//! - No randomness and no I/O

pub mod car;
pub mod collision;
pub mod geometry;
pub mod raycast;
pub mod track;
pub mod tracks;
pub mod world;

pub use car::{CarInput, CarParams, CarState, PrevInput, step_car};
pub use collision::{
    CollisionParams, CollisionResult, detect_wall_collision, impact_severity,
    resolve_wall_collision,
};
pub use geometry::{SegmentProjection, point_to_segment_distance, segment_intersection};
pub use raycast::cast_rays;
pub use track::{Checkpoint, Surface, TrackParams, TrackProgress, TrackState, build_track};
pub use tracks::{control_points, load_track, track_ids};
pub use world::{TimingState, WorldState, WorldStep, advance_world, create_world, step_world};
