//! Procedural ski-run generation: a noise-driven path spine, a lazily
//! extended jump schedule, canyon terrain sampling and obstacle scatter.

mod async_generation;
mod jumps;
mod noise_source;
mod obstacles;
mod path;
mod ride;
mod sampler;
mod surface;

pub mod debug_viz;
pub mod seed;

pub use async_generation::{CompletedChunk, RideWorker, Ticket, WorkerError};
pub use jumps::{JumpOffset, JumpParams, JumpRamp, JumpScheduler, ramp_profile};
pub use noise_source::{NoiseSource, SimplexNoise};
pub use obstacles::{
    BucketCapacity, DeadTreeBand, NoiseBand, ObstacleKind, ObstacleParams, ObstaclePlacement,
    ObstaclePlanner, ObstacleTransform, ObstacleZone, SizeProportions, SurfaceRules, TreeScale,
    TreeScales, TreeSize, TypeProportions,
};
pub use path::{PathParams, PathPoint, PathSpineGenerator, TailContext, nearest_path_point};
pub use ride::{GeneratedChunk, RideConfig, RideParams, RideSession};
pub use sampler::{TerrainParams, TerrainSample, TerrainSampler};
pub use surface::SurfaceKind;
