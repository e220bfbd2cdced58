//! Scatter instanced copies of a source object across the vertices or faces
//! of a target mesh, with randomized rotation and scale.

pub mod scene;
pub mod scene_graph;
pub mod mesh_asset;

// Scatter core
pub mod error;
pub mod params;
pub mod sampler;
pub mod selection;
pub mod instance;
pub mod group;
pub mod engine;

pub mod job;
pub mod cli;

pub use engine::{ScatterEngine, ScatterOutcome, ScatterState, Trigger};
pub use error::{InstancingFailed, ScatterError};
pub use params::{ParameterSource, ScaleRange, ScatterParams};
pub use sampler::{RandomSampler, SeedPolicy, LEGACY_SEED};
pub use scene::{NodeId, NodeKind, SceneError, SceneMeshService, SelectionItem};
pub use selection::{ScatterMode, SelectionResolver, SourceObject, TargetPoint};
