//! Scatter job specification and run report.
//!
//! A job names a target mesh file and the scatter parameters; running it
//! builds an in-memory scene, performs one invocation and produces a
//! [`ScatterReport`] written as JSON next to (or instead of) console output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::engine::{ScatterEngine, ScatterOutcome, ScatterState};
use crate::instance::Instance;
use crate::mesh_asset::MeshAsset;
use crate::params::{ScaleRange, ScatterParams};
use crate::sampler::SeedPolicy;
use crate::scene::{NodeId, NodeKind, SceneError, SelectionItem};
use crate::scene_graph::SceneGraph;
use crate::selection::ScatterMode;

fn default_source_name() -> String {
    "source".to_string()
}

fn default_mode() -> ScatterMode {
    ScatterMode::VertexPlacement
}

fn default_scale() -> f64 {
    1.0
}

/// Errors loading, validating or running a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse job file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to load mesh {path:?}: {message}")]
    Mesh { path: PathBuf, message: String },

    #[error("invalid job: {0}")]
    Invalid(String),

    #[error("failed to build scene: {0}")]
    Scene(#[from] SceneError),

    #[error("failed to write report: {0}")]
    Report(String),
}

/// Specification for one scatter run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterJobSpec {
    /// OBJ file of the target mesh. Relative paths in a job file are
    /// resolved against the job file's directory.
    pub target_path: PathBuf,

    /// Optional OBJ file giving the source object geometry. Without it the
    /// source is an empty transform.
    #[serde(default)]
    pub source_path: Option<PathBuf>,

    /// Name of the source object in the scene.
    #[serde(default = "default_source_name")]
    pub source_name: String,

    #[serde(default = "default_mode")]
    pub mode: ScatterMode,

    #[serde(default = "default_scale")]
    pub scale_min: f64,

    #[serde(default = "default_scale")]
    pub scale_max: f64,

    /// Fixed seed for a reproducible layout. None seeds from the clock.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Vertex indices of the target to use, 0-based in the order of the
    /// OBJ file's `v` lines. None selects the whole mesh.
    #[serde(default)]
    pub vertices: Option<Vec<usize>>,

    /// Face indices of the target to use, 0-based in the order of the
    /// OBJ file's `f` lines. None selects the whole mesh.
    #[serde(default)]
    pub faces: Option<Vec<usize>>,

    /// Where to write the report. None prints only a summary.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl ScatterJobSpec {
    pub fn new(target_path: PathBuf) -> Self {
        Self {
            target_path,
            source_path: None,
            source_name: default_source_name(),
            mode: default_mode(),
            scale_min: default_scale(),
            scale_max: default_scale(),
            seed: None,
            vertices: None,
            faces: None,
            report_path: None,
        }
    }

    /// Load a job file. Relative mesh and report paths are taken relative
    /// to the directory holding the job file.
    pub fn from_file(path: &Path) -> Result<Self, JobError> {
        let content = std::fs::read_to_string(path).map_err(|source| JobError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut spec: Self = serde_json::from_str(&content).map_err(|source| JobError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            spec.resolve_relative_to(base);
        }
        Ok(spec)
    }

    /// Rebase relative paths onto `base`. Absolute paths are left alone.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.target_path);
        if let Some(p) = self.source_path.as_mut() {
            rebase(p);
        }
        if let Some(p) = self.report_path.as_mut() {
            rebase(p);
        }
    }

    /// Check the parameters. File existence is checked separately by
    /// [`Self::validate_paths`].
    pub fn validate(&self) -> Result<(), JobError> {
        if self.source_name.trim().is_empty() {
            return Err(JobError::Invalid("source name cannot be empty".to_string()));
        }
        if self.source_name.contains('#') {
            return Err(JobError::Invalid("source name cannot contain '#'".to_string()));
        }
        ScaleRange::new(self.scale_min, self.scale_max)
            .map_err(|e| JobError::Invalid(e.to_string()))?;
        match self.mode {
            ScatterMode::VertexPlacement if self.faces.is_some() => Err(JobError::Invalid(
                "face indices are only used by explode mode".to_string(),
            )),
            ScatterMode::Explode if self.vertices.is_some() => Err(JobError::Invalid(
                "vertex indices are only used by vertex placement mode".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn validate_paths(&self) -> Result<(), JobError> {
        if !self.target_path.exists() {
            return Err(JobError::Invalid(format!(
                "target mesh not found: {:?}",
                self.target_path
            )));
        }
        if let Some(source) = &self.source_path {
            if !source.exists() {
                return Err(JobError::Invalid(format!("source mesh not found: {:?}", source)));
            }
        }
        Ok(())
    }

    pub fn params(&self) -> ScatterParams {
        ScatterParams::new(self.scale_min, self.scale_max)
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        SeedPolicy::from_option(self.seed)
    }

    /// Build the scene for this job: source node first in the selection,
    /// followed by the target (whole or as components).
    pub fn build_scene(
        &self,
        target: MeshAsset,
        source: Option<MeshAsset>,
    ) -> Result<(SceneGraph, NodeId), JobError> {
        let mut scene = SceneGraph::new();

        let source_id = match source {
            Some(mesh) => scene.add_mesh(&self.source_name, mesh)?,
            None => scene.add_node(&self.source_name, NodeKind::Transform)?,
        };
        let target_name = if target.id.is_empty() {
            "target".to_string()
        } else {
            target.id.clone()
        };
        let target_id = scene.add_mesh(&target_name, target)?;

        let target_item = match (&self.vertices, &self.faces) {
            (Some(indices), _) => SelectionItem::Vertices {
                node: target_id,
                indices: indices.clone(),
            },
            (None, Some(indices)) => SelectionItem::Faces {
                node: target_id,
                indices: indices.clone(),
            },
            (None, None) => SelectionItem::Node(target_id),
        };
        scene.select(vec![SelectionItem::Node(source_id), target_item]);

        Ok((scene, source_id))
    }

    /// Load the meshes, run the scatter and return the report.
    pub fn execute(&self) -> Result<ScatterReport, JobError> {
        self.validate()?;
        self.validate_paths()?;

        let started_at = Utc::now();
        let target = load_mesh(&self.target_path)?;
        let source = self.source_path.as_deref().map(load_mesh).transpose()?;
        let (mut scene, _) = self.build_scene(target, source)?;

        let mut engine = ScatterEngine::new(self.seed_policy());
        let outcome = engine.run(&mut scene, self.mode, &self.params());
        let completed_at = Utc::now();

        let target_hash = ScatterReport::hash_file(&self.target_path).map_err(|source| JobError::Read {
            path: self.target_path.clone(),
            source,
        })?;

        Ok(ScatterReport::new(self.clone(), outcome, started_at, completed_at, target_hash))
    }
}

fn load_mesh(path: &Path) -> Result<MeshAsset, JobError> {
    let content = std::fs::read_to_string(path).map_err(|source| JobError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    MeshAsset::from_obj(id, &content).map_err(|message| JobError::Mesh {
        path: path.to_path_buf(),
        message,
    })
}

/// Record of a completed (or failed) scatter run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterReport {
    pub job: ScatterJobSpec,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub seed: u64,
    pub state: ScatterState,
    pub requested: usize,
    pub created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub instances: Vec<Instance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// SHA-256 of the target mesh file.
    pub target_hash: String,
    pub scatter_version: String,
}

impl ScatterReport {
    pub fn new(
        job: ScatterJobSpec,
        outcome: ScatterOutcome,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        target_hash: String,
    ) -> Self {
        Self {
            job,
            started_at,
            completed_at,
            seed: outcome.seed,
            state: outcome.state,
            requested: outcome.requested,
            created: outcome.instances.len(),
            group_name: outcome.group.map(|g| g.name),
            instances: outcome.instances,
            error: outcome.error.map(|e| e.to_string()),
            target_hash,
            scatter_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ScatterState::Done
    }

    /// SHA-256 of a file's content, hex encoded.
    pub fn hash_file(path: &Path) -> Result<String, std::io::Error> {
        use std::io::Read;

        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn save(&self, path: &Path) -> Result<(), JobError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| JobError::Report(format!("failed to serialize report: {}", e)))?;
        std::fs::write(path, json).map_err(|e| JobError::Report(format!("{:?}: {}", path, e)))
    }
}
