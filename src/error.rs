//! Error types for scatter operations.

use thiserror::Error;

use crate::scene::{NodeKind, SceneError};

/// A host refusal while creating a single instance.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("could not instance '{source_name}': {reason}")]
pub struct InstancingFailed {
    pub source_name: String,
    #[source]
    pub reason: SceneError,
}

/// Errors that end a scatter invocation.
///
/// All variants are terminal: nothing is retried. Every variant except
/// [`ScatterError::InstancingFailed`] and [`ScatterError::Scene`] is raised
/// before the scene is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScatterError {
    #[error("nothing is selected; select a source object followed by target vertices or faces")]
    EmptySelection,

    #[error("source '{name}' is a {kind}, expected a transform")]
    InvalidSourceType { name: String, kind: String },

    #[error("selection yields no {samples} to place instances on")]
    NoTargetPoints { samples: &'static str },

    #[error("invalid range [{low}, {high}]: {reason}")]
    InvalidRange {
        low: f64,
        high: f64,
        reason: &'static str,
    },

    #[error("instancing failed, {created} of {requested} created: {cause}")]
    InstancingFailed {
        created: usize,
        requested: usize,
        #[source]
        cause: InstancingFailed,
    },

    #[error("scene operation failed: {0}")]
    Scene(#[from] SceneError),
}

impl ScatterError {
    pub(crate) fn invalid_source(name: impl Into<String>, kind: Option<NodeKind>) -> Self {
        ScatterError::InvalidSourceType {
            name: name.into(),
            kind: kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "component selection".to_string()),
        }
    }

    /// Number of instances left in the scene when this error was raised.
    pub fn created_before_failure(&self) -> usize {
        match self {
            ScatterError::InstancingFailed { created, .. } => *created,
            _ => 0,
        }
    }
}
