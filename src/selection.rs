//! Selection resolution.
//!
//! Turns the host's ordered selection into a source object and the list of
//! target points to scatter onto. Reads only; never mutates the scene.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::ScatterError;
use crate::scene::{NodeId, SceneMeshService, SelectionItem};

/// Which placement samples a scatter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScatterMode {
    /// One instance per selected mesh vertex.
    VertexPlacement,
    /// One instance per selected face, placed at its centroid.
    Explode,
}

impl ScatterMode {
    /// Name of the samples this mode consumes.
    pub fn sample_name(&self) -> &'static str {
        match self {
            ScatterMode::VertexPlacement => "vertices",
            ScatterMode::Explode => "faces",
        }
    }
}

impl std::fmt::Display for ScatterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScatterMode::VertexPlacement => write!(f, "vertex placement"),
            ScatterMode::Explode => write!(f, "explode"),
        }
    }
}

/// The node used as the instancing template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceObject {
    pub id: NodeId,
    pub name: String,
}

/// A position an instance will be placed at.
pub type TargetPoint = DVec3;

/// Resolves the host selection for one scatter mode.
#[derive(Debug, Clone, Copy)]
pub struct SelectionResolver {
    mode: ScatterMode,
}

impl SelectionResolver {
    pub fn new(mode: ScatterMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ScatterMode {
        self.mode
    }

    /// Resolve the source object and target points.
    ///
    /// The first selected item is the source. Component items anywhere in the
    /// selection contribute their components; whole nodes after the first
    /// contribute all of their vertices (or faces).
    pub fn resolve<S>(&self, scene: &S) -> Result<(SourceObject, Vec<TargetPoint>), ScatterError>
    where
        S: SceneMeshService + ?Sized,
    {
        let selection = scene.ordered_selection();
        let first = selection.first().ok_or(ScatterError::EmptySelection)?;

        let source = Self::source_from(scene, first)?;

        let targets: Vec<SelectionItem> = selection
            .iter()
            .enumerate()
            .filter(|(i, item)| item.is_component() || *i > 0)
            .map(|(_, item)| item.clone())
            .collect();

        let points = match self.mode {
            ScatterMode::VertexPlacement => scene.expand_to_vertices(&targets),
            ScatterMode::Explode => scene.expand_to_faces(&targets),
        };

        if points.is_empty() {
            return Err(ScatterError::NoTargetPoints {
                samples: self.mode.sample_name(),
            });
        }

        log::debug!(
            "Resolved source '{}' with {} target {}",
            source.name,
            points.len(),
            self.mode.sample_name()
        );

        Ok((source, points))
    }

    fn source_from<S>(scene: &S, item: &SelectionItem) -> Result<SourceObject, ScatterError>
    where
        S: SceneMeshService + ?Sized,
    {
        let id = item.node();
        let name = scene
            .node_name(id)
            .ok_or_else(|| ScatterError::invalid_source(id.to_string(), None))?;

        if item.is_component() {
            return Err(ScatterError::invalid_source(name, None));
        }

        match scene.node_kind(id) {
            Some(kind) if kind.is_transform() => Ok(SourceObject { id, name }),
            kind => Err(ScatterError::invalid_source(name, kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_asset::MeshAsset;
    use crate::scene::NodeKind;
    use crate::scene_graph::SceneGraph;

    fn square() -> MeshAsset {
        MeshAsset::new(
            "square",
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_empty_selection() {
        let scene = SceneGraph::new();
        let err = SelectionResolver::new(ScatterMode::VertexPlacement)
            .resolve(&scene)
            .unwrap_err();
        assert_eq!(err, ScatterError::EmptySelection);
    }

    #[test]
    fn test_non_transform_source() {
        let mut scene = SceneGraph::new();
        let light = scene.add_node("key_light", NodeKind::Light).unwrap();
        let ground = scene.add_mesh("ground", square()).unwrap();
        scene.select(vec![SelectionItem::Node(light), SelectionItem::Node(ground)]);

        let err = SelectionResolver::new(ScatterMode::VertexPlacement)
            .resolve(&scene)
            .unwrap_err();
        assert!(matches!(err, ScatterError::InvalidSourceType { ref name, .. } if name == "key_light"));
    }

    #[test]
    fn test_component_first_is_not_a_source() {
        let mut scene = SceneGraph::new();
        let ground = scene.add_mesh("ground", square()).unwrap();
        scene.select(vec![SelectionItem::Vertices {
            node: ground,
            indices: vec![0],
        }]);

        let err = SelectionResolver::new(ScatterMode::VertexPlacement)
            .resolve(&scene)
            .unwrap_err();
        assert!(matches!(err, ScatterError::InvalidSourceType { .. }));
    }

    #[test]
    fn test_source_alone_has_no_targets() {
        let mut scene = SceneGraph::new();
        let rock = scene.add_mesh("rock", square()).unwrap();
        scene.select(vec![SelectionItem::Node(rock)]);

        let err = SelectionResolver::new(ScatterMode::VertexPlacement)
            .resolve(&scene)
            .unwrap_err();
        assert_eq!(err, ScatterError::NoTargetPoints { samples: "vertices" });
    }

    #[test]
    fn test_own_vertices_as_targets() {
        let mut scene = SceneGraph::new();
        let rock = scene.add_mesh("rock", square()).unwrap();
        scene.select(vec![
            SelectionItem::Node(rock),
            SelectionItem::Vertices {
                node: rock,
                indices: vec![3, 1],
            },
        ]);

        let (source, points) = SelectionResolver::new(ScatterMode::VertexPlacement)
            .resolve(&scene)
            .unwrap();
        assert_eq!(source.name, "rock");
        assert_eq!(points, vec![DVec3::new(0.0, 1.0, 0.0), DVec3::new(1.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_explode_uses_face_centroids() {
        let mut scene = SceneGraph::new();
        let rock = scene.add_mesh("rock", square()).unwrap();
        let ground = scene.add_mesh("ground", square()).unwrap();
        scene.select(vec![SelectionItem::Node(rock), SelectionItem::Node(ground)]);

        let (_, points) = SelectionResolver::new(ScatterMode::Explode)
            .resolve(&scene)
            .unwrap();
        assert_eq!(points, vec![DVec3::new(0.5, 0.5, 0.0)]);
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let mut scene = SceneGraph::new();
        let rock = scene.add_mesh("rock", square()).unwrap();
        let ground = scene.add_mesh("ground", square()).unwrap();
        scene.select(vec![SelectionItem::Node(rock), SelectionItem::Node(ground)]);

        SelectionResolver::new(ScatterMode::VertexPlacement)
            .resolve(&scene)
            .unwrap();
        assert_eq!(scene.mutation_count(), 0);
    }
}
