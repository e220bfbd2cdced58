//! Host scene interface.
//!
//! The scatter core never touches a concrete scene graph. Everything it needs
//! from the host (selection queries, component expansion, instancing, parenting
//! and transform mutation) goes through [`SceneMeshService`], passed in
//! explicitly for every invocation.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host-assigned identifier for a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a scene node, as reported by host type introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Ownable, instanceable, movable node.
    Transform,
    /// Geometry shape living under a transform.
    Shape,
    /// Light source.
    Light,
}

impl NodeKind {
    /// Whether nodes of this kind can serve as an instancing template.
    pub fn is_transform(&self) -> bool {
        matches!(self, NodeKind::Transform)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Transform => write!(f, "transform"),
            NodeKind::Shape => write!(f, "shape"),
            NodeKind::Light => write!(f, "light"),
        }
    }
}

/// One entry of the host's ordered selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionItem {
    /// A whole node.
    Node(NodeId),
    /// Individual vertices of a mesh node.
    Vertices { node: NodeId, indices: Vec<usize> },
    /// Individual faces of a mesh node.
    Faces { node: NodeId, indices: Vec<usize> },
}

impl SelectionItem {
    /// The node this item refers to.
    pub fn node(&self) -> NodeId {
        match self {
            SelectionItem::Node(id) => *id,
            SelectionItem::Vertices { node, .. } => *node,
            SelectionItem::Faces { node, .. } => *node,
        }
    }

    pub fn is_component(&self) -> bool {
        !matches!(self, SelectionItem::Node(_))
    }
}

/// Errors reported by the host when a scene operation is refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("node {node} of kind {kind} cannot be instanced")]
    NotInstanceable { node: NodeId, kind: NodeKind },

    #[error("invalid node name template '{0}'")]
    InvalidName(String),

    #[error("host refused operation: {0}")]
    Refused(String),
}

/// Scene operations the scatter core needs from its host.
///
/// Transform mutations are absolute: `rotate` sets Euler angles in degrees,
/// `scale` sets per-axis scale, `move_to` sets the translation.
pub trait SceneMeshService {
    /// The current selection, in the order it was made.
    fn ordered_selection(&self) -> Vec<SelectionItem>;

    fn node_name(&self, id: NodeId) -> Option<String>;

    fn node_kind(&self, id: NodeId) -> Option<NodeKind>;

    /// Expand selection items to vertex positions, in host enumeration order.
    fn expand_to_vertices(&self, items: &[SelectionItem]) -> Vec<DVec3>;

    /// Expand selection items to face sample positions (face centroids).
    fn expand_to_faces(&self, items: &[SelectionItem]) -> Vec<DVec3>;

    /// Create an instance of `source`. A trailing `#` in `name_template` is
    /// replaced so the resulting name is unique.
    fn instance(&mut self, source: NodeId, name_template: &str) -> Result<NodeId, SceneError>;

    /// Create an empty container node. Naming follows [`Self::instance`].
    fn create_group(&mut self, name_template: &str) -> Result<NodeId, SceneError>;

    fn center_pivot(&mut self, id: NodeId) -> Result<(), SceneError>;

    fn parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), SceneError>;

    fn rotate(&mut self, id: NodeId, degrees: DVec3) -> Result<(), SceneError>;

    fn scale(&mut self, id: NodeId, scale: DVec3) -> Result<(), SceneError>;

    fn move_to(&mut self, id: NodeId, position: DVec3) -> Result<(), SceneError>;

    fn hide(&mut self, id: NodeId) -> Result<(), SceneError>;
}
