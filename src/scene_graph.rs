//! In-memory scene graph.
//!
//! A self-contained host implementing [`SceneMeshService`]. It backs the
//! command-line tool and the test suite: nodes carry a transform, optional
//! mesh geometry, visibility and a parent link, and every mutation made
//! through the service is appended to a journal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{DAffine3, DQuat, DVec3, EulerRot};

use crate::mesh_asset::{BoundingBox, MeshAsset};
use crate::scene::{NodeId, NodeKind, SceneError, SceneMeshService, SelectionItem};

/// Local transform of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: DVec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation: DVec3,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    pub fn to_affine(&self) -> DAffine3 {
        let r = self.rotation * (std::f64::consts::PI / 180.0);
        let rotation = DQuat::from_euler(EulerRot::ZYX, r.z, r.y, r.x);
        DAffine3::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// A node in the scene.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    /// Pivot offset relative to the node's origin.
    pub pivot: DVec3,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Geometry, shared between a node and its instances.
    pub mesh: Option<Arc<MeshAsset>>,
    /// The node this one was instanced from.
    pub instance_of: Option<NodeId>,
}

impl SceneNode {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            transform: Transform::default(),
            visible: true,
            pivot: DVec3::ZERO,
            parent: None,
            children: Vec::new(),
            mesh: None,
            instance_of: None,
        }
    }
}

/// A scene mutation recorded by the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOp {
    CreateGroup(NodeId),
    Instance { source: NodeId, instance: NodeId },
    CenterPivot(NodeId),
    Parent { child: NodeId, parent: NodeId },
    Rotate(NodeId),
    Scale(NodeId),
    Move(NodeId),
    Hide(NodeId),
}

/// The in-memory scene.
#[derive(Debug)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, SceneNode>,
    names: HashMap<String, NodeId>,
    selection: Vec<SelectionItem>,
    journal: Vec<SceneOp>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            names: HashMap::new(),
            selection: Vec::new(),
            journal: Vec::new(),
            next_id: 1,
        }
    }

    fn new_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Resolve a name template to a unique node name.
    ///
    /// A trailing `#` is replaced by the smallest positive integer giving an
    /// unused name. Without `#`, the name is used as-is when free and gets a
    /// numeric suffix otherwise.
    pub fn unique_name(&self, template: &str) -> Result<String, SceneError> {
        let (base, numbered) = match template.strip_suffix('#') {
            Some(base) => (base, true),
            None => (template, false),
        };
        if base.is_empty() || base.contains('#') {
            return Err(SceneError::InvalidName(template.to_string()));
        }

        if !numbered && !self.names.contains_key(base) {
            return Ok(base.to_string());
        }

        let mut n = 1u64;
        loop {
            let candidate = format!("{}{}", base, n);
            if !self.names.contains_key(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn insert_node(&mut self, node: SceneNode) -> NodeId {
        let id = self.new_id();
        self.names.insert(node.name.clone(), id);
        self.nodes.insert(id, node);
        id
    }

    /// Add a plain node. Setup helper, not journaled.
    pub fn add_node(&mut self, name_template: &str, kind: NodeKind) -> Result<NodeId, SceneError> {
        let name = self.unique_name(name_template)?;
        Ok(self.insert_node(SceneNode::new(name, kind)))
    }

    /// Add a transform node carrying mesh geometry. Setup helper, not journaled.
    pub fn add_mesh(&mut self, name_template: &str, mesh: MeshAsset) -> Result<NodeId, SceneError> {
        let name = self.unique_name(name_template)?;
        let mut node = SceneNode::new(name, NodeKind::Transform);
        node.mesh = Some(Arc::new(mesh));
        Ok(self.insert_node(node))
    }

    /// Delete a node and detach its children. Not journaled; models a user
    /// deleting something outside of a scatter invocation.
    pub fn delete(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        self.names.remove(&node.name);
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|&c| c != id);
        }
        for child in node.children {
            if let Some(child) = self.nodes.get_mut(&child) {
                child.parent = None;
            }
        }
        self.selection.retain(|item| item.node() != id);
        true
    }

    /// Replace the current selection.
    pub fn select(&mut self, items: Vec<SelectionItem>) {
        self.selection = items;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All mutations made through [`SceneMeshService`], oldest first.
    pub fn journal(&self) -> &[SceneOp] {
        &self.journal
    }

    pub fn mutation_count(&self) -> usize {
        self.journal.len()
    }

    /// World-space transform of a node, composed through its parents.
    pub fn world_transform(&self, id: NodeId) -> Option<DAffine3> {
        let node = self.nodes.get(&id)?;
        let local = node.transform.to_affine();
        match node.parent {
            Some(parent) => Some(self.world_transform(parent)? * local),
            None => Some(local),
        }
    }

    fn node_ref(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))
    }

    fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = self.nodes.get(&of).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// World-space samples for selection items. `pick` returns the
    /// object-space points for a mesh and an optional component subset.
    fn expand<F>(&self, items: &[SelectionItem], pick: F) -> Vec<DVec3>
    where
        F: Fn(&MeshAsset, &SelectionItem) -> Vec<(usize, DVec3)>,
    {
        let mut seen = HashSet::new();
        let mut points = Vec::new();

        for item in items {
            let id = item.node();
            let Some(mesh) = self.nodes.get(&id).and_then(|n| n.mesh.as_ref()) else {
                continue;
            };
            let Some(world) = self.world_transform(id) else {
                continue;
            };

            for (index, local) in pick(mesh, item) {
                if seen.insert((id, index)) {
                    points.push(world.transform_point3(local));
                }
            }
        }

        points
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneMeshService for SceneGraph {
    fn ordered_selection(&self) -> Vec<SelectionItem> {
        self.selection.clone()
    }

    fn node_name(&self, id: NodeId) -> Option<String> {
        self.nodes.get(&id).map(|n| n.name.clone())
    }

    fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| n.kind)
    }

    /// Whole nodes expand to all their vertices, vertex components to the
    /// listed vertices. Face components contribute nothing. Each vertex is
    /// reported once.
    fn expand_to_vertices(&self, items: &[SelectionItem]) -> Vec<DVec3> {
        self.expand(items, |mesh, item| match item {
            SelectionItem::Node(_) => mesh.positions.iter().copied().enumerate().collect(),
            SelectionItem::Vertices { indices, .. } => indices
                .iter()
                .filter_map(|&i| mesh.positions.get(i).map(|p| (i, *p)))
                .collect(),
            SelectionItem::Faces { .. } => Vec::new(),
        })
    }

    /// Whole nodes expand to all face centroids, face components to the listed
    /// faces. Vertex components contribute nothing.
    fn expand_to_faces(&self, items: &[SelectionItem]) -> Vec<DVec3> {
        self.expand(items, |mesh, item| match item {
            SelectionItem::Node(_) => (0..mesh.face_count())
                .filter_map(|i| mesh.face_centroid(i).map(|c| (i, c)))
                .collect(),
            SelectionItem::Faces { indices, .. } => indices
                .iter()
                .filter_map(|&i| mesh.face_centroid(i).map(|c| (i, c)))
                .collect(),
            SelectionItem::Vertices { .. } => Vec::new(),
        })
    }

    fn instance(&mut self, source: NodeId, name_template: &str) -> Result<NodeId, SceneError> {
        let src = self.node_ref(source)?;
        if !src.kind.is_transform() {
            return Err(SceneError::NotInstanceable {
                node: source,
                kind: src.kind,
            });
        }

        let mut node = SceneNode::new(self.unique_name(name_template)?, NodeKind::Transform);
        node.transform = src.transform.clone();
        node.mesh = src.mesh.clone();
        node.instance_of = Some(source);

        let id = self.insert_node(node);
        self.journal.push(SceneOp::Instance {
            source,
            instance: id,
        });
        Ok(id)
    }

    fn create_group(&mut self, name_template: &str) -> Result<NodeId, SceneError> {
        let name = self.unique_name(name_template)?;
        let id = self.insert_node(SceneNode::new(name, NodeKind::Transform));
        self.journal.push(SceneOp::CreateGroup(id));
        Ok(id)
    }

    /// Moves the pivot to the bounding-box center of the children's positions.
    fn center_pivot(&mut self, id: NodeId) -> Result<(), SceneError> {
        let positions: Vec<DVec3> = self
            .node_ref(id)?
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .map(|c| c.transform.position)
            .collect();
        let center = BoundingBox::from_points(&positions).center();

        self.node_mut(id)?.pivot = center;
        self.journal.push(SceneOp::CenterPivot(id));
        Ok(())
    }

    fn parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), SceneError> {
        self.node_ref(child)?;
        self.node_ref(parent)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(SceneError::Refused(format!(
                "parenting {} under {} would create a cycle",
                child, parent
            )));
        }

        let old_parent = self.node_mut(child)?.parent.replace(parent);
        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(&p)) {
            old.children.retain(|&c| c != child);
        }
        self.node_mut(parent)?.children.push(child);
        self.journal.push(SceneOp::Parent { child, parent });
        Ok(())
    }

    fn rotate(&mut self, id: NodeId, degrees: DVec3) -> Result<(), SceneError> {
        self.node_mut(id)?.transform.rotation = degrees;
        self.journal.push(SceneOp::Rotate(id));
        Ok(())
    }

    fn scale(&mut self, id: NodeId, scale: DVec3) -> Result<(), SceneError> {
        self.node_mut(id)?.transform.scale = scale;
        self.journal.push(SceneOp::Scale(id));
        Ok(())
    }

    fn move_to(&mut self, id: NodeId, position: DVec3) -> Result<(), SceneError> {
        self.node_mut(id)?.transform.position = position;
        self.journal.push(SceneOp::Move(id));
        Ok(())
    }

    fn hide(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.node_mut(id)?.visible = false;
        self.journal.push(SceneOp::Hide(id));
        Ok(())
    }
}
