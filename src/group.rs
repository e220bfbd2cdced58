//! Instance group bookkeeping.

use serde::Serialize;

use crate::scene::{NodeId, SceneError, SceneMeshService};
use crate::selection::SourceObject;

/// Container node holding every instance from one scatter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceGroup {
    pub id: NodeId,
    pub name: String,
}

pub struct GroupManager;

impl GroupManager {
    pub fn name_template(source: &SourceObject) -> String {
        format!("{}_instance_grp#", source.name)
    }

    /// Create a fresh, empty group with a centered pivot.
    ///
    /// Groups from earlier invocations are never reused; the `#` suffix keeps
    /// each new group name unique.
    pub fn create_group<S>(scene: &mut S, source: &SourceObject) -> Result<InstanceGroup, SceneError>
    where
        S: SceneMeshService + ?Sized,
    {
        let id = scene.create_group(&Self::name_template(source))?;
        scene.center_pivot(id)?;

        let name = scene.node_name(id).ok_or(SceneError::NodeNotFound(id))?;
        log::debug!("Created instance group '{}'", name);
        Ok(InstanceGroup { id, name })
    }
}
