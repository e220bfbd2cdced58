//! Instance creation.

use glam::DVec3;
use serde::Serialize;

use crate::error::{InstancingFailed, ScatterError};
use crate::group::InstanceGroup;
use crate::params::ScaleRange;
use crate::sampler::RandomSampler;
use crate::scene::{NodeId, SceneError, SceneMeshService};
use crate::selection::{SourceObject, TargetPoint};

/// Upper bound (exclusive) for each random rotation axis, in degrees.
pub const MAX_ROTATION_DEGREES: f64 = 360.0;

/// One created copy of the source object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub id: NodeId,
    pub name: String,
    /// Euler angles in degrees.
    pub rotation: DVec3,
    /// Uniform scale applied to all three axes.
    pub scale: f64,
    pub position: DVec3,
}

/// Creates instances of a source object with randomized rotation and scale.
pub struct InstanceFactory<'a> {
    sampler: &'a mut RandomSampler,
}

impl<'a> InstanceFactory<'a> {
    pub fn new(sampler: &'a mut RandomSampler) -> Self {
        Self { sampler }
    }

    /// Name template for instances of `source`.
    pub fn name_template(source: &SourceObject) -> String {
        format!("{}_instance#", source.name)
    }

    /// Create one instance at `target`, parented under `group`.
    ///
    /// Rotation and scale are drawn before the host is touched, so a host
    /// failure never changes the random sequence seen by later instances.
    /// Host call order: instance, parent, rotate, scale, move.
    pub fn create_instance<S>(
        &mut self,
        scene: &mut S,
        source: &SourceObject,
        target: TargetPoint,
        scale_range: &ScaleRange,
        group: &InstanceGroup,
    ) -> Result<Instance, InstancingFailed>
    where
        S: SceneMeshService + ?Sized,
    {
        let fail = |reason: SceneError| InstancingFailed {
            source_name: source.name.clone(),
            reason,
        };
        let sampled = |e: ScatterError| fail(SceneError::Refused(format!("sampling failed: {}", e)));

        let rotation = DVec3::new(
            self.sampler.uniform_angle(MAX_ROTATION_DEGREES).map_err(sampled)?,
            self.sampler.uniform_angle(MAX_ROTATION_DEGREES).map_err(sampled)?,
            self.sampler.uniform_angle(MAX_ROTATION_DEGREES).map_err(sampled)?,
        );
        let scale = self
            .sampler
            .uniform(scale_range.min(), scale_range.max())
            .map_err(sampled)?;

        let id = scene
            .instance(source.id, &Self::name_template(source))
            .map_err(fail)?;
        scene.parent(id, group.id).map_err(fail)?;
        scene.rotate(id, rotation).map_err(fail)?;
        scene.scale(id, DVec3::splat(scale)).map_err(fail)?;
        scene.move_to(id, target).map_err(fail)?;

        let name = scene.node_name(id).unwrap_or_else(|| id.to_string());
        log::trace!(
            "Placed '{}' at {:?} rot={:?} scale={:.4}",
            name,
            target,
            rotation,
            scale
        );

        Ok(Instance {
            id,
            name,
            rotation,
            scale,
            position: target,
        })
    }
}
