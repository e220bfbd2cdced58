//! End-to-end scatter behaviour against the in-memory scene.
//!
//! Run with: cargo test --test scatter_engine

use glam::DVec3;
use scatter::mesh_asset::MeshAsset;
use scatter::scene_graph::SceneGraph;
use scatter::{
    NodeId, NodeKind, ScatterEngine, ScatterError, ScatterMode, ScatterParams, ScatterState,
    SceneError, SceneMeshService, SelectionItem, SeedPolicy, LEGACY_SEED,
};

/// Host wrapper that refuses the n-th instancing call (1-based), and
/// optionally group creation or hiding.
struct FailingHost {
    inner: SceneGraph,
    fail_on: usize,
    calls: usize,
    refuse_group: bool,
    refuse_hide: bool,
}

impl FailingHost {
    fn new(inner: SceneGraph) -> Self {
        Self {
            inner,
            fail_on: 0,
            calls: 0,
            refuse_group: false,
            refuse_hide: false,
        }
    }
}

impl SceneMeshService for FailingHost {
    fn ordered_selection(&self) -> Vec<SelectionItem> {
        self.inner.ordered_selection()
    }

    fn node_name(&self, id: NodeId) -> Option<String> {
        self.inner.node_name(id)
    }

    fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.inner.node_kind(id)
    }

    fn expand_to_vertices(&self, items: &[SelectionItem]) -> Vec<DVec3> {
        self.inner.expand_to_vertices(items)
    }

    fn expand_to_faces(&self, items: &[SelectionItem]) -> Vec<DVec3> {
        self.inner.expand_to_faces(items)
    }

    fn instance(&mut self, source: NodeId, name_template: &str) -> Result<NodeId, SceneError> {
        self.calls += 1;
        if self.calls == self.fail_on {
            return Err(SceneError::Refused("source was deleted".to_string()));
        }
        self.inner.instance(source, name_template)
    }

    fn create_group(&mut self, name_template: &str) -> Result<NodeId, SceneError> {
        if self.refuse_group {
            return Err(SceneError::Refused("group creation locked".to_string()));
        }
        self.inner.create_group(name_template)
    }

    fn center_pivot(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.inner.center_pivot(id)
    }

    fn parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), SceneError> {
        self.inner.parent(child, parent)
    }

    fn rotate(&mut self, id: NodeId, degrees: DVec3) -> Result<(), SceneError> {
        self.inner.rotate(id, degrees)
    }

    fn scale(&mut self, id: NodeId, scale: DVec3) -> Result<(), SceneError> {
        self.inner.scale(id, scale)
    }

    fn move_to(&mut self, id: NodeId, position: DVec3) -> Result<(), SceneError> {
        self.inner.move_to(id, position)
    }

    fn hide(&mut self, id: NodeId) -> Result<(), SceneError> {
        if self.refuse_hide {
            return Err(SceneError::Refused("source is locked".to_string()));
        }
        self.inner.hide(id)
    }
}

fn line_mesh(n: usize) -> MeshAsset {
    let positions = (0..n)
        .map(|i| DVec3::new(i as f64, (i * i) as f64, -(i as f64)))
        .collect();
    MeshAsset::new("line", positions, vec![])
}

fn cube_mesh() -> MeshAsset {
    let obj = "\
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 1 2 3 4
f 5 8 7 6
f 1 5 6 2
f 2 6 7 3
f 3 7 8 4
f 5 1 4 8
";
    MeshAsset::from_obj("cube", obj).unwrap()
}

/// Source node followed by a whole target mesh in the selection.
fn scene_with(target: MeshAsset) -> (SceneGraph, NodeId, NodeId) {
    let mut scene = SceneGraph::new();
    let source = scene.add_node("pebble", NodeKind::Transform).unwrap();
    let ground = scene.add_mesh("ground", target).unwrap();
    scene.select(vec![SelectionItem::Node(source), SelectionItem::Node(ground)]);
    (scene, source, ground)
}

#[test]
fn vertex_placement_respects_bounds_for_many_sizes() {
    for n in [1usize, 2, 7, 50] {
        let (mut scene, _, _) = scene_with(line_mesh(n));
        let mut engine = ScatterEngine::reproducible(LEGACY_SEED);

        let outcome = engine.run(&mut scene, ScatterMode::VertexPlacement, &ScatterParams::new(0.25, 3.0));
        assert!(outcome.is_success(), "n={} error={:?}", n, outcome.error);
        assert_eq!(outcome.created(), n);

        for inst in &outcome.instances {
            assert!(inst.scale >= 0.25 && inst.scale <= 3.0);
            for axis in inst.rotation.to_array() {
                assert!((0.0..360.0).contains(&axis), "rotation {} out of range", axis);
            }
            let node = scene.get(inst.id).unwrap();
            assert_eq!(node.transform.scale, DVec3::splat(inst.scale));
        }

        let group = outcome.group.unwrap();
        assert_eq!(scene.children(group.id).len(), n);
        assert_eq!(scene.get(group.id).unwrap().pivot, DVec3::ZERO);
    }
}

#[test]
fn fixed_seed_reproduces_rotation_and_scale_sequence() {
    let run = || {
        let (mut scene, _, _) = scene_with(line_mesh(12));
        let mut engine = ScatterEngine::new(SeedPolicy::Fixed(77));
        engine
            .run(&mut scene, ScatterMode::VertexPlacement, &ScatterParams::new(0.5, 1.5))
            .instances
            .iter()
            .map(|i| {
                (
                    i.rotation.x.to_bits(),
                    i.rotation.y.to_bits(),
                    i.rotation.z.to_bits(),
                    i.scale.to_bits(),
                )
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn repeated_runs_in_one_scene_create_new_groups() {
    let (mut scene, _, _) = scene_with(line_mesh(3));
    let mut engine = ScatterEngine::reproducible(1);
    let params = ScatterParams::default();

    let first = engine.run(&mut scene, ScatterMode::VertexPlacement, &params);
    let second = engine.run(&mut scene, ScatterMode::VertexPlacement, &params);

    let first_group = first.group.unwrap();
    let second_group = second.group.unwrap();
    assert_ne!(first_group.id, second_group.id);
    assert_eq!(second_group.name, "pebble_instance_grp2");
    assert_eq!(scene.children(first_group.id).len(), 3);
    assert_eq!(scene.children(second_group.id).len(), 3);
    assert_eq!(second.instances[0].name, "pebble_instance4");
}

#[test]
fn four_selected_vertices_at_unit_scale() {
    let mut scene = SceneGraph::new();
    let source = scene.add_mesh("pCube", cube_mesh()).unwrap();
    scene.select(vec![
        SelectionItem::Node(source),
        SelectionItem::Vertices {
            node: source,
            indices: vec![0, 1, 2, 3],
        },
    ]);

    let mut engine = ScatterEngine::reproducible(LEGACY_SEED);
    let outcome = engine.run(&mut scene, ScatterMode::VertexPlacement, &ScatterParams::new(1.0, 1.0));

    assert!(outcome.is_success());
    assert_eq!(outcome.created(), 4);
    assert!(outcome.instances.iter().all(|i| i.scale == 1.0));

    let group = outcome.group.unwrap();
    assert_eq!(scene.children(group.id).len(), 4);
    assert!(!scene.get(source).unwrap().visible);
    assert_eq!(outcome.instances[0].name, "pCube_instance1");
}

#[test]
fn explode_places_one_instance_per_face() {
    let (mut scene, _, _) = scene_with(cube_mesh());
    let mut engine = ScatterEngine::reproducible(9);

    let outcome = engine.run(&mut scene, ScatterMode::Explode, &ScatterParams::new(0.5, 1.0));

    assert!(outcome.is_success());
    assert_eq!(outcome.created(), 6);
    for inst in &outcome.instances {
        // Face centroids of a cube centered at the origin sit on one axis at +-1.
        let p = inst.position.abs();
        assert!((p.x + p.y + p.z - 1.0).abs() < 1e-9, "{:?}", inst.position);
    }
}

#[test]
fn empty_selection_leaves_scene_untouched() {
    let (mut scene, _, _) = scene_with(line_mesh(3));
    scene.clear_selection();
    let nodes_before = scene.node_count();

    let mut engine = ScatterEngine::reproducible(1);
    let outcome = engine.run(&mut scene, ScatterMode::VertexPlacement, &ScatterParams::default());

    assert_eq!(outcome.error, Some(ScatterError::EmptySelection));
    assert_eq!(outcome.state, ScatterState::Failed);
    assert_eq!(scene.mutation_count(), 0);
    assert_eq!(scene.node_count(), nodes_before);
}

#[test]
fn inverted_range_leaves_scene_untouched() {
    let (mut scene, source, _) = scene_with(line_mesh(3));

    let mut engine = ScatterEngine::reproducible(1);
    let outcome = engine.run(&mut scene, ScatterMode::VertexPlacement, &ScatterParams::new(5.0, 2.0));

    assert!(matches!(outcome.error, Some(ScatterError::InvalidRange { .. })));
    assert_eq!(scene.mutation_count(), 0);
    assert!(scene.get(source).unwrap().visible);
}

#[test]
fn non_transform_source_fails_before_group_creation() {
    let mut scene = SceneGraph::new();
    let light = scene.add_node("sun", NodeKind::Light).unwrap();
    let ground = scene.add_mesh("ground", line_mesh(4)).unwrap();
    scene.select(vec![SelectionItem::Node(light), SelectionItem::Node(ground)]);

    let mut engine = ScatterEngine::reproducible(1);
    let outcome = engine.run(&mut scene, ScatterMode::VertexPlacement, &ScatterParams::default());

    assert!(matches!(outcome.error, Some(ScatterError::InvalidSourceType { .. })));
    assert!(outcome.group.is_none());
    assert!(scene.find("sun_instance_grp1").is_none());
    assert_eq!(scene.mutation_count(), 0);
}

#[test]
fn no_target_points_fails_without_mutation() {
    let mut scene = SceneGraph::new();
    let source = scene.add_mesh("rock", line_mesh(3)).unwrap();
    scene.select(vec![SelectionItem::Node(source)]);

    let mut engine = ScatterEngine::reproducible(1);
    let outcome = engine.run(&mut scene, ScatterMode::Explode, &ScatterParams::default());

    assert_eq!(outcome.error, Some(ScatterError::NoTargetPoints { samples: "faces" }));
    assert_eq!(scene.mutation_count(), 0);
}

#[test]
fn mid_loop_failure_keeps_partial_progress() {
    let (inner, source, _) = scene_with(line_mesh(5));
    let mut host = FailingHost::new(inner);
    host.fail_on = 3;

    let mut engine = ScatterEngine::reproducible(LEGACY_SEED);
    let outcome = engine.run(&mut host, ScatterMode::VertexPlacement, &ScatterParams::new(1.0, 2.0));

    assert_eq!(outcome.state, ScatterState::Failed);
    assert_eq!(outcome.created(), 2);
    assert_eq!(outcome.requested, 5);

    let error = outcome.error.clone().unwrap();
    assert_eq!(error.created_before_failure(), 2);
    assert!(error.to_string().contains("2 of 5 created"), "{}", error);

    let group = outcome.group.unwrap();
    assert_eq!(host.inner.children(group.id).len(), 2);
    // The source stays visible because the run never reached Done.
    assert!(host.inner.get(source).unwrap().visible);
}

#[test]
fn group_creation_failure_is_a_scene_error() {
    let (inner, source, _) = scene_with(line_mesh(4));
    let mut host = FailingHost::new(inner);
    host.refuse_group = true;

    let mut engine = ScatterEngine::reproducible(LEGACY_SEED);
    let outcome = engine.run(&mut host, ScatterMode::VertexPlacement, &ScatterParams::default());

    assert_eq!(outcome.state, ScatterState::Failed);
    assert_eq!(
        outcome.error,
        Some(ScatterError::Scene(SceneError::Refused(
            "group creation locked".to_string()
        )))
    );
    assert!(outcome.group.is_none());
    assert_eq!(outcome.created(), 0);
    assert_eq!(host.calls, 0);
    assert_eq!(host.inner.mutation_count(), 0);
    assert!(host.inner.get(source).unwrap().visible);
}

#[test]
fn hide_failure_keeps_every_instance() {
    let (inner, source, _) = scene_with(line_mesh(4));
    let mut host = FailingHost::new(inner);
    host.refuse_hide = true;

    let mut engine = ScatterEngine::reproducible(LEGACY_SEED);
    let outcome = engine.run(&mut host, ScatterMode::VertexPlacement, &ScatterParams::default());

    assert_eq!(outcome.state, ScatterState::Failed);
    assert_eq!(engine.state(), ScatterState::Failed);
    assert!(matches!(outcome.error, Some(ScatterError::Scene(SceneError::Refused(_)))));
    assert_eq!(outcome.created(), 4);
    assert_eq!(outcome.requested, 4);

    let group = outcome.group.unwrap();
    assert_eq!(host.inner.children(group.id).len(), 4);
    assert!(host.inner.get(source).unwrap().visible);
}

#[test]
fn engine_accepts_trait_object_host() {
    let (mut scene, _, _) = scene_with(line_mesh(2));
    let host: &mut dyn SceneMeshService = &mut scene;

    let mut engine = ScatterEngine::reproducible(3);
    let outcome = engine.run(host, ScatterMode::VertexPlacement, &ScatterParams::default());
    assert_eq!(outcome.created(), 2);
}
