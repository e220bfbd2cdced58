//! Scatter orchestration.
//!
//! The engine drives one invocation through
//! `Idle -> Validating -> Placing -> Done`, or into `Failed` from either
//! working state. Validation happens strictly before the first scene
//! mutation. A failure while placing leaves the already created instances in
//! the scene and is reported alongside them in the [`ScatterOutcome`].

use serde::Serialize;

use crate::error::ScatterError;
use crate::group::{GroupManager, InstanceGroup};
use crate::instance::{Instance, InstanceFactory};
use crate::params::{ParameterSource, ScaleRange};
use crate::sampler::{RandomSampler, SeedPolicy};
use crate::scene::SceneMeshService;
use crate::selection::{ScatterMode, SelectionResolver, SourceObject};

/// Lifecycle of a scatter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScatterState {
    Idle,
    Validating,
    Placing,
    Done,
    Failed,
}

impl ScatterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScatterState::Done | ScatterState::Failed)
    }
}

/// User-facing triggers of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    VertexPlacement,
    Scatter,
    /// Dismiss the tool without touching the scene.
    Cancel,
}

impl Trigger {
    pub fn mode(&self) -> Option<ScatterMode> {
        match self {
            Trigger::VertexPlacement => Some(ScatterMode::VertexPlacement),
            Trigger::Scatter => Some(ScatterMode::Explode),
            Trigger::Cancel => None,
        }
    }
}

/// Result of one invocation: what was created, and what went wrong if
/// anything did.
#[derive(Debug, Clone)]
pub struct ScatterOutcome {
    pub mode: ScatterMode,
    pub state: ScatterState,
    pub seed: u64,
    pub source: Option<SourceObject>,
    pub group: Option<InstanceGroup>,
    pub instances: Vec<Instance>,
    /// Number of target points the invocation tried to fill.
    pub requested: usize,
    pub error: Option<ScatterError>,
}

impl ScatterOutcome {
    fn new(mode: ScatterMode, seed: u64) -> Self {
        Self {
            mode,
            state: ScatterState::Idle,
            seed,
            source: None,
            group: None,
            instances: Vec::new(),
            requested: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ScatterState::Done
    }

    pub fn created(&self) -> usize {
        self.instances.len()
    }

    /// Drop the partial-progress detail and keep only success or the error.
    pub fn into_result(self) -> Result<Vec<Instance>, ScatterError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.instances),
        }
    }
}

/// Runs scatter invocations against a host scene.
#[derive(Debug)]
pub struct ScatterEngine {
    seed_policy: SeedPolicy,
    state: ScatterState,
}

impl ScatterEngine {
    pub fn new(seed_policy: SeedPolicy) -> Self {
        Self {
            seed_policy,
            state: ScatterState::Idle,
        }
    }

    /// Engine that reproduces the same layout on every run.
    pub fn reproducible(seed: u64) -> Self {
        Self::new(SeedPolicy::Fixed(seed))
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.seed_policy
    }

    pub fn set_seed_policy(&mut self, policy: SeedPolicy) {
        self.seed_policy = policy;
    }

    /// State reached by the most recent invocation.
    pub fn state(&self) -> ScatterState {
        self.state
    }

    fn transition(&mut self, outcome: &mut ScatterOutcome, next: ScatterState) {
        log::debug!("scatter {}: {:?} -> {:?}", outcome.mode, self.state, next);
        self.state = next;
        outcome.state = next;
    }

    fn fail(&mut self, mut outcome: ScatterOutcome, error: ScatterError) -> ScatterOutcome {
        log::warn!("Scatter ({}) failed: {}", outcome.mode, error);
        self.transition(&mut outcome, ScatterState::Failed);
        outcome.error = Some(error);
        outcome
    }

    /// Handle a tool trigger. `Cancel` returns `None` and leaves the scene
    /// untouched.
    pub fn dispatch<S, P>(&mut self, scene: &mut S, trigger: Trigger, params: &P) -> Option<ScatterOutcome>
    where
        S: SceneMeshService + ?Sized,
        P: ParameterSource + ?Sized,
    {
        match trigger.mode() {
            Some(mode) => Some(self.run(scene, mode, params)),
            None => {
                log::info!("Scatter cancelled");
                self.state = ScatterState::Idle;
                None
            }
        }
    }

    /// Run one scatter invocation.
    pub fn run<S, P>(&mut self, scene: &mut S, mode: ScatterMode, params: &P) -> ScatterOutcome
    where
        S: SceneMeshService + ?Sized,
        P: ParameterSource + ?Sized,
    {
        self.state = ScatterState::Idle;
        let mut sampler = RandomSampler::from_policy(self.seed_policy);
        let mut outcome = ScatterOutcome::new(mode, sampler.seed());

        self.transition(&mut outcome, ScatterState::Validating);

        let range = match ScaleRange::from_source(params) {
            Ok(range) => range,
            Err(e) => return self.fail(outcome, e),
        };

        let (source, points) = match SelectionResolver::new(mode).resolve(&*scene) {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(outcome, e),
        };
        outcome.requested = points.len();
        outcome.source = Some(source.clone());

        self.transition(&mut outcome, ScatterState::Placing);

        let group = match GroupManager::create_group(scene, &source) {
            Ok(group) => group,
            Err(e) => return self.fail(outcome, ScatterError::Scene(e)),
        };
        outcome.group = Some(group.clone());

        let mut factory = InstanceFactory::new(&mut sampler);
        for point in points {
            match factory.create_instance(scene, &source, point, &range, &group) {
                Ok(instance) => outcome.instances.push(instance),
                Err(cause) => {
                    let error = ScatterError::InstancingFailed {
                        created: outcome.instances.len(),
                        requested: outcome.requested,
                        cause,
                    };
                    return self.fail(outcome, error);
                }
            }
        }

        if let Err(e) = scene.hide(source.id) {
            return self.fail(outcome, ScatterError::Scene(e));
        }

        self.transition(&mut outcome, ScatterState::Done);
        log::info!(
            "Scatter ({}) placed {} instances of '{}' under '{}' (seed {})",
            mode,
            outcome.created(),
            source.name,
            group.name,
            outcome.seed
        );
        outcome
    }
}

impl Default for ScatterEngine {
    fn default() -> Self {
        Self::new(SeedPolicy::default())
    }
}
