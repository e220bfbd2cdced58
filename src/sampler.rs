//! Seeded random sampling for instance variation.
//!
//! Every scatter invocation builds a fresh sampler from a [`SeedPolicy`]. A
//! fixed seed reproduces the same rotation/scale sequence for the same
//! selection; a time-based seed gives a different layout per run.

use rand::distr::uniform::Error as UniformError;
use rand::distr::Uniform;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ScatterError;

/// Seed the tool historically used for every run.
pub const LEGACY_SEED: u64 = 1998;

/// How the sampler is seeded at the start of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedPolicy {
    /// Seed from the wall clock.
    #[default]
    TimeBased,
    /// Reproducible mode.
    Fixed(u64),
}

impl SeedPolicy {
    pub fn from_option(seed: Option<u64>) -> Self {
        seed.map(SeedPolicy::Fixed).unwrap_or_default()
    }

    /// Produce the concrete seed for one invocation.
    pub fn resolve(&self) -> u64 {
        match self {
            SeedPolicy::Fixed(seed) => *seed,
            SeedPolicy::TimeBased => {
                let now = chrono::Utc::now();
                now.timestamp_nanos_opt()
                    .map(|n| n as u64)
                    .unwrap_or_else(|| now.timestamp_micros() as u64)
            }
        }
    }
}

/// Uniform sampler over a ChaCha8 stream.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    rng: ChaCha8Rng,
    seed: u64,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn from_policy(policy: SeedPolicy) -> Self {
        Self::new(policy.resolve())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `[low, high]`.
    ///
    /// A zero-width range returns `low` without consuming randomness.
    pub fn uniform(&mut self, low: f64, high: f64) -> Result<f64, ScatterError> {
        if !low.is_finite() || !high.is_finite() {
            return Err(ScatterError::InvalidRange {
                low,
                high,
                reason: "bounds must be finite",
            });
        }
        if low > high {
            return Err(ScatterError::InvalidRange {
                low,
                high,
                reason: "minimum exceeds maximum",
            });
        }
        if low == high {
            return Ok(low);
        }
        let dist = Uniform::new_inclusive(low, high).map_err(|e| range_error(low, high, e))?;
        Ok(self.rng.sample(dist))
    }

    /// Uniform angle in `[0, max_degrees)`.
    pub fn uniform_angle(&mut self, max_degrees: f64) -> Result<f64, ScatterError> {
        if !max_degrees.is_finite() || max_degrees <= 0.0 {
            return Err(ScatterError::InvalidRange {
                low: 0.0,
                high: max_degrees,
                reason: "angle bound must be positive",
            });
        }
        let dist = Uniform::new(0.0, max_degrees).map_err(|e| range_error(0.0, max_degrees, e))?;
        Ok(self.rng.sample(dist))
    }
}

fn range_error(low: f64, high: f64, e: UniformError) -> ScatterError {
    let reason = match e {
        UniformError::EmptyRange => "minimum exceeds maximum",
        UniformError::NonFinite => "range width is not finite",
    };
    ScatterError::InvalidRange { low, high, reason }
}
