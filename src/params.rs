//! Scatter parameters.
//!
//! The scale range is the only user-tunable input. It reaches the engine
//! through [`ParameterSource`], so any front end (a panel, a job file, a test)
//! can supply it as plain data.

use serde::{Deserialize, Serialize};

use crate::error::ScatterError;

/// Supplies the user-configured scale bounds.
pub trait ParameterSource {
    fn scale_min(&self) -> f64;
    fn scale_max(&self) -> f64;
}

/// Closed interval `[min, max]` bounding the per-instance uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    min: f64,
    max: f64,
}

impl ScaleRange {
    /// Requires `0 < min <= max`, both finite.
    pub fn new(min: f64, max: f64) -> Result<Self, ScatterError> {
        let invalid = |reason| ScatterError::InvalidRange {
            low: min,
            high: max,
            reason,
        };

        if !min.is_finite() || !max.is_finite() {
            return Err(invalid("bounds must be finite"));
        }
        if min <= 0.0 {
            return Err(invalid("scale must be greater than zero"));
        }
        if min > max {
            return Err(invalid("minimum exceeds maximum"));
        }

        Ok(Self { min, max })
    }

    /// A zero-width range producing a constant scale.
    pub fn fixed(scale: f64) -> Result<Self, ScatterError> {
        Self::new(scale, scale)
    }

    /// Read and validate the range from a parameter source.
    pub fn from_source(source: &(impl ParameterSource + ?Sized)) -> Result<Self, ScatterError> {
        Self::new(source.scale_min(), source.scale_max())
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

fn default_scale() -> f64 {
    1.0
}

/// Plain-data parameter source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterParams {
    #[serde(default = "default_scale")]
    pub scale_min: f64,
    #[serde(default = "default_scale")]
    pub scale_max: f64,
}

impl ScatterParams {
    pub fn new(scale_min: f64, scale_max: f64) -> Self {
        Self {
            scale_min,
            scale_max,
        }
    }
}

impl Default for ScatterParams {
    fn default() -> Self {
        Self::new(default_scale(), default_scale())
    }
}

impl ParameterSource for ScatterParams {
    fn scale_min(&self) -> f64 {
        self.scale_min
    }

    fn scale_max(&self) -> f64 {
        self.scale_max
    }
}

impl ParameterSource for ScaleRange {
    fn scale_min(&self) -> f64 {
        self.min
    }

    fn scale_max(&self) -> f64 {
        self.max
    }
}
