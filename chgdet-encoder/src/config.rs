use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::EncoderError;

/// Where the wrap amplitude comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VMaxSource {
    /// the per-sample reference voltage `v_in`
    #[default]
    ReferenceVoltage,
    /// the largest observed `v_sig` below `v_max_sanity`
    ObservedMax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub v_max_source: VMaxSource,
    /// readings at or above this are glitches when estimating the observed max
    pub v_max_sanity: f64,
    /// larger unwrapped steps are corrupted samples
    pub max_delta: f64,
    /// neighbourhood half-width for wrap outlier suppression, seconds
    pub outlier_window_s: f64,
    pub zscore_threshold: f64,
    /// wheel radius, cm
    pub running_radius_cm: f64,
    pub jerk_weight: f64,
    pub mse_weight: f64,
    /// candidate knot divisors F; `n_knots = len / F`
    pub knot_factors: Range<usize>,
    /// diagonal ridge added to the spline normal equations, relative to their largest diagonal
    pub ridge: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            lower_threshold: 1.5,
            upper_threshold: 3.5,
            v_max_source: VMaxSource::ReferenceVoltage,
            v_max_sanity: 5.1,
            max_delta: 1.0,
            outlier_window_s: 0.25,
            zscore_threshold: 5.0,
            running_radius_cm: 0.5 * (2.0 * 6.5 * 2.54 / 3.0),
            jerk_weight: 0.01,
            mse_weight: 1.0,
            knot_factors: 1..100,
            ridge: 1e-10,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), EncoderError> {
        if !(self.lower_threshold < self.upper_threshold) {
            return Err(EncoderError::InvalidThresholds {
                lower: self.lower_threshold,
                upper: self.upper_threshold,
            });
        }
        if self.knot_factors.start == 0 || self.knot_factors.is_empty() {
            return Err(EncoderError::InvalidKnotFactor {
                factor: self.knot_factors.start,
            });
        }
        let positive = [
            ("max_delta", self.max_delta),
            ("outlier_window_s", self.outlier_window_s),
            ("zscore_threshold", self.zscore_threshold),
            ("running_radius_cm", self.running_radius_cm),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(EncoderError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}
