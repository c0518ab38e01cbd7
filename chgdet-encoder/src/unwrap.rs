use chgdet_core::EncoderSample;

use crate::config::{EncoderConfig, VMaxSource};
use crate::error::EncoderError;

/// +1 where the signal fell from above `upper` to below `lower` (forward rotation past the top of
/// the range), -1 for the reverse, 0 elsewhere. The first sample is always 0.
pub fn wrap_ids(v_sig: &[f64], lower: f64, upper: f64) -> Vec<i8> {
    let mut ids = vec![0i8; v_sig.len()];
    for i in 1..v_sig.len() {
        let (prev, cur) = (v_sig[i - 1], v_sig[i]);
        ids[i] = if cur < lower && prev > upper {
            1
        } else if cur > upper && prev < lower {
            -1
        } else {
            0
        };
    }
    ids
}

fn v_max_series(samples: &[EncoderSample], config: &EncoderConfig) -> Vec<f64> {
    match config.v_max_source {
        VMaxSource::ReferenceVoltage => samples.iter().map(|s| s.v_in).collect(),
        VMaxSource::ObservedMax => {
            let observed = samples
                .iter()
                .map(|s| s.v_sig)
                .filter(|v| *v < config.v_max_sanity)
                .fold(f64::NAN, f64::max);
            vec![observed; samples.len()]
        }
    }
}

/// Step between consecutive samples with wraps folded back in. Index 0 and corrupted steps
/// (`|delta| > max_delta`) are NaN.
pub fn unwrap_deltas(v_sig: &[f64], ids: &[i8], v_max: &[f64], max_delta: f64) -> Vec<f64> {
    let mut deltas = vec![f64::NAN; v_sig.len()];
    for i in 1..v_sig.len() {
        let (prev, cur) = (v_sig[i - 1], v_sig[i]);
        let delta = match ids[i] {
            1 => (cur + v_max[i]) - prev,
            -1 => cur - (prev + v_max[i]),
            _ => cur - prev,
        };
        if delta.abs() <= max_delta {
            deltas[i] = delta;
        }
    }
    deltas
}

/// Running sum of valid deltas starting at `start`; a NaN delta holds the previous value.
pub fn accumulate(start: f64, deltas: &[f64]) -> Vec<f64> {
    let mut acc = start;
    deltas
        .iter()
        .enumerate()
        .map(|(i, d)| {
            if i > 0 && d.is_finite() {
                acc += d;
            }
            acc
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unwrapped {
    pub wrap_ids: Vec<i8>,
    pub deltas: Vec<f64>,
    pub voltage: Vec<f64>,
}

impl Unwrapped {
    pub fn n_corrupted(&self) -> usize {
        self.deltas.iter().skip(1).filter(|d| d.is_nan()).count()
    }
}

pub fn unwrap_encoder(
    samples: &[EncoderSample],
    config: &EncoderConfig,
) -> Result<Unwrapped, EncoderError> {
    config.validate()?;
    if samples.len() < 2 {
        return Err(EncoderError::TooFewSamples {
            got: samples.len(),
            need: 2,
        });
    }
    let v_sig: Vec<f64> = samples.iter().map(|s| s.v_sig).collect();
    let ids = wrap_ids(&v_sig, config.lower_threshold, config.upper_threshold);
    let v_max = v_max_series(samples, config);
    let deltas = unwrap_deltas(&v_sig, &ids, &v_max, config.max_delta);
    let voltage = accumulate(v_sig[0], &deltas);
    Ok(Unwrapped {
        wrap_ids: ids,
        deltas,
        voltage,
    })
}
