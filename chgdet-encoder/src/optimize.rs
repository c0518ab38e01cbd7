use chgdet_core::EncoderSample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EncoderConfig;
use crate::error::EncoderError;
use crate::pipeline::{n_knots, process_encoder, smooth_kinematics};
use crate::spline::BSpline;

/// Score of one knot divisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub knot_factor: usize,
    pub n_knots: usize,
    pub mean_squared_jerk: f64,
    pub total_jerk: f64,
    pub jerk_std: f64,
    /// smoothed against unsmoothed speed
    pub mean_squared_error: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotSearch {
    pub candidates: Vec<Candidate>,
    pub best: usize,
}

impl KnotSearch {
    pub fn best(&self) -> &Candidate {
        &self.candidates[self.best]
    }
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

fn population_std(values: &[f64]) -> f64 {
    let m = mean(finite(values));
    mean(finite(values).map(|v| (v - m).powi(2))).sqrt()
}

/// Scores every knot divisor in `config.knot_factors` by
/// `jerk_weight * std(jerk) + mse_weight * mse(speed)` and picks the smallest (first on ties).
pub fn optimize_knot_factor(
    samples: &[EncoderSample],
    config: &EncoderConfig,
) -> Result<KnotSearch, EncoderError> {
    let raw = process_encoder(samples, config)?;
    let time: Vec<f64> = raw.iter().map(|r| r.time).collect();
    let v_in: Vec<f64> = raw.iter().map(|r| r.v_in).collect();
    let voltage: Vec<f64> = raw.iter().map(|r| r.v_sig_unwrapped).collect();
    let raw_speed: Vec<f64> = raw.iter().map(|r| r.speed).collect();

    let mut candidates = Vec::with_capacity(config.knot_factors.len());
    for factor in config.knot_factors.clone() {
        let knots = n_knots(raw.len(), factor);
        let fitted = BSpline::fit(&time, &voltage, knots, config.ridge)
            .and_then(|s| smooth_kinematics(&time, &v_in, &s.eval_many(&time), config));
        let kin = match fitted {
            Ok(kin) => kin,
            Err(err) => {
                debug!(factor, knots, %err, "knot factor skipped");
                continue;
            }
        };

        let mean_squared_jerk = mean(finite(&kin.jerk).map(|j| j * j));
        let total_jerk: f64 = finite(&kin.jerk).map(f64::abs).sum();
        let jerk_std = population_std(&kin.jerk);
        let mean_squared_error = mean(
            kin.speed
                .iter()
                .zip(&raw_speed)
                .map(|(s, r)| (s - r).powi(2))
                .filter(|e| e.is_finite()),
        );
        let score = config.jerk_weight * jerk_std + config.mse_weight * mean_squared_error;
        candidates.push(Candidate {
            knot_factor: factor,
            n_knots: knots,
            mean_squared_jerk,
            total_jerk,
            jerk_std,
            mean_squared_error,
            score,
        });
    }

    let best = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.score.is_finite())
        .fold(None::<(usize, f64)>, |best, (i, c)| match best {
            Some((_, s)) if s <= c.score => best,
            _ => Some((i, c.score)),
        })
        .map(|(i, _)| i)
        .ok_or(EncoderError::NoValidCandidate)?;

    let search = KnotSearch { candidates, best };
    info!(
        knot_factor = search.best().knot_factor,
        n_knots = search.best().n_knots,
        score = search.best().score,
        "knot factor selected"
    );
    Ok(search)
}
