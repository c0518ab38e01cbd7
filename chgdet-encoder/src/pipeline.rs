use std::f64::consts::TAU;

use chgdet_core::{float_serde, EncoderSample, SessionError, SignalChannel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EncoderConfig;
use crate::derivative::deriv;
use crate::error::EncoderError;
use crate::outliers::{suppress_wrap_outliers, zscore_filter};
use crate::spline::BSpline;
use crate::unwrap::unwrap_encoder;

/// One encoder sample with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningSample {
    pub time: f64,
    pub v_sig: f64,
    pub v_in: f64,
    pub wrap_id: i8,
    #[serde(with = "float_serde")]
    pub delta: f64,
    pub v_sig_unwrapped: f64,
    /// cm/s
    #[serde(with = "float_serde")]
    pub speed: f64,
    #[serde(with = "float_serde")]
    pub acceleration: f64,
    #[serde(with = "float_serde")]
    pub jerk: f64,
}

pub(crate) struct Kinematics {
    pub speed: Vec<f64>,
    pub acceleration: Vec<f64>,
    pub jerk: Vec<f64>,
}

/// Wheel angle in radians. Steps flagged in `gap` are NaN and do not advance the angle.
fn wheel_angle(voltage: &[f64], v_in: &[f64], gap: impl Fn(usize) -> bool) -> Vec<f64> {
    let mut acc = 0.0;
    let mut angle = vec![0.0; voltage.len()];
    for i in 1..voltage.len() {
        if gap(i) || !(v_in[i] > 0.0) {
            angle[i] = f64::NAN;
            continue;
        }
        acc += (voltage[i] - voltage[i - 1]) / v_in[i] * TAU;
        angle[i] = acc;
    }
    angle
}

fn higher_derivatives(time: &[f64], speed: Vec<f64>) -> Result<Kinematics, EncoderError> {
    let acceleration = deriv(&speed, time)?;
    let jerk = deriv(&acceleration, time)?;
    Ok(Kinematics {
        speed,
        acceleration,
        jerk,
    })
}

/// Kinematics of a smoothed voltage curve; no outlier control is needed there.
pub(crate) fn smooth_kinematics(
    time: &[f64],
    v_in: &[f64],
    voltage: &[f64],
    config: &EncoderConfig,
) -> Result<Kinematics, EncoderError> {
    let angle = wheel_angle(voltage, v_in, |_| false);
    let speed: Vec<f64> = deriv(&angle, time)?
        .into_iter()
        .map(|w| w * config.running_radius_cm)
        .collect();
    higher_derivatives(time, speed)
}

fn check_times(samples: &[EncoderSample]) -> Result<(), EncoderError> {
    if let Some(i) = samples.windows(2).position(|w| !(w[1].time > w[0].time)) {
        return Err(EncoderError::UnorderedTimestamps { index: i + 1 });
    }
    Ok(())
}

/// Unwraps, differentiates and cleans the encoder signal.
pub fn process_encoder(
    samples: &[EncoderSample],
    config: &EncoderConfig,
) -> Result<Vec<RunningSample>, EncoderError> {
    check_times(samples)?;
    let unwrapped = unwrap_encoder(samples, config)?;
    let time: Vec<f64> = samples.iter().map(|s| s.time).collect();
    let v_in: Vec<f64> = samples.iter().map(|s| s.v_in).collect();

    let angle = wheel_angle(&unwrapped.voltage, &v_in, |i| unwrapped.deltas[i].is_nan());
    let raw_speed: Vec<f64> = deriv(&angle, &time)?
        .into_iter()
        .map(|w| w * config.running_radius_cm)
        .collect();
    let clamped = suppress_wrap_outliers(
        &raw_speed,
        &time,
        &unwrapped.wrap_ids,
        config.outlier_window_s,
    );
    let speed = zscore_filter(&clamped, config.zscore_threshold);
    let kin = higher_derivatives(&time, speed)?;

    let n_wraps = unwrapped.wrap_ids.iter().filter(|&&w| w != 0).count();
    let n_removed = kin
        .speed
        .iter()
        .zip(&clamped)
        .filter(|(s, c)| s.is_nan() && !c.is_nan())
        .count();
    info!(
        samples = samples.len(),
        wraps = n_wraps,
        corrupted = unwrapped.n_corrupted(),
        zscore_removed = n_removed,
        "encoder unwrapped"
    );

    Ok(samples
        .iter()
        .enumerate()
        .map(|(i, s)| RunningSample {
            time: s.time,
            v_sig: s.v_sig,
            v_in: s.v_in,
            wrap_id: unwrapped.wrap_ids[i],
            delta: unwrapped.deltas[i],
            v_sig_unwrapped: unwrapped.voltage[i],
            speed: kin.speed[i],
            acceleration: kin.acceleration[i],
            jerk: kin.jerk[i],
        })
        .collect())
}

/// Number of breakpoints for knot divisor `factor` over `n` samples.
pub fn n_knots(n: usize, factor: usize) -> usize {
    n / factor.max(1)
}

/// Running table recomputed from a regression spline of the unwrapped voltage.
pub fn smoothed_running(
    samples: &[EncoderSample],
    config: &EncoderConfig,
    knot_factor: usize,
) -> Result<Vec<RunningSample>, EncoderError> {
    if knot_factor == 0 {
        return Err(EncoderError::InvalidKnotFactor { factor: 0 });
    }
    let raw = process_encoder(samples, config)?;
    let time: Vec<f64> = raw.iter().map(|r| r.time).collect();
    let v_in: Vec<f64> = raw.iter().map(|r| r.v_in).collect();
    let voltage: Vec<f64> = raw.iter().map(|r| r.v_sig_unwrapped).collect();

    let knots = n_knots(raw.len(), knot_factor);
    let spline = BSpline::fit(&time, &voltage, knots, config.ridge)?;
    let smooth = spline.eval_many(&time);
    let kin = smooth_kinematics(&time, &v_in, &smooth, config)?;
    debug!(knot_factor, knots, "smoothed running trace");

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, r)| RunningSample {
            v_sig_unwrapped: smooth[i],
            speed: kin.speed[i],
            acceleration: kin.acceleration[i],
            jerk: kin.jerk[i],
            ..r
        })
        .collect())
}

/// Running speed as a single-cell signal channel.
pub fn speed_channel(rows: &[RunningSample]) -> Result<SignalChannel, SessionError> {
    SignalChannel::single(
        "running_speed",
        rows.iter().map(|r| r.time).collect(),
        rows.iter().map(|r| r.speed).collect(),
    )
}
