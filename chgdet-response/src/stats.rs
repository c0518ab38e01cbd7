//! Per-event response statistics.

use chgdet_core::{float_serde, ChannelKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseStats {
    #[serde(with = "float_serde")]
    pub mean_response: f64,
    #[serde(with = "float_serde")]
    pub baseline_response: f64,
    #[serde(with = "float_serde")]
    pub p_value: f64,
    #[serde(with = "float_serde")]
    pub sd_over_baseline: f64,
    /// strictly positive samples in the response window
    pub n_events: usize,
}

/// Half-open sample range `[round(from * rate), round(to * rate))`, clipped to `len`.
fn sample_range(from: f64, to: f64, rate: f64, len: usize) -> std::ops::Range<usize> {
    let idx = |s: f64| ((s * rate).round().max(0.0) as usize).min(len);
    idx(from)..idx(to)
}

/// Window values a mean is taken over: finite samples for continuous channels, every sample
/// with missing ones counted as zero for event channels.
fn usable(values: &[f64], kind: ChannelKind) -> Vec<f64> {
    match kind {
        ChannelKind::Continuous => values.iter().copied().filter(|v| v.is_finite()).collect(),
        ChannelKind::Events => values
            .iter()
            .map(|&v| if v.is_nan() { 0.0 } else { v })
            .collect(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    mean(&values.iter().map(|v| (v - m).powi(2)).collect::<Vec<_>>()).sqrt()
}

/// Statistics of an extracted trace whose window started `window_start` seconds from the event
/// (negative for windows that begin before it).
///
/// The response window spans `duration` seconds from the event, the baseline the `duration`
/// seconds right before it.
pub fn response_stats(
    trace: &[f64],
    window_start: f64,
    duration: f64,
    frame_rate: f64,
    kind: ChannelKind,
) -> ResponseStats {
    let onset = window_start.abs();
    let response = usable(
        &trace[sample_range(onset, onset + duration, frame_rate, trace.len())],
        kind,
    );
    let baseline = usable(
        &trace[sample_range(onset - duration, onset, frame_rate, trace.len())],
        kind,
    );

    let mean_response = mean(&response);
    let baseline_response = mean(&baseline);
    let spread = population_std(&baseline);
    let sd_over_baseline = if spread > 0.0 {
        (mean_response - baseline_response) / spread
    } else {
        f64::NAN
    };

    ResponseStats {
        mean_response,
        baseline_response,
        p_value: anova_p_value(&baseline, &response),
        sd_over_baseline,
        n_events: response.iter().filter(|v| **v > 0.0).count(),
    }
}

/// p-value of a one-way ANOVA between two groups. NaN when either group has fewer than two
/// samples or the within-group variance vanishes.
pub fn anova_p_value(a: &[f64], b: &[f64]) -> f64 {
    let (na, nb) = (a.len(), b.len());
    if na < 2 || nb < 2 {
        return f64::NAN;
    }
    let n = (na + nb) as f64;
    let (ma, mb) = (mean(a), mean(b));
    let grand = (ma * na as f64 + mb * nb as f64) / n;
    let between = na as f64 * (ma - grand).powi(2) + nb as f64 * (mb - grand).powi(2);
    let within: f64 = a.iter().map(|v| (v - ma).powi(2)).sum::<f64>()
        + b.iter().map(|v| (v - mb).powi(2)).sum::<f64>();
    let df_within = n - 2.0;
    if !(within > 0.0) {
        return f64::NAN;
    }
    let f = between / (within / df_within);
    // survival function of F(1, df_within)
    regularized_beta(df_within / (df_within + f), df_within / 2.0, 0.5)
}

fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + G + 0.5;
    let series = COEF[1..]
        .iter()
        .enumerate()
        .fold(COEF[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0));
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Continued fraction for the incomplete beta function (modified Lentz).
fn beta_fraction(x: f64, a: f64, b: f64) -> f64 {
    const TINY: f64 = 1e-300;
    const EPS: f64 = 1e-15;
    let mut c = 1.0;
    let mut d = 1.0 - (a + b) * x / (a + 1.0);
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=300 {
        let m = m as f64;
        let m2 = 2.0 * m;
        let even = m * (b - m) * x / ((a + m2 - 1.0) * (a + m2));
        for coef in [even, -(a + m) * (a + b + m) * x / ((a + m2) * (a + m2 + 1.0))] {
            d = 1.0 + coef * d;
            if d.abs() < TINY {
                d = TINY;
            }
            c = 1.0 + coef / c;
            if c.abs() < TINY {
                c = TINY;
            }
            d = 1.0 / d;
            h *= d * c;
        }
        if (d * c - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta `I_x(a, b)`.
fn regularized_beta(x: f64, a: f64, b: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    if x == 0.0 || x == 1.0 {
        return x;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_fraction(1.0 - x, b, a) / b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-12);
    }

    #[test]
    fn anova_matches_reference() {
        // scipy.stats.f_oneway([1, 2, 3, 4, 5], [2, 4, 6, 8, 10]) -> F = 3.6, p = 0.094349...
        let p = anova_p_value(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!((p - 0.094_349).abs() < 1e-5, "{p}");
    }

    #[test]
    fn anova_is_symmetric_and_degenerate_safe() {
        let a = [0.1, 0.3, 0.2, 0.5];
        let b = [0.9, 1.1, 0.8, 1.3, 1.0];
        assert_eq!(anova_p_value(&a, &b), anova_p_value(&b, &a));
        assert!(anova_p_value(&[1.0], &b).is_nan());
        assert!(anova_p_value(&[1.0, 1.0], &[1.0, 1.0]).is_nan());
    }

    #[test]
    fn step_response() {
        // 10 Hz trace, window [-1, 1] s: baseline samples 5..10, response 10..15
        let mut trace = vec![0.0; 21];
        for (i, v) in trace.iter_mut().enumerate() {
            *v = if i >= 10 { 2.0 } else { (i % 2) as f64 };
        }
        let s = response_stats(&trace, -1.0, 0.5, 10.0, ChannelKind::Continuous);
        assert_eq!(s.mean_response, 2.0);
        assert_eq!(s.baseline_response, 0.6);
        assert_eq!(s.n_events, 5);
        let std = (0.24f64).sqrt();
        assert!((s.sd_over_baseline - 1.4 / std).abs() < 1e-12);
        assert!(s.p_value < 0.01);
    }

    #[test]
    fn flat_baseline_gives_missing_ratio() {
        let trace = [1.0; 21];
        let s = response_stats(&trace, -1.0, 0.5, 10.0, ChannelKind::Continuous);
        assert!(s.sd_over_baseline.is_nan());
        assert!(s.p_value.is_nan());
    }

    #[test]
    fn event_channels_count_gaps_as_zero() {
        let mut trace = [f64::NAN; 21];
        trace[10] = 3.0;
        let events = response_stats(&trace, -1.0, 0.5, 10.0, ChannelKind::Events);
        assert!((events.mean_response - 0.6).abs() < 1e-12);
        assert_eq!(events.n_events, 1);
        let cont = response_stats(&trace, -1.0, 0.5, 10.0, ChannelKind::Continuous);
        assert_eq!(cont.mean_response, 3.0);
        assert!(cont.baseline_response.is_nan());
    }
}
