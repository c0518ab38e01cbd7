use serde::{Deserialize, Serialize};

/// Maps acquisition frames onto seconds.
pub trait FrameClock {
    fn n_frames(&self) -> usize;
    fn time_of(&self, frame: usize) -> Option<f64>;
    fn nearest_frame(&self, t: f64) -> Option<usize>;
    fn interval_stats(&self) -> IntervalStats;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalStats {
    pub average_interval_s: f64,
    pub jitter_s: f64,
    pub min_interval_s: f64,
    pub max_interval_s: f64,
    pub effective_rate_hz: f64,
}

impl IntervalStats {
    fn empty() -> Self {
        IntervalStats {
            average_interval_s: f64::NAN,
            jitter_s: f64::NAN,
            min_interval_s: f64::NAN,
            max_interval_s: f64::NAN,
            effective_rate_hz: f64::NAN,
        }
    }
}

/// Stimulus clock built from display vsync intervals.
///
/// Frame 0 starts at t = 0 and frame k starts after the first k intervals have elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct VsyncClock {
    times: Vec<f64>,
}

impl VsyncClock {
    /// `intervals_ms` are frame durations in milliseconds.
    pub fn from_intervals_ms(intervals_ms: &[f64]) -> Self {
        let mut times = Vec::with_capacity(intervals_ms.len() + 1);
        let mut acc = 0.0;
        times.push(0.0);
        for dt in intervals_ms {
            acc += dt;
            times.push(acc / 1000.0);
        }
        Self { times }
    }

    pub fn from_timestamps(times: Vec<f64>) -> Self {
        Self { times }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }
}

impl FrameClock for VsyncClock {
    fn n_frames(&self) -> usize {
        self.times.len()
    }

    fn time_of(&self, frame: usize) -> Option<f64> {
        self.times.get(frame).copied()
    }

    fn nearest_frame(&self, t: f64) -> Option<usize> {
        nearest_index(&self.times, t)
    }

    fn interval_stats(&self) -> IntervalStats {
        interval_stats(&self.times)
    }
}

/// Index of the sample in sorted `times` closest to `t`; the earlier index wins ties.
pub fn nearest_index(times: &[f64], t: f64) -> Option<usize> {
    if times.is_empty() || !t.is_finite() {
        return None;
    }
    let upper = times.partition_point(|&x| x < t);
    if upper == 0 {
        return Some(0);
    }
    if upper == times.len() {
        return Some(times.len() - 1);
    }
    let below = t - times[upper - 1];
    let above = times[upper] - t;
    if above < below {
        Some(upper)
    } else {
        Some(upper - 1)
    }
}

/// Statistics of consecutive timestamp differences (population standard deviation for jitter).
pub fn interval_stats(times: &[f64]) -> IntervalStats {
    let intervals: Vec<f64> = times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| d.is_finite())
        .collect();
    if intervals.is_empty() {
        return IntervalStats::empty();
    }
    let n = intervals.len() as f64;
    let avg = intervals.iter().sum::<f64>() / n;
    let var = intervals.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
    let min = intervals.iter().copied().fold(f64::INFINITY, f64::min);
    let max = intervals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    IntervalStats {
        average_interval_s: avg,
        jitter_s: var.sqrt(),
        min_interval_s: min,
        max_interval_s: max,
        effective_rate_hz: if avg > 0.0 { 1.0 / avg } else { f64::NAN },
    }
}
