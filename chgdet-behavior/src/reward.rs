use chgdet_core::ClassifiedTrial;

use crate::config::PerformanceConfig;

/// Rewards per minute around each trial.
///
/// The first `reward_warmup_trials` trials are infinite so that engagement filters always keep
/// the start of a session. Later trials count correct responses in rows
/// `[i - window, i + window)` and divide by the start-time span of those rows. An empty window
/// gives NaN.
pub fn reward_rates(trials: &[ClassifiedTrial], config: &PerformanceConfig) -> Vec<f64> {
    let n = trials.len();
    let window = config.reward_trial_window;
    (0..n)
        .map(|i| {
            if i < config.reward_warmup_trials {
                return f64::INFINITY;
            }
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(n);
            let rows = &trials[lo..hi];
            let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
                return f64::NAN;
            };
            let correct = rows
                .iter()
                .filter(|t| t.response_latency.is_some_and(|l| l < config.correct_latency_s))
                .count();
            let elapsed = last.trial.start_time - first.trial.start_time;
            if elapsed > 0.0 {
                correct as f64 / elapsed * 60.0
            } else {
                f64::NAN
            }
        })
        .collect()
}
