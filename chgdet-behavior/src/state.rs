//! Rolling hit and catch rates as an explicit fold over the ordered trial stream.

use std::collections::VecDeque;

use chgdet_core::{ClassifiedTrial, TrialMetrics, TrialType};

use crate::config::PerformanceConfig;
use crate::error::MetricsError;
use crate::reward::reward_rates;
use crate::stats::norm_ppf;

/// Observed outcomes of the trials currently inside a window, keyed by trial position.
#[derive(Debug, Clone, Default)]
pub struct RateWindow {
    entries: VecDeque<(usize, bool)>,
    responded: usize,
}

impl RateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the trial at `position`. `None` marks a trial that does not count toward this rate.
    pub fn push(&mut self, position: usize, outcome: Option<bool>) {
        if let Some(responded) = outcome {
            self.entries.push_back((position, responded));
            self.responded += usize::from(responded);
        }
    }

    /// Drops observations from positions before `first`.
    pub fn evict_before(&mut self, first: usize) {
        while let Some(&(pos, responded)) = self.entries.front() {
            if pos >= first {
                break;
            }
            self.responded -= usize::from(responded);
            self.entries.pop_front();
        }
    }

    pub fn observed(&self) -> usize {
        self.entries.len()
    }

    /// Mean of observed outcomes, NaN when the window holds none.
    pub fn rate(&self) -> f64 {
        if self.entries.is_empty() {
            f64::NAN
        } else {
            self.responded as f64 / self.entries.len() as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub hit_rate: f64,
    pub catch_rate: f64,
    pub n_go: usize,
    pub n_catch: usize,
}

/// Running state: go and catch windows plus how far into the trial stream they have been fed.
///
/// A window with no observations repeats the last rate it produced, together with that rate's
/// observation count.
#[derive(Debug, Clone)]
pub struct PerformanceState {
    go: RateWindow,
    catch: RateWindow,
    fed: usize,
    left: usize,
    right: usize,
    last_go: (f64, usize),
    last_catch: (f64, usize),
}

/// Current rate of `window`, or `last` when it holds nothing.
fn filled(window: &RateWindow, last: &mut (f64, usize)) -> (f64, usize) {
    if window.observed() > 0 {
        *last = (window.rate(), window.observed());
    }
    *last
}

impl PerformanceState {
    pub fn new(config: &PerformanceConfig) -> Self {
        let (left, right) = config.alignment.span(config.sliding_window);
        Self {
            go: RateWindow::new(),
            catch: RateWindow::new(),
            fed: 0,
            left,
            right,
            last_go: (f64::NAN, 0),
            last_catch: (f64::NAN, 0),
        }
    }

    fn feed(&mut self, trial: &ClassifiedTrial) {
        let pos = self.fed;
        let (go, catch) = match trial.trial_type {
            TrialType::Go => (Some(trial.response), None),
            TrialType::Catch => (None, Some(trial.response)),
            _ => (None, None),
        };
        self.go.push(pos, go);
        self.catch.push(pos, catch);
        self.fed += 1;
    }

    /// Moves the window onto the trial at `position` and returns its rates.
    pub fn step(&mut self, position: usize, trials: &[ClassifiedTrial]) -> RateSample {
        let last = (position + self.right).min(trials.len().saturating_sub(1));
        while self.fed <= last && self.fed < trials.len() {
            self.feed(&trials[self.fed]);
        }
        let first = position.saturating_sub(self.left);
        self.go.evict_before(first);
        self.catch.evict_before(first);
        let (hit_rate, n_go) = filled(&self.go, &mut self.last_go);
        let (catch_rate, n_catch) = filled(&self.catch, &mut self.last_catch);
        RateSample {
            hit_rate,
            catch_rate,
            n_go,
            n_catch,
        }
    }
}

/// One rate sample per trial, in trial order.
pub fn rolling_rates(trials: &[ClassifiedTrial], config: &PerformanceConfig) -> Vec<RateSample> {
    let mut state = PerformanceState::new(config);
    (0..trials.len()).map(|i| state.step(i, trials)).collect()
}

/// Clamps a rate estimated from `n` observations to `[1/2n, 1 - 1/2n]`.
pub fn trial_number_limit(rate: f64, n: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    let floor = 1.0 / (2.0 * n as f64);
    rate.clamp(floor, 1.0 - floor)
}

pub fn dprime(hit_rate: f64, fa_rate: f64, clip_bounds: (f64, f64)) -> Result<f64, MetricsError> {
    let (lower, upper) = clip_bounds;
    if !(0.0 < lower && lower < upper && upper < 1.0) {
        return Err(MetricsError::InvalidClipBounds { lower, upper });
    }
    if hit_rate.is_nan() || fa_rate.is_nan() {
        return Ok(f64::NAN);
    }
    Ok(norm_ppf(hit_rate.clamp(lower, upper)) - norm_ppf(fa_rate.clamp(lower, upper)))
}

/// Returns a copy of `trials` with rolling hit rate, catch rate, d-prime and reward rate filled in.
pub fn annotate_performance(
    trials: &[ClassifiedTrial],
    config: &PerformanceConfig,
) -> Result<Vec<ClassifiedTrial>, MetricsError> {
    config.validate()?;
    let rates = rolling_rates(trials, config);
    let reward = reward_rates(trials, config);

    trials
        .iter()
        .zip(rates)
        .zip(reward)
        .map(|((trial, sample), reward_rate)| {
            let (hit_rate, catch_rate) = if config.trial_count_floor {
                (
                    trial_number_limit(sample.hit_rate, sample.n_go),
                    trial_number_limit(sample.catch_rate, sample.n_catch),
                )
            } else {
                (sample.hit_rate, sample.catch_rate)
            };
            let d_prime = dprime(hit_rate, catch_rate, config.clip_bounds)?;
            Ok(ClassifiedTrial {
                metrics: TrialMetrics {
                    hit_rate,
                    catch_rate,
                    d_prime,
                    reward_rate,
                },
                ..trial.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowAlignment;
    use chgdet_core::{ResponseType, ResponseWindow, Trial};

    fn row(trial_type: TrialType, response: bool) -> ClassifiedTrial {
        ClassifiedTrial {
            trial: Trial {
                trial_index: 0,
                change_time: Some(1.0),
                lick_times: Vec::new(),
                reward_times: Vec::new(),
                auto_rewarded: false,
                rewarded: None,
                response_window: ResponseWindow::default(),
                start_time: 0.0,
                end_time: 0.0,
            },
            trial_type,
            response,
            response_latency: None,
            response_type: ResponseType::Other,
            change: trial_type == TrialType::Go,
            detect: response,
            trial_length: f64::NAN,
            reward_lick_count: None,
            reward_lick_latency: None,
            metrics: TrialMetrics::default(),
        }
    }

    #[test]
    fn window_tracks_observed_outcomes() {
        let mut w = RateWindow::new();
        assert!(w.rate().is_nan());
        w.push(0, Some(true));
        w.push(1, None);
        w.push(2, Some(false));
        assert_eq!(w.observed(), 2);
        assert_eq!(w.rate(), 0.5);
        w.evict_before(1);
        assert_eq!(w.rate(), 0.0);
    }

    #[test]
    fn trailing_rates_carry_through_non_go_trials() {
        let trials = vec![
            row(TrialType::Go, true),
            row(TrialType::Aborted, false),
            row(TrialType::Go, false),
            row(TrialType::Catch, true),
        ];
        let cfg = PerformanceConfig {
            sliding_window: 3,
            ..Default::default()
        };
        let rates = rolling_rates(&trials, &cfg);
        assert_eq!(rates[0].hit_rate, 1.0);
        assert!(rates[0].catch_rate.is_nan());
        assert_eq!(rates[1].hit_rate, 1.0);
        assert_eq!(rates[2].hit_rate, 0.5);
        // window [1, 3] no longer holds the first go trial
        assert_eq!(rates[3].hit_rate, 0.0);
        assert_eq!(rates[3].catch_rate, 1.0);
    }

    #[test]
    fn empty_windows_repeat_the_last_rate() {
        let mut trials = vec![row(TrialType::Go, true)];
        trials.extend((0..4).map(|_| row(TrialType::Aborted, false)));
        trials.push(row(TrialType::Catch, false));
        trials.push(row(TrialType::Aborted, false));
        let cfg = PerformanceConfig {
            sliding_window: 3,
            ..Default::default()
        };
        let rates = rolling_rates(&trials, &cfg);
        assert!(rates.iter().all(|r| r.hit_rate == 1.0 && r.n_go == 1));
        // no catch trial seen yet
        assert!(rates[..5].iter().all(|r| r.catch_rate.is_nan() && r.n_catch == 0));
        assert_eq!(rates[5].catch_rate, 0.0);
        assert_eq!(rates[6].catch_rate, 0.0);

        let out = annotate_performance(
            &trials,
            &PerformanceConfig {
                trial_count_floor: true,
                ..cfg
            },
        )
        .unwrap();
        assert_eq!(out[4].metrics.hit_rate, 0.5);
    }

    #[test]
    fn centered_window_looks_ahead() {
        let trials = vec![
            row(TrialType::Go, false),
            row(TrialType::Go, true),
            row(TrialType::Go, true),
        ];
        let cfg = PerformanceConfig {
            sliding_window: 3,
            alignment: WindowAlignment::Centered,
            ..Default::default()
        };
        let rates = rolling_rates(&trials, &cfg);
        assert_eq!(rates[0].hit_rate, 0.5);
        assert!((rates[1].hit_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(rates[2].hit_rate, 1.0);
    }

    #[test]
    fn trial_count_floor() {
        assert!(trial_number_limit(0.5, 0).is_nan());
        assert_eq!(trial_number_limit(1.0, 10), 0.95);
        assert_eq!(trial_number_limit(0.0, 10), 0.05);
        assert_eq!(trial_number_limit(0.3, 10), 0.3);
    }

    #[test]
    fn dprime_is_finite_at_extremes() {
        let d = dprime(1.0, 0.0, (0.01, 0.99)).unwrap();
        assert!(d.is_finite());
        assert!((d - 2.0 * norm_ppf(0.99)).abs() < 1e-9);
        assert!(dprime(f64::NAN, 0.2, (0.01, 0.99)).unwrap().is_nan());
        assert!(dprime(0.5, 0.5, (0.5, 0.4)).is_err());
    }

    #[test]
    fn annotate_returns_new_rows() {
        let trials = vec![row(TrialType::Go, true), row(TrialType::Catch, false)];
        let out = annotate_performance(&trials, &PerformanceConfig::default()).unwrap();
        assert!(trials[1].metrics.hit_rate.is_nan());
        assert_eq!(out[1].metrics.hit_rate, 1.0);
        assert_eq!(out[1].metrics.catch_rate, 0.0);
        assert!(out[1].metrics.d_prime > 4.0);
        assert_eq!(out[0].metrics.reward_rate, f64::INFINITY);
    }
}
