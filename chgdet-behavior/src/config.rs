use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Per-trial derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// licks this long after the first reward count as reward licks
    pub reward_lick_window_s: f64,
    /// trial lengths above this are treated as missing
    pub max_trial_length_s: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            reward_lick_window_s: 3.5,
            max_trial_length_s: 1000.0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), MetricsError> {
        if !(self.reward_lick_window_s > 0.0 && self.max_trial_length_s > 0.0) {
            return Err(MetricsError::InvalidParameter {
                name: "classifier",
                reason: "reward lick window and max trial length must be positive".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// window ends at the current trial
    #[default]
    Trailing,
    /// window is centered on the current trial
    Centered,
}

impl WindowAlignment {
    /// Trials before and after the current one covered by a window of `size`.
    pub fn span(&self, size: usize) -> (usize, usize) {
        match self {
            WindowAlignment::Trailing => (size.saturating_sub(1), 0),
            WindowAlignment::Centered => {
                let left = size / 2;
                (left, size.saturating_sub(left + 1))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub sliding_window: usize,
    pub alignment: WindowAlignment,
    /// rates are clipped into this interval before the inverse normal CDF
    pub clip_bounds: (f64, f64),
    /// clamp rates to [1/2N, 1 - 1/2N] where N is the number of observed trials
    pub trial_count_floor: bool,
    /// trials before and after the current one used for the reward rate
    pub reward_trial_window: usize,
    /// leading trials whose reward rate is infinite
    pub reward_warmup_trials: usize,
    /// a response latency below this counts as correct for the reward rate
    pub correct_latency_s: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            sliding_window: 100,
            alignment: WindowAlignment::Trailing,
            clip_bounds: (0.01, 0.99),
            trial_count_floor: false,
            reward_trial_window: 25,
            reward_warmup_trials: 10,
            correct_latency_s: 1.0,
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> Result<(), MetricsError> {
        let (lower, upper) = self.clip_bounds;
        if !(0.0 < lower && lower < upper && upper < 1.0) {
            return Err(MetricsError::InvalidClipBounds { lower, upper });
        }
        if self.sliding_window == 0 || self.reward_trial_window == 0 {
            return Err(MetricsError::ZeroWindow);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    /// licks and rewards within this long after flash onset belong to the flash
    pub response_window_s: f64,
    /// flashes in the triangular lick/reward rate window
    pub rate_window: usize,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            response_window_s: 0.75,
            rate_window: 320,
        }
    }
}

impl FlashConfig {
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.rate_window == 0 {
            return Err(MetricsError::ZeroWindow);
        }
        if !(self.response_window_s > 0.0) {
            return Err(MetricsError::InvalidParameter {
                name: "flash response window",
                reason: format!("{} s is not positive", self.response_window_s),
            });
        }
        Ok(())
    }
}

/// Everything the behavior stage needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub classifier: ClassifierConfig,
    pub performance: PerformanceConfig,
    pub flashes: FlashConfig,
}

impl BehaviorConfig {
    pub fn validate(&self) -> Result<(), MetricsError> {
        self.classifier.validate()?;
        self.performance.validate()?;
        self.flashes.validate()
    }
}
