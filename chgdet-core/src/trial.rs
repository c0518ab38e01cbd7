use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;
use crate::float_serde;

/// Interval, in seconds after the change, in which a lick counts as a response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseWindow {
    pub lower: f64,
    pub upper: f64,
}

impl ResponseWindow {
    pub fn new(lower: f64, upper: f64) -> Result<Self, SessionError> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(SessionError::InvalidConfig {
                reason: format!("response window [{lower}, {upper}] must satisfy lower < upper"),
            });
        }
        Ok(Self { lower, upper })
    }

    /// Closed-interval membership.
    pub fn contains(&self, latency: f64) -> bool {
        self.lower <= latency && latency <= self.upper
    }
}

impl Default for ResponseWindow {
    fn default() -> Self {
        Self {
            lower: 0.15,
            upper: 1.0,
        }
    }
}

/// One attempt cycle, times in seconds on the stimulus clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub trial_index: usize,
    pub change_time: Option<f64>,
    pub lick_times: Vec<f64>,
    pub reward_times: Vec<f64>,
    pub auto_rewarded: bool,
    /// `None` when the record carries no determinate reward flag.
    pub rewarded: Option<bool>,
    pub response_window: ResponseWindow,
    pub start_time: f64,
    pub end_time: f64,
}

/// Trial taxonomy. Exactly one applies to every trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    /// lick before the change
    Aborted,
    /// reward delivered automatically at the change
    Autorewarded,
    /// change shown, rewarded if licked within the response window
    Go,
    /// sham change
    Catch,
    /// matches none of the above
    Other,
}

impl TrialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialType::Aborted => "aborted",
            TrialType::Autorewarded => "autorewarded",
            TrialType::Go => "go",
            TrialType::Catch => "catch",
            TrialType::Other => "other",
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseType {
    #[serde(rename = "HIT")]
    Hit,
    #[serde(rename = "MISS")]
    Miss,
    #[serde(rename = "FA")]
    FalseAlarm,
    #[serde(rename = "CR")]
    CorrectRejection,
    #[serde(rename = "other")]
    Other,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseType::Hit => "HIT",
            ResponseType::Miss => "MISS",
            ResponseType::FalseAlarm => "FA",
            ResponseType::CorrectRejection => "CR",
            ResponseType::Other => "other",
        })
    }
}

/// Rolling performance values attached to a trial. NaN means no data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialMetrics {
    #[serde(with = "float_serde")]
    pub hit_rate: f64,
    #[serde(with = "float_serde")]
    pub catch_rate: f64,
    #[serde(with = "float_serde")]
    pub d_prime: f64,
    /// rewards per minute; infinite for the first trials of a session
    #[serde(with = "float_serde")]
    pub reward_rate: f64,
}

impl Default for TrialMetrics {
    fn default() -> Self {
        Self {
            hit_rate: f64::NAN,
            catch_rate: f64::NAN,
            d_prime: f64::NAN,
            reward_rate: f64::NAN,
        }
    }
}

/// A trial with every derived behavioral field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTrial {
    pub trial: Trial,
    pub trial_type: TrialType,
    pub response: bool,
    pub response_latency: Option<f64>,
    pub response_type: ResponseType,
    /// go trial
    pub change: bool,
    /// responded
    pub detect: bool,
    #[serde(with = "float_serde")]
    pub trial_length: f64,
    pub reward_lick_count: Option<usize>,
    pub reward_lick_latency: Option<f64>,
    pub metrics: TrialMetrics,
}

impl ClassifiedTrial {
    pub fn index(&self) -> usize {
        self.trial.trial_index
    }

    pub fn change_time(&self) -> Option<f64> {
        self.trial.change_time
    }
}
