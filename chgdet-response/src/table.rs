//! Rows of the response tables.
//!
//! One row per (event, channel, cell). Traces are stored with timestamps relative to the event so
//! rows from different events line up.

use chgdet_core::{float_serde, ClassifiedTrial, TrialType};
use serde::Serialize;

use crate::stats::ResponseStats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResponse {
    pub trial_index: usize,
    pub channel: String,
    pub cell: usize,
    #[serde(with = "float_serde::vec")]
    pub trace: Vec<f64>,
    pub trace_timestamps: Vec<f64>,
    #[serde(flatten)]
    pub stats: ResponseStats,
    /// mean running speed over the response window; missing without a running channel
    #[serde(with = "float_serde")]
    pub mean_running_speed: f64,
    /// reward rate of the trial above the engagement threshold
    pub engaged: bool,
    pub behavior: ClassifiedTrial,
}

/// A shown or omitted flash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashResponse {
    pub flash_index: usize,
    pub channel: String,
    pub cell: usize,
    pub start_time: f64,
    pub image_name: Option<String>,
    pub repeat: Option<u32>,
    pub image_block: Option<usize>,
    #[serde(with = "float_serde")]
    pub trial_reward_rate: f64,
    pub engaged: bool,
    pub change: bool,
    pub omitted: bool,
    /// type of the trial whose change coincides with this flash
    pub trial_type: Option<TrialType>,
    /// image with the largest mean response for this cell
    pub pref_stim: bool,
    #[serde(with = "float_serde::vec")]
    pub trace: Vec<f64>,
    pub trace_timestamps: Vec<f64>,
    #[serde(flatten)]
    pub stats: ResponseStats,
    #[serde(with = "float_serde")]
    pub mean_running_speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseTables {
    pub trials: Vec<TrialResponse>,
    pub flashes: Vec<FlashResponse>,
    pub omissions: Vec<FlashResponse>,
}

impl ResponseTables {
    pub fn len(&self) -> usize {
        self.trials.len() + self.flashes.len() + self.omissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
