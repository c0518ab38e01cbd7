//! Trial-log layouts.
//!
//! Recording software changed its trial format over time. Instead of probing for columns at every
//! access, the log is tagged with its layout when it is read and resolved once.

use serde::{Deserialize, Deserializer, Serialize};

use crate::trial::ResponseWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFormat {
    /// frame-indexed trial records
    Legacy,
    /// trial records carry times in seconds
    #[default]
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "records", rename_all = "snake_case")]
pub enum TrialLog {
    Legacy(Vec<LegacyTrialRecord>),
    Current(Vec<TrialRecord>),
}

impl TrialLog {
    pub fn format(&self) -> SessionFormat {
        match self {
            TrialLog::Legacy(_) => SessionFormat::Legacy,
            TrialLog::Current(_) => SessionFormat::Current,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TrialLog::Legacy(r) => r.len(),
            TrialLog::Current(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TrialLog {
    fn default() -> Self {
        TrialLog::Current(Vec::new())
    }
}

/// Frame-indexed trial record of the older recording format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyTrialRecord {
    #[serde(alias = "startframe")]
    pub start_frame: usize,
    #[serde(default)]
    pub change_frame: Option<usize>,
    #[serde(default)]
    pub lick_frames: Vec<usize>,
    #[serde(default)]
    pub reward_frames: Vec<usize>,
    #[serde(default, alias = "auto_rearded")]
    pub auto_rewarded: Option<bool>,
    #[serde(default, deserialize_with = "rewarded_flag")]
    pub rewarded: Option<bool>,
    #[serde(default)]
    pub response_window: Option<ResponseWindow>,
}

/// Trial record with times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub start_time: f64,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub change_time: Option<f64>,
    #[serde(default)]
    pub lick_times: Vec<f64>,
    #[serde(default)]
    pub reward_times: Vec<f64>,
    #[serde(default)]
    pub auto_rewarded: Option<bool>,
    #[serde(default, deserialize_with = "rewarded_flag")]
    pub rewarded: Option<bool>,
    #[serde(default)]
    pub response_window: Option<ResponseWindow>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Reads `true`/`false`/`1`/`0`/`null`. Any other number is indeterminate.
pub fn rewarded_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let raw = Option::<RawFlag>::deserialize(d)?;
    Ok(match raw {
        None => None,
        Some(RawFlag::Bool(b)) => Some(b),
        Some(RawFlag::Int(1)) => Some(true),
        Some(RawFlag::Int(0)) => Some(false),
        Some(RawFlag::Int(_)) => None,
        Some(RawFlag::Float(f)) if f == 1.0 => Some(true),
        Some(RawFlag::Float(f)) if f == 0.0 => Some(false),
        Some(RawFlag::Float(_)) => None,
    })
}
