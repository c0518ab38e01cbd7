use serde::{Deserialize, Serialize};

use crate::channel::SignalChannel;
use crate::error::SessionError;
use crate::running::EncoderSample;
use crate::schema::{SessionFormat, TrialLog};
use crate::trial::ResponseWindow;

/// Everything recorded in one behavior session, as handed over by the data-access layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// frame durations in milliseconds
    pub vsync_intervals_ms: Vec<f64>,
    pub trial_log: TrialLog,
    /// frames on which the lick sensor was in contact
    #[serde(default)]
    pub lick_frames: Vec<usize>,
    #[serde(default)]
    pub rewards: Vec<RewardRecord>,
    #[serde(default)]
    pub stimulus_log: Vec<FlashRecord>,
    /// explicit omission log; omissions are inferred from blank gaps when absent
    #[serde(default)]
    pub omitted_flash_frames: Option<Vec<usize>>,
    #[serde(default)]
    pub params: TaskParameters,
    #[serde(default)]
    pub encoder: Vec<EncoderSample>,
    #[serde(default)]
    pub channels: Vec<SignalChannel>,
}

impl SessionRecord {
    pub fn format(&self) -> SessionFormat {
        self.trial_log.format()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub frame: usize,
    #[serde(default)]
    pub volume: f64,
}

/// A contiguous run of drawn frames of one stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashRecord {
    pub frame: usize,
    pub end_frame: usize,
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub image_category: Option<String>,
    #[serde(default)]
    pub orientation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParameters {
    /// seconds of gray screen between flashes
    pub blank_duration: f64,
    /// seconds each flash is shown
    pub stimulus_duration: f64,
    pub response_window: ResponseWindow,
    /// whether stimuli are flashed on a fixed schedule (omissions only exist if so)
    pub periodic_flash: bool,
}

impl Default for TaskParameters {
    fn default() -> Self {
        Self {
            blank_duration: 0.5,
            stimulus_duration: 0.25,
            response_window: ResponseWindow::default(),
            periodic_flash: true,
        }
    }
}

impl TaskParameters {
    /// Durations must be positive and finite and the response window ordered.
    pub fn validate(&self) -> Result<(), SessionError> {
        for (name, value) in [
            ("blank_duration", self.blank_duration),
            ("stimulus_duration", self.stimulus_duration),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SessionError::InvalidConfig {
                    reason: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        ResponseWindow::new(self.response_window.lower, self.response_window.upper)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_session_fills_defaults() {
        let text = r#"{
            "session_id": "s1",
            "vsync_intervals_ms": [16.7, 16.7],
            "trial_log": {"format": "current", "records": [{"start_time": 0.0}]}
        }"#;
        let session: SessionRecord = serde_json::from_str(text).unwrap();
        assert_eq!(session.trial_log.len(), 1);
        assert_eq!(session.params.blank_duration, 0.5);
        assert!(session.omitted_flash_frames.is_none());
    }

    #[test]
    fn missing_vsync_is_rejected() {
        let text = r#"{"session_id": "s1", "trial_log": {"format": "current", "records": []}}"#;
        assert!(serde_json::from_str::<SessionRecord>(text).is_err());
    }

    #[test]
    fn task_parameters_need_positive_durations() {
        assert!(TaskParameters::default().validate().is_ok());
        let zero_blank = TaskParameters {
            blank_duration: 0.0,
            ..Default::default()
        };
        assert!(matches!(zero_blank.validate(), Err(SessionError::InvalidConfig { .. })));
        let nan_flash = TaskParameters {
            stimulus_duration: f64::NAN,
            ..Default::default()
        };
        assert!(nan_flash.validate().is_err());
        let inverted = TaskParameters {
            response_window: ResponseWindow {
                lower: 1.0,
                upper: 0.5,
            },
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
}
