use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Window layout per event family, in seconds around the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub trial_window: (f64, f64),
    pub flash_window: (f64, f64),
    pub omission_window: (f64, f64),
    /// length of the response and baseline sub-windows
    pub response_duration_s: f64,
    /// rows whose trial earns more rewards/min than this are engaged
    pub engaged_threshold: f64,
    /// flashes with an index at or below this are skipped
    pub min_flash_index: usize,
    pub exclude_autorewarded: bool,
    /// overrides the channels' own sampling rate
    pub frame_rate: Option<f64>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            trial_window: (-4.0, 4.0),
            flash_window: (-0.5, 0.5),
            omission_window: (-3.0, 3.0),
            response_duration_s: 0.5,
            engaged_threshold: 2.0,
            min_flash_index: 10,
            exclude_autorewarded: true,
            frame_rate: None,
        }
    }
}

fn check_window((start, end): (f64, f64)) -> Result<(), ExtractError> {
    if start.is_finite() && end.is_finite() && start < end {
        Ok(())
    } else {
        Err(ExtractError::InvalidWindow { start, end })
    }
}

impl ResponseConfig {
    pub fn validate(&self) -> Result<(), ExtractError> {
        check_window(self.trial_window)?;
        check_window(self.flash_window)?;
        check_window(self.omission_window)?;
        if !(self.response_duration_s > 0.0) {
            return Err(ExtractError::InvalidDuration {
                duration: self.response_duration_s,
            });
        }
        if let Some(frame_rate) = self.frame_rate {
            if !(frame_rate.is_finite() && frame_rate > 0.0) {
                return Err(ExtractError::InvalidFrameRate { frame_rate });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ResponseConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.omission_window, (-3.0, 3.0));
    }

    #[test]
    fn rejects_reversed_window() {
        let cfg = ResponseConfig {
            flash_window: (0.5, -0.5),
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ExtractError::InvalidWindow { start: 0.5, end: -0.5 })
        );
    }
}
