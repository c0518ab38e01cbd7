use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::float_serde;

/// How window means treat a channel's samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// dF/F, running speed, pupil area
    #[default]
    Continuous,
    /// discretized event magnitudes, where a missing sample means no event
    Events,
}

/// A named time series shared by one or more cells.
///
/// `traces[cell]` is parallel to `timestamps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalChannel {
    pub name: String,
    #[serde(default)]
    pub kind: ChannelKind,
    pub timestamps: Vec<f64>,
    #[serde(with = "float_serde::matrix")]
    pub traces: Vec<Vec<f64>>,
    /// Samples per second; estimated from the timestamps when absent.
    #[serde(default)]
    pub frame_rate: Option<f64>,
}

impl SignalChannel {
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<f64>,
        traces: Vec<Vec<f64>>,
    ) -> Result<Self, SessionError> {
        let channel = Self {
            name: name.into(),
            kind: ChannelKind::Continuous,
            timestamps,
            traces,
            frame_rate: None,
        };
        channel.validate()?;
        Ok(channel)
    }

    pub fn single(
        name: impl Into<String>,
        timestamps: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, SessionError> {
        Self::new(name, timestamps, vec![values])
    }

    pub fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Checks parallel lengths and strictly increasing timestamps.
    pub fn validate(&self) -> Result<(), SessionError> {
        for (cell, trace) in self.traces.iter().enumerate() {
            if trace.len() != self.timestamps.len() {
                return Err(SessionError::ShapeMismatch {
                    what: format!("{} trace {cell}", self.name),
                    expected: self.timestamps.len(),
                    got: trace.len(),
                });
            }
        }
        if let Some(index) = self
            .timestamps
            .windows(2)
            .position(|w| !(w[1] > w[0]))
        {
            return Err(SessionError::UnorderedTimestamps {
                channel: self.name.clone(),
                index: index + 1,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn n_cells(&self) -> usize {
        self.traces.len()
    }

    pub fn trace(&self, cell: usize) -> Option<&[f64]> {
        self.traces.get(cell).map(Vec::as_slice)
    }
}
