use serde::{Deserialize, Serialize};

/// One rotary-encoder acquisition sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderSample {
    pub time: f64,
    /// wrapped signal voltage, nominally 0..v_in
    pub v_sig: f64,
    /// encoder reference voltage
    pub v_in: f64,
}

impl EncoderSample {
    pub fn new(time: f64, v_sig: f64, v_in: f64) -> Self {
        Self { time, v_sig, v_in }
    }
}
