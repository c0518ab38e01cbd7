use chgdet_core::SessionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("clip bounds must satisfy 0 < lower < upper < 1, got ({lower}, {upper})")]
    InvalidClipBounds { lower: f64, upper: f64 },

    #[error("rolling window size must be at least one trial")]
    ZeroWindow,

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}
