//! Rotary-encoder running signal: wrap detection, unwrapping, differentiation, outlier control
//! and spline smoothing.

pub mod config;
pub mod derivative;
pub mod error;
pub mod optimize;
pub mod outliers;
pub mod pipeline;
pub mod spline;
pub mod unwrap;

pub use config::{EncoderConfig, VMaxSource};
pub use derivative::deriv;
pub use error::EncoderError;
pub use optimize::{optimize_knot_factor, Candidate, KnotSearch};
pub use outliers::{suppress_wrap_outliers, zscore_filter};
pub use pipeline::{process_encoder, smoothed_running, speed_channel, RunningSample};
pub use spline::BSpline;
pub use unwrap::{unwrap_encoder, wrap_ids, Unwrapped};
