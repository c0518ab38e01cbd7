use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncoderError {
    #[error("too few encoder samples: got {got}, need at least {need}")]
    TooFewSamples { got: usize, need: usize },

    #[error("length mismatch in {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("encoder timestamps are not strictly increasing at index {index}")]
    UnorderedTimestamps { index: usize },

    #[error("wrap thresholds must satisfy lower < upper, got ({lower}, {upper})")]
    InvalidThresholds { lower: f64, upper: f64 },

    #[error("knot factor range must start at 1 or more and be non-empty (start {factor})")]
    InvalidKnotFactor { factor: usize },

    #[error("{name} must be positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("spline normal equations are not positive definite at row {row}")]
    SingularSystem { row: usize },

    #[error("no knot factor produced a finite score")]
    NoValidCandidate,
}
