//! Error types for session materialization.

use thiserror::Error;

/// Failures that make a session (or a piece of its input) unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A required attribute is absent and no fallback exists
    #[error("missing field: {field}")]
    MissingField {
        /// Attribute name as it appears in the session record
        field: &'static str,
    },

    /// The stimulus clock has no frames
    #[error("empty time base: no vsync intervals")]
    EmptyTimeBase,

    /// A frame index points past the end of the time base
    #[error("frame {frame} out of range for time base with {n_frames} frames")]
    FrameOutOfRange {
        /// Offending frame index
        frame: usize,
        /// Number of frames in the time base
        n_frames: usize,
    },

    /// Parallel arrays disagree in length or ordering
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Which structure is malformed
        what: String,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Timestamps must be strictly increasing
    #[error("timestamps of {channel} are not strictly increasing at index {index}")]
    UnorderedTimestamps {
        /// Channel name
        channel: String,
        /// First index violating the ordering
        index: usize,
    },

    /// Rejected configuration or parameter value
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Human-readable reason
        reason: String,
    },
}
