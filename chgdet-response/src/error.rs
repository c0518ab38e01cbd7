use chgdet_core::SessionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// The window around an event reaches past the channel; the event is dropped.
    #[error("window [{start}, {end}] around t = {event_time} leaves channel of length {len}")]
    OutOfRangeWindow {
        event_time: f64,
        start: i64,
        end: i64,
        len: usize,
    },

    #[error("event time {event_time} is not finite")]
    NonFiniteEvent { event_time: f64 },

    #[error("frame rate {frame_rate} is not a positive finite number")]
    InvalidFrameRate { frame_rate: f64 },

    #[error("window [{start}, {end}] s is empty or reversed")]
    InvalidWindow { start: f64, end: f64 },

    #[error("response duration {duration} s must be positive")]
    InvalidDuration { duration: f64 },

    #[error(transparent)]
    Session(#[from] SessionError),
}
