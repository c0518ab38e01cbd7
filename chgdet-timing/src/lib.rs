pub mod clock;

pub use clock::{interval_stats, nearest_index, FrameClock, IntervalStats, VsyncClock};
