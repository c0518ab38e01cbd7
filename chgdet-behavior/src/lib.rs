pub mod config;
pub mod error;
pub mod flashes;
pub mod reward;
pub mod session;
pub mod state;
pub mod stats;
pub mod trial;
pub use config::{BehaviorConfig, ClassifierConfig, FlashConfig, PerformanceConfig, WindowAlignment};
pub use error::MetricsError;
pub use flashes::{classify_flashes, FlashInput};
pub use reward::reward_rates;
pub use session::{dedup_lick_frames, materialize_trials, BehaviorSession};
pub use state::{
    annotate_performance, dprime, rolling_rates, trial_number_limit, PerformanceState, RateSample,
    RateWindow,
};
pub use trial::{
    check_response, classify, classify_trial, classify_trials, response_latency, response_type,
    Classification,
};
