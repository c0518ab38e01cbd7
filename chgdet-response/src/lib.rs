pub mod builder;
pub mod config;
pub mod error;
pub mod stats;
pub mod table;
pub mod window;

pub use builder::ResponseTableBuilder;
pub use config::ResponseConfig;
pub use error::ExtractError;
pub use stats::{anova_p_value, response_stats, ResponseStats};
pub use table::{FlashResponse, ResponseTables, TrialResponse};
pub use window::{extract, Extracted};
