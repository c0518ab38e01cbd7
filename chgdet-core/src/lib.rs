pub mod channel;
pub mod error;
pub mod float_serde;
pub mod running;
pub mod schema;
pub mod session;
pub mod stimulus;
pub mod trial;

pub use channel::{ChannelKind, SignalChannel};
pub use error::SessionError;
pub use running::EncoderSample;
pub use schema::{LegacyTrialRecord, SessionFormat, TrialLog, TrialRecord};
pub use session::{FlashRecord, RewardRecord, SessionRecord, TaskParameters};
pub use stimulus::{IdentityKind, StimulusFlash, StimulusIdentity};
pub use trial::{ClassifiedTrial, ResponseType, ResponseWindow, Trial, TrialMetrics, TrialType};
