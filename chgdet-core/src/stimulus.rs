use chgdet_cache::Atom;
use serde::{Deserialize, Serialize};

use crate::float_serde;

/// What was on screen during a flash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StimulusIdentity {
    Image(Atom),
    Orientation(f64),
}

impl StimulusIdentity {
    pub fn kind(&self) -> IdentityKind {
        match self {
            StimulusIdentity::Image(_) => IdentityKind::Image,
            StimulusIdentity::Orientation(_) => IdentityKind::Orientation,
        }
    }

    pub fn image_name(&self) -> Option<&str> {
        match self {
            StimulusIdentity::Image(name) => Some(name),
            StimulusIdentity::Orientation(_) => None,
        }
    }

    /// Text label used in response tables ("im065", "90").
    pub fn label(&self) -> String {
        match self {
            StimulusIdentity::Image(name) => name.to_string(),
            StimulusIdentity::Orientation(ori) => format!("{ori}"),
        }
    }
}

/// Attribute set a session's flashes are classified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Image,
    Orientation,
}

/// One stimulus presentation, or one omitted presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusFlash {
    pub flash_index: usize,
    pub frame: usize,
    pub time: f64,
    pub duration: f64,
    /// `None` for omitted flashes
    pub identity: Option<StimulusIdentity>,
    pub image_category: Option<String>,
    pub omitted: bool,
    /// identity differs from the previous shown flash
    pub change: bool,
    pub licked: bool,
    pub rewarded: bool,
    #[serde(with = "float_serde")]
    pub lick_rate: f64,
    #[serde(with = "float_serde")]
    pub reward_rate: f64,
    /// consecutive presentations of the same identity, starting at 1
    pub repeat: Option<u32>,
    pub image_block: Option<usize>,
    /// rewards/min of the upcoming trial
    #[serde(with = "float_serde")]
    pub trial_reward_rate: f64,
}

impl StimulusFlash {
    pub fn label(&self) -> Option<String> {
        self.identity.as_ref().map(StimulusIdentity::label)
    }
}
