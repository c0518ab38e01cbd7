use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chgdet_behavior::BehaviorConfig;
use chgdet_encoder::EncoderConfig;
use chgdet_response::ResponseConfig;
use serde::{Deserialize, Serialize};

/// Every stage's parameters. Fields missing from a config file keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub behavior: BehaviorConfig,
    pub encoder: EncoderConfig,
    pub response: ResponseConfig,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.behavior.validate().context("behavior config")?;
        self.encoder.validate().context("encoder config")?;
        self.response.validate().context("response config")?;
        Ok(())
    }
}
