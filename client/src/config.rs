use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::codec::{CodecParams, DurationUnit, MAX_DECIMALS};
use crate::contract::ConfirmationPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Key into the artifact's `networks` table
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfig {
    /// Fixed-point scale of the accepted rate
    #[serde(default = "default_rate_decimals")]
    pub rate_decimals: u8,
    /// Unit the loan duration input is typed in
    #[serde(default)]
    pub duration_unit: DurationUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

fn default_rate_decimals() -> u8 {
    18
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_confirmations() -> u64 {
    1
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            rate_decimals: default_rate_decimals(),
            duration_unit: DurationUnit::default(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmations: default_confirmations(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate; the web build embeds its config at compile time
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!(
            "Loaded client config: network {}, rate decimals {}, duration in {}",
            config.network.id,
            config.codec.rate_decimals,
            config.codec.duration_unit.label()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.id.trim().is_empty() {
            anyhow::bail!("network.id must not be empty");
        }
        if self.codec.rate_decimals > MAX_DECIMALS {
            anyhow::bail!(
                "codec.rate_decimals is {}, at most {} fit in a uint256",
                self.codec.rate_decimals,
                MAX_DECIMALS
            );
        }
        let confirmation = &self.confirmation;
        if confirmation.confirmations == 0 {
            anyhow::bail!("confirmation.confirmations must be at least 1");
        }
        if confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be positive");
        }
        if Duration::from_secs(confirmation.timeout_secs)
            <= Duration::from_millis(confirmation.poll_interval_ms)
        {
            anyhow::bail!(
                "confirmation.timeout_secs ({}s) must exceed the poll interval ({}ms)",
                confirmation.timeout_secs,
                confirmation.poll_interval_ms
            );
        }
        Ok(())
    }

    pub fn codec_params(&self) -> CodecParams {
        CodecParams {
            rate_decimals: self.codec.rate_decimals,
            duration_unit: self.codec.duration_unit,
        }
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_secs(self.confirmation.timeout_secs),
            poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms),
            confirmations: self.confirmation.confirmations,
        }
    }
}
