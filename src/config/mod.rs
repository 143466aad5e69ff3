//! Configuration management for the momentum rotator.
//!
//! Loads settings from environment variables and config files.

use crate::error::GatewayError;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Binance API credentials
    #[serde(default)]
    pub binance: BinanceConfig,
    /// Telegram operator channel
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Rotation policy parameters
    #[serde(default)]
    pub rotation: RotationConfig,
    /// Outer retry backoffs
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Use testnet instead of production
    #[serde(default)]
    pub testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_token: String,
    /// Target chat identifier
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Stable asset every position is valued and settled in
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Asset dust holdings are consolidated into
    #[serde(default = "default_sink_asset")]
    pub sink_asset: String,
    /// Symbol that pads the target list when fewer candidates qualify
    #[serde(default = "default_fallback_symbol")]
    pub fallback_symbol: String,
    /// Number of acquisition slots per run
    #[serde(default = "default_target_positions")]
    pub target_positions: usize,
    /// Quote amount subtracted from each per-symbol budget to cover fees
    #[serde(default = "default_fee_buffer")]
    pub fee_buffer: Decimal,
    /// Holdings below this quote value are treated as dust
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold: Decimal,
    /// Minimum weekly gain (percent) for a candidate to qualify
    #[serde(default = "default_min_weekly_gain_pct")]
    pub min_weekly_gain_pct: Decimal,
    /// Number of daily closes required for the momentum window
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Size cap of the market-capitalization universe
    #[serde(default = "default_universe_size")]
    pub universe_size: u32,
    /// Delay after each submitted order, seconds
    #[serde(default = "default_order_delay_secs")]
    pub order_delay_secs: u64,
    /// Delay after the liquidation pass before capital math, seconds
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
}

impl RotationConfig {
    pub fn order_delay(&self) -> Duration {
        Duration::from_secs(self.order_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Backoff after connectivity loss, seconds
    #[serde(default = "default_connectivity_backoff_secs")]
    pub connectivity_backoff_secs: u64,
    /// Backoff after a read timeout, seconds
    #[serde(default = "default_timeout_backoff_secs")]
    pub timeout_backoff_secs: u64,
    /// Backoff after any other fault, seconds
    #[serde(default = "default_fault_backoff_secs")]
    pub fault_backoff_secs: u64,
}

impl RetryConfig {
    /// Backoff before the next full-run attempt for the given fault.
    pub fn backoff_for(&self, error: &GatewayError) -> Duration {
        let secs = match error {
            GatewayError::Connectivity(_) => self.connectivity_backoff_secs,
            GatewayError::Timeout(_) => self.timeout_backoff_secs,
            GatewayError::Api(_) | GatewayError::Parse(_) => self.fault_backoff_secs,
        };
        Duration::from_secs(secs)
    }
}

// Default value functions
fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_sink_asset() -> String {
    "BNB".to_string()
}

fn default_fallback_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_target_positions() -> usize {
    5
}

fn default_fee_buffer() -> Decimal {
    Decimal::new(1, 1) // 0.1 quote units per order
}

fn default_dust_threshold() -> Decimal {
    Decimal::ONE // holdings under 1 quote unit are dust
}

fn default_min_weekly_gain_pct() -> Decimal {
    Decimal::new(30, 0)
}

fn default_lookback_days() -> u32 {
    7
}

fn default_universe_size() -> u32 {
    200
}

fn default_order_delay_secs() -> u64 {
    5
}

fn default_settle_delay_secs() -> u64 {
    10
}

fn default_connectivity_backoff_secs() -> u64 {
    20 * 60
}

fn default_timeout_backoff_secs() -> u64 {
    60
}

fn default_fault_backoff_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("ROTATOR"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.rotation.quote_asset != self.rotation.sink_asset,
            "quote_asset and sink_asset must differ"
        );

        anyhow::ensure!(
            self.rotation.target_positions >= 1,
            "target_positions must be at least 1"
        );

        anyhow::ensure!(
            self.rotation.lookback_days >= 2,
            "lookback_days must cover at least two closes"
        );

        anyhow::ensure!(
            self.rotation.fee_buffer >= Decimal::ZERO,
            "fee_buffer must not be negative"
        );

        anyhow::ensure!(
            self.rotation.dust_threshold > Decimal::ZERO,
            "dust_threshold must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binance: BinanceConfig::default(),
            telegram: TelegramConfig::default(),
            rotation: RotationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            testnet: false,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            quote_asset: default_quote_asset(),
            sink_asset: default_sink_asset(),
            fallback_symbol: default_fallback_symbol(),
            target_positions: default_target_positions(),
            fee_buffer: default_fee_buffer(),
            dust_threshold: default_dust_threshold(),
            min_weekly_gain_pct: default_min_weekly_gain_pct(),
            lookback_days: default_lookback_days(),
            universe_size: default_universe_size(),
            order_delay_secs: default_order_delay_secs(),
            settle_delay_secs: default_settle_delay_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connectivity_backoff_secs: default_connectivity_backoff_secs(),
            timeout_backoff_secs: default_timeout_backoff_secs(),
            fault_backoff_secs: default_fault_backoff_secs(),
        }
    }
}
