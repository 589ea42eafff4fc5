// src/config.rs

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::error::CoreResult;
use crate::quote::{AssetState, Quote};
use crate::types::{AssetType, Balances, RequestId, SwapRequest, WalletStatus};

#[derive(Debug, Deserialize, Clone)]
pub struct QuoteDefaults {
    pub alpha_asset: AssetType,
    pub alpha_amount: Decimal,
    pub beta_asset: AssetType,
    pub beta_amount: Decimal,
    pub rate: Decimal,
}

impl QuoteDefaults {
    pub fn to_quote(&self) -> CoreResult<Quote> {
        Quote::new(
            AssetState::new(self.alpha_asset, self.alpha_amount),
            AssetState::new(self.beta_asset, self.beta_amount),
            self.rate,
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateFeedConfig {
    /// WebSocket endpoint; the fixed feed is used when absent.
    pub url: Option<String>,
    pub fixed_rate: Decimal,
    pub interval_secs: u64,
}

impl RateFeedConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Seed state for the in-memory background used by the demo.
#[derive(Debug, Deserialize, Clone)]
pub struct PaperConfig {
    pub status: WalletStatus,
    pub btc_balance: Decimal,
    pub usdt_balance: Decimal,
    /// Offer one swap sized from the default quote at startup.
    pub offer_swap: bool,
}

impl PaperConfig {
    pub fn balances(&self) -> Balances {
        Balances::new()
            .with(AssetType::Btc, self.btc_balance)
            .with(AssetType::Usdt, self.usdt_balance)
    }

    pub fn initial_swap(&self, quote: &Quote) -> Option<SwapRequest> {
        self.offer_swap.then(|| SwapRequest {
            id: RequestId::new("paper-swap-1"),
            sell_asset: quote.alpha.asset,
            sell_amount: quote.alpha.amount,
            buy_asset: quote.beta.asset,
            buy_amount: quote.beta.amount,
            fee: Decimal::ZERO,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub quote: QuoteDefaults,
    pub rate_feed: RateFeedConfig,
    pub paper: PaperConfig,
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Defaults, then an optional `Settings` file, then `APP__*` variables
    /// (e.g. `APP__RATE_FEED__URL`).
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("Settings").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("quote.alpha_asset", "BTC")?
            .set_default("quote.alpha_amount", "0.01")?
            .set_default("quote.beta_asset", "USDT")?
            .set_default("quote.beta_amount", "191.34")?
            .set_default("quote.rate", "19133.74")?
            .set_default("rate_feed.fixed_rate", "19133.74")?
            .set_default("rate_feed.interval_secs", 5)?
            .set_default("paper.status", "Loaded")?
            .set_default("paper.btc_balance", "0.5")?
            .set_default("paper.usdt_balance", "10000")?
            .set_default("paper.offer_swap", true)
    }
}
