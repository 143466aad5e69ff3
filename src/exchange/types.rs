//! Typed records for the exchange and ranking boundaries.
//!
//! Everything crossing a gateway boundary is validated into one of these
//! shapes; the core never passes loosely-typed maps around.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw account balance entry as reported by the exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub free: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub locked: Decimal,
}

impl AssetBalance {
    /// Free plus locked amount.
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Spot account payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<AssetBalance>,
}

/// Exchange lot-size constraint for one symbol. Immutable for the duration
/// of a run; fetched on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotConstraint {
    pub min_qty: Decimal,
    pub step_size: Decimal,
}

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    ExpiredInMatch,
}

/// Market order fill as reported by the exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFill {
    pub symbol: String,
    pub order_id: i64,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
    // Binance's own spelling of the field.
    #[serde(with = "rust_decimal::serde::str")]
    pub cummulative_quote_qty: Decimal,
}

/// Last-price ticker for a single symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTicker {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// 24-hour statistics for one symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub last_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub price_change_percent: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quote_volume: Decimal,
}

/// Result of a batched dust conversion into the sink asset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DustConversionResult {
    // Binance's own spelling of the field.
    #[serde(with = "rust_decimal::serde::str")]
    pub total_transfered: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_service_charge: Decimal,
}

/// One entry of the capped market-capitalization universe.
#[derive(Debug, Clone)]
pub struct UniverseEntry {
    /// Exchange pair symbol, e.g. "BTCUSDT".
    pub symbol: String,
    pub market_cap_rank: u32,
}

/// Momentum-ranked acquisition candidate. Derived once per run, read-only.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub symbol: String,
    pub market_cap_rank: u32,
    pub current_price: Decimal,
    /// Percent change over the 7-day lookback, the ordering key.
    pub week_change_pct: Decimal,
    pub day_change_pct: Decimal,
    pub quote_volume_24h: Decimal,
}
