//! Injected gateway capabilities consumed by the rotation engine.
//!
//! The orchestrator holds these as explicit capabilities and passes them to
//! each component; there is no process-wide client singleton. Both traits
//! are mocked in component tests.

use crate::error::GatewayError;
use crate::exchange::types::{
    AssetBalance, DustConversionResult, LotConstraint, OrderFill, OrderSide, Ticker24h,
    UniverseEntry,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

#[cfg(test)]
use mockall::automock;

/// Account and market-data operations against the exchange.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// All account balances, materialized in exchange order.
    async fn get_balances(&self) -> Result<Vec<AssetBalance>, GatewayError>;

    /// Last price for a symbol; `None` when the pair is not listed.
    async fn get_price(&self, symbol: &str) -> Result<Option<Decimal>, GatewayError>;

    /// Lot-size constraint for a symbol; `None` when the pair is not listed.
    async fn get_lot_constraint(
        &self,
        symbol: &str,
    ) -> Result<Option<LotConstraint>, GatewayError>;

    /// 24-hour statistics for every listed symbol.
    async fn get_24h_tickers(&self) -> Result<Vec<Ticker24h>, GatewayError>;

    /// Submit a market order for the given base-asset quantity.
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError>;

    /// Convert the listed assets into the sink asset in one batched request.
    async fn submit_dust_conversion(
        &self,
        assets: &[String],
    ) -> Result<DustConversionResult, GatewayError>;
}

/// External market-capitalization ranking and daily price history.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketRankingGateway: Send + Sync {
    /// Top symbols by market capitalization, size-capped, refreshed per call.
    async fn get_ranked_universe(&self) -> Result<Vec<UniverseEntry>, GatewayError>;

    /// Daily closes for a symbol, oldest first, most recent last.
    async fn get_daily_closes(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<Decimal>, GatewayError>;
}
