//! External data-plane adapters.
//!
//! ## Binance
//! Spot REST connectivity for balances, prices, lot-size filters, market
//! orders, and batched dust conversion.
//!
//! ## CoinGecko
//! Read-only market-capitalization ranking used to cap the candidate
//! universe.

mod client;
mod coingecko;
mod market_data;
pub mod mock;
mod traits;
mod types;

pub use client::BinanceClient;
pub use coingecko::CoinGeckoClient;
pub use market_data::MarketDataService;
pub use mock::{MockExchange, MockRanking, RecordedOrder};
pub use traits::{ExchangeGateway, MarketRankingGateway};
pub use types::*;

#[cfg(test)]
pub use traits::{MockExchangeGateway, MockMarketRankingGateway};
