//! Production ranking gateway combining the universe and history sources.

use crate::config::RotationConfig;
use crate::error::GatewayError;
use crate::exchange::client::BinanceClient;
use crate::exchange::coingecko::CoinGeckoClient;
use crate::exchange::traits::MarketRankingGateway;
use crate::exchange::types::UniverseEntry;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Implements [`MarketRankingGateway`] with CoinGecko supplying the
/// capitalization universe and the exchange supplying daily closes.
pub struct MarketDataService {
    coingecko: CoinGeckoClient,
    exchange: Arc<BinanceClient>,
    quote_asset: String,
    universe_size: u32,
}

impl MarketDataService {
    pub fn new(
        coingecko: CoinGeckoClient,
        exchange: Arc<BinanceClient>,
        config: &RotationConfig,
    ) -> Self {
        Self {
            coingecko,
            exchange,
            quote_asset: config.quote_asset.clone(),
            universe_size: config.universe_size,
        }
    }
}

#[async_trait]
impl MarketRankingGateway for MarketDataService {
    async fn get_ranked_universe(&self) -> Result<Vec<UniverseEntry>, GatewayError> {
        self.coingecko
            .top_by_market_cap(self.universe_size, &self.quote_asset)
            .await
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<Decimal>, GatewayError> {
        self.exchange.get_daily_closes(symbol, days).await
    }
}
