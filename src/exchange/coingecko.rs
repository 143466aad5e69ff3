//! CoinGecko market-capitalization universe source.

use crate::error::GatewayError;
use crate::exchange::types::UniverseEntry;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct MarketEntry {
    symbol: String,
    market_cap_rank: Option<u32>,
}

/// Read-only client for the CoinGecko markets endpoint.
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Top coins by market capitalization, mapped to `{SYM}{quote}` pair
    /// symbols. Coins without a rank are dropped.
    #[instrument(skip(self))]
    pub async fn top_by_market_cap(
        &self,
        limit: u32,
        quote_asset: &str,
    ) -> Result<Vec<UniverseEntry>, GatewayError> {
        let url = format!("{}/coins/markets", self.base_url);
        let limit_str = limit.to_string();
        let query = [
            ("vs_currency", "usd"),
            ("order", "market_cap_desc"),
            ("per_page", limit_str.as_str()),
            ("page", "1"),
            ("sparkline", "false"),
        ];

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(GatewayError::from)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api(format!("coingecko http {status}: {body}")));
        }

        let entries: Vec<MarketEntry> = response.json().await.map_err(GatewayError::from)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                entry.market_cap_rank.map(|rank| UniverseEntry {
                    symbol: format!("{}{}", entry.symbol.to_uppercase(), quote_asset),
                    market_cap_rank: rank,
                })
            })
            .collect())
    }
}
