//! Binance spot REST API client.

use crate::config::BinanceConfig;
use crate::error::GatewayError;
use crate::exchange::traits::ExchangeGateway;
use crate::exchange::types::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

const SPOT_BASE_URL: &str = "https://api.binance.com";
const SPOT_TESTNET_URL: &str = "https://testnet.binance.vision";

/// Binance error code for a symbol that is not listed.
const CODE_UNKNOWN_SYMBOL: i64 = -1121;

/// Error payload returned by the Binance API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolFilters>,
}

#[derive(Debug, Deserialize)]
struct SymbolFilters {
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        #[serde(with = "rust_decimal::serde::str")]
        min_qty: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

/// Binance API client for the spot market.
pub struct BinanceClient {
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
}

impl BinanceClient {
    /// Create a new Binance client from configuration.
    pub fn new(config: &BinanceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = if config.testnet {
            SPOT_TESTNET_URL.to_string()
        } else {
            SPOT_BASE_URL.to_string()
        };

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url,
        })
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generate HMAC-SHA256 signature for authenticated requests.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Get current timestamp in milliseconds.
    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    fn signed_url(&self, path: &str, params: &[(String, String)]) -> String {
        let query_string: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(&query_string);
        format!("{}{}?{}&signature={}", self.base_url, path, query_string, signature)
    }

    /// Turn a non-2xx response into a typed error, keeping the Binance
    /// error code when the body carries one.
    async fn api_error(response: reqwest::Response) -> (Option<i64>, GatewayError) {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(api) => (
                Some(api.code),
                GatewayError::Api(format!("{} (code {})", api.msg, api.code)),
            ),
            Err(_) => (None, GatewayError::Api(format!("http {status}: {body}"))),
        }
    }

    /// Daily closing prices for a symbol, oldest first.
    #[instrument(skip(self))]
    pub async fn get_daily_closes(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<Decimal>, GatewayError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval=1d&limit={}",
            self.base_url, symbol, days
        );
        let response = self.http.get(&url).send().await.map_err(GatewayError::from)?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await.1);
        }

        // Kline rows are heterogeneous arrays; the close is the fifth field.
        let rows: Vec<Vec<serde_json::Value>> =
            response.json().await.map_err(GatewayError::from)?;
        rows.iter()
            .map(|row| {
                row.get(4)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| GatewayError::Parse(format!("kline row without close: {row:?}")))
                    .and_then(|s| {
                        Decimal::from_str(s)
                            .map_err(|e| GatewayError::Parse(format!("bad close '{s}': {e}")))
                    })
            })
            .collect()
    }
}

#[async_trait]
impl ExchangeGateway for BinanceClient {
    #[instrument(skip(self))]
    async fn get_balances(&self) -> Result<Vec<AssetBalance>, GatewayError> {
        let timestamp = Self::timestamp();
        let params = vec![("timestamp".to_string(), timestamp.to_string())];
        let url = self.signed_url("/api/v3/account", &params);

        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(GatewayError::from)?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await.1);
        }

        let account: AccountInfo = response.json().await.map_err(GatewayError::from)?;
        Ok(account.balances)
    }

    #[instrument(skip(self))]
    async fn get_price(&self, symbol: &str) -> Result<Option<Decimal>, GatewayError> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);
        let response = self.http.get(&url).send().await.map_err(GatewayError::from)?;
        if !response.status().is_success() {
            let (code, err) = Self::api_error(response).await;
            if code == Some(CODE_UNKNOWN_SYMBOL) {
                return Ok(None);
            }
            return Err(err);
        }

        let ticker: PriceTicker = response.json().await.map_err(GatewayError::from)?;
        Ok(Some(ticker.price))
    }

    #[instrument(skip(self))]
    async fn get_lot_constraint(
        &self,
        symbol: &str,
    ) -> Result<Option<LotConstraint>, GatewayError> {
        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.base_url, symbol);
        let response = self.http.get(&url).send().await.map_err(GatewayError::from)?;
        if !response.status().is_success() {
            let (code, err) = Self::api_error(response).await;
            if code == Some(CODE_UNKNOWN_SYMBOL) {
                return Ok(None);
            }
            return Err(err);
        }

        let info: ExchangeInfo = response.json().await.map_err(GatewayError::from)?;
        let constraint = info.symbols.first().and_then(|s| {
            s.filters.iter().find_map(|f| match f {
                SymbolFilter::LotSize { min_qty, step_size } => Some(LotConstraint {
                    min_qty: *min_qty,
                    step_size: *step_size,
                }),
                SymbolFilter::Other => None,
            })
        });
        Ok(constraint)
    }

    #[instrument(skip(self))]
    async fn get_24h_tickers(&self) -> Result<Vec<Ticker24h>, GatewayError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let response = self.http.get(&url).send().await.map_err(GatewayError::from)?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await.1);
        }
        response.json().await.map_err(GatewayError::from)
    }

    #[instrument(skip(self))]
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        let timestamp = Self::timestamp();
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), quantity.to_string()),
            ("timestamp".to_string(), timestamp.to_string()),
        ];
        let url = self.signed_url("/api/v3/order", &params);

        debug!(%symbol, side = side.as_str(), %quantity, "Placing market order");

        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(GatewayError::from)?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await.1);
        }
        response.json().await.map_err(GatewayError::from)
    }

    #[instrument(skip(self))]
    async fn submit_dust_conversion(
        &self,
        assets: &[String],
    ) -> Result<DustConversionResult, GatewayError> {
        let timestamp = Self::timestamp();
        let mut params: Vec<(String, String)> = assets
            .iter()
            .map(|asset| ("asset".to_string(), asset.clone()))
            .collect();
        params.push(("timestamp".to_string(), timestamp.to_string()));
        let url = self.signed_url("/sapi/v1/asset/dust", &params);

        debug!(?assets, "Submitting dust conversion");

        let response = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(GatewayError::from)?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await.1);
        }
        response.json().await.map_err(GatewayError::from)
    }
}
