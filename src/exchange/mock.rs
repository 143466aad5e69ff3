//! In-memory exchange doubles for rotation tests.
//!
//! `MockExchange` keeps a real balance sheet: sells credit the quote asset,
//! buys debit it, so the acquirer's fresh balance reads observe capital
//! changing between orders exactly as on the venue.

use crate::error::GatewayError;
use crate::exchange::traits::{ExchangeGateway, MarketRankingGateway};
use crate::exchange::types::{
    AssetBalance, DustConversionResult, LotConstraint, OrderFill, OrderSide, OrderStatus,
    Ticker24h, UniverseEntry,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Order captured by the mock for later assertions.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
}

#[derive(Default)]
struct ExchangeState {
    balances: Vec<AssetBalance>,
    prices: HashMap<String, Decimal>,
    lots: HashMap<String, LotConstraint>,
    tickers: Vec<Ticker24h>,
    orders: Vec<RecordedOrder>,
    dust_requests: Vec<Vec<String>>,
    balance_faults: VecDeque<GatewayError>,
    price_faults: HashMap<String, GatewayError>,
    order_faults: HashMap<String, GatewayError>,
    next_order_id: i64,
}

/// Scripted in-memory exchange.
pub struct MockExchange {
    state: Mutex<ExchangeState>,
    quote_asset: String,
}

impl MockExchange {
    pub fn new(quote_asset: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(ExchangeState::default()),
            quote_asset: quote_asset.into(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExchangeState> {
        self.state.lock().expect("mock exchange lock poisoned")
    }

    pub fn set_balance(&self, asset: &str, free: Decimal, locked: Decimal) {
        let mut state = self.lock();
        let entry = Self::entry_mut(&mut state.balances, asset);
        entry.free = free;
        entry.locked = locked;
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.lock().prices.insert(symbol.to_string(), price);
    }

    pub fn set_lot(&self, symbol: &str, min_qty: Decimal, step_size: Decimal) {
        self.lock()
            .lots
            .insert(symbol.to_string(), LotConstraint { min_qty, step_size });
    }

    pub fn push_ticker(&self, ticker: Ticker24h) {
        self.lock().tickers.push(ticker);
    }

    /// Fail the next `get_balances` call with the given error.
    pub fn inject_balance_fault(&self, error: GatewayError) {
        self.lock().balance_faults.push_back(error);
    }

    /// Fail the next `get_price` call for `symbol` with the given error.
    pub fn inject_price_fault(&self, symbol: &str, error: GatewayError) {
        self.lock().price_faults.insert(symbol.to_string(), error);
    }

    /// Fail the next `submit_market_order` for `symbol` with the given error.
    pub fn inject_order_fault(&self, symbol: &str, error: GatewayError) {
        self.lock().order_faults.insert(symbol.to_string(), error);
    }

    pub fn orders(&self) -> Vec<RecordedOrder> {
        self.lock().orders.clone()
    }

    pub fn dust_requests(&self) -> Vec<Vec<String>> {
        self.lock().dust_requests.clone()
    }

    pub fn free_of(&self, asset: &str) -> Decimal {
        self.lock()
            .balances
            .iter()
            .find(|b| b.asset == asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    fn entry_mut<'a>(balances: &'a mut Vec<AssetBalance>, asset: &str) -> &'a mut AssetBalance {
        if let Some(index) = balances.iter().position(|b| b.asset == asset) {
            &mut balances[index]
        } else {
            balances.push(AssetBalance {
                asset: asset.to_string(),
                free: Decimal::ZERO,
                locked: Decimal::ZERO,
            });
            balances.last_mut().expect("just pushed")
        }
    }
}

#[async_trait]
impl ExchangeGateway for MockExchange {
    async fn get_balances(&self) -> Result<Vec<AssetBalance>, GatewayError> {
        let mut state = self.lock();
        if let Some(fault) = state.balance_faults.pop_front() {
            return Err(fault);
        }
        Ok(state.balances.clone())
    }

    async fn get_price(&self, symbol: &str) -> Result<Option<Decimal>, GatewayError> {
        let mut state = self.lock();
        if let Some(fault) = state.price_faults.remove(symbol) {
            return Err(fault);
        }
        Ok(state.prices.get(symbol).copied())
    }

    async fn get_lot_constraint(
        &self,
        symbol: &str,
    ) -> Result<Option<LotConstraint>, GatewayError> {
        Ok(self.lock().lots.get(symbol).copied())
    }

    async fn get_24h_tickers(&self) -> Result<Vec<Ticker24h>, GatewayError> {
        Ok(self.lock().tickers.clone())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderFill, GatewayError> {
        let mut state = self.lock();
        if let Some(fault) = state.order_faults.remove(symbol) {
            return Err(fault);
        }

        let price = *state
            .prices
            .get(symbol)
            .ok_or_else(|| GatewayError::Api(format!("no market for {symbol}")))?;
        let base_asset = symbol
            .strip_suffix(&self.quote_asset)
            .ok_or_else(|| GatewayError::Api(format!("{symbol} is not a quote pair")))?
            .to_string();
        let quote_asset = self.quote_asset.clone();
        let cost = quantity * price;

        match side {
            OrderSide::Sell => {
                let base = Self::entry_mut(&mut state.balances, &base_asset);
                if base.free < quantity {
                    return Err(GatewayError::Api(format!(
                        "insufficient {base_asset} balance"
                    )));
                }
                base.free -= quantity;
                Self::entry_mut(&mut state.balances, &quote_asset).free += cost;
            }
            OrderSide::Buy => {
                let quote = Self::entry_mut(&mut state.balances, &quote_asset);
                if quote.free < cost {
                    return Err(GatewayError::Api(format!(
                        "insufficient {quote_asset} balance"
                    )));
                }
                quote.free -= cost;
                Self::entry_mut(&mut state.balances, &base_asset).free += quantity;
            }
        }

        state.orders.push(RecordedOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
        });
        state.next_order_id += 1;
        Ok(OrderFill {
            symbol: symbol.to_string(),
            order_id: state.next_order_id,
            status: OrderStatus::Filled,
            executed_qty: quantity,
            cummulative_quote_qty: cost,
        })
    }

    async fn submit_dust_conversion(
        &self,
        assets: &[String],
    ) -> Result<DustConversionResult, GatewayError> {
        let mut state = self.lock();
        state.dust_requests.push(assets.to_vec());

        // Dust simply leaves the book; the sink-side credit is not modeled,
        // only the converted quote value is reported back.
        let mut total = Decimal::ZERO;
        for asset in assets {
            let symbol = format!("{}{}", asset, self.quote_asset);
            let price = state.prices.get(&symbol).copied().unwrap_or(Decimal::ZERO);
            let entry = Self::entry_mut(&mut state.balances, asset);
            total += entry.free * price;
            entry.free = Decimal::ZERO;
        }

        Ok(DustConversionResult {
            total_transfered: total,
            total_service_charge: Decimal::ZERO,
        })
    }
}

#[derive(Default)]
struct RankingState {
    universe: Vec<UniverseEntry>,
    closes: HashMap<String, Vec<Decimal>>,
    universe_faults: VecDeque<GatewayError>,
}

/// Scripted in-memory ranking source.
#[derive(Default)]
pub struct MockRanking {
    state: Mutex<RankingState>,
}

impl MockRanking {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RankingState> {
        self.state.lock().expect("mock ranking lock poisoned")
    }

    pub fn push_universe(&self, symbol: &str, market_cap_rank: u32) {
        self.lock().universe.push(UniverseEntry {
            symbol: symbol.to_string(),
            market_cap_rank,
        });
    }

    pub fn set_closes(&self, symbol: &str, closes: Vec<Decimal>) {
        self.lock().closes.insert(symbol.to_string(), closes);
    }

    /// Fail the next `get_ranked_universe` call with the given error.
    pub fn inject_universe_fault(&self, error: GatewayError) {
        self.lock().universe_faults.push_back(error);
    }
}

#[async_trait]
impl MarketRankingGateway for MockRanking {
    async fn get_ranked_universe(&self) -> Result<Vec<UniverseEntry>, GatewayError> {
        let mut state = self.lock();
        if let Some(fault) = state.universe_faults.pop_front() {
            return Err(fault);
        }
        Ok(state.universe.clone())
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        _days: u32,
    ) -> Result<Vec<Decimal>, GatewayError> {
        self.lock()
            .closes
            .get(symbol)
            .cloned()
            .ok_or_else(|| GatewayError::Api(format!("no kline data for {symbol}")))
    }
}
