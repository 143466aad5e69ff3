//! Capital distribution across the top-ranked symbols.

use crate::config::RotationConfig;
use crate::error::GatewayError;
use crate::exchange::{ExchangeGateway, OrderSide, RankedCandidate};
use crate::runlog::RunLog;
use crate::utils::decimal::normalize_quantity;
use rust_decimal::Decimal;
use std::time::Duration;

/// Buys the target symbols with the remaining quote balance.
///
/// The budget is recomputed against a fresh balance read before every
/// order: capital skipped on one symbol redistributes to the ones after it
/// instead of being locked to an up-front 1/N split.
pub struct Acquirer {
    quote_asset: String,
    fallback_symbol: String,
    target_positions: usize,
    fee_buffer: Decimal,
    order_delay: Duration,
}

impl Acquirer {
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            quote_asset: config.quote_asset.clone(),
            fallback_symbol: config.fallback_symbol.clone(),
            target_positions: config.target_positions,
            fee_buffer: config.fee_buffer,
            order_delay: config.order_delay(),
        }
    }

    /// Exactly `target_positions` symbols: the top candidates in order,
    /// padded with the fallback symbol (duplicates allowed).
    pub fn build_targets(&self, candidates: &[RankedCandidate]) -> Vec<String> {
        let mut targets: Vec<String> = candidates
            .iter()
            .take(self.target_positions)
            .map(|c| c.symbol.clone())
            .collect();
        while targets.len() < self.target_positions {
            targets.push(self.fallback_symbol.clone());
        }
        targets
    }

    /// Acquire the targets in order, returning the symbols actually bought.
    pub async fn acquire_top(
        &self,
        exchange: &dyn ExchangeGateway,
        candidates: &[RankedCandidate],
        log: &RunLog,
    ) -> Result<Vec<String>, GatewayError> {
        let targets = self.build_targets(candidates);
        log.push(format!("Acquisition targets: {}", targets.join(", ")));

        let mut acquired = Vec::new();
        for (index, symbol) in targets.iter().enumerate() {
            // Capital changes as orders fill; the pre-liquidation figure is
            // useless here.
            let free = self.quote_free_balance(exchange).await?;
            if free <= Decimal::ZERO {
                log.push(format!("No {} available to buy tokens.", self.quote_asset));
                break;
            }

            let remaining_targets = Decimal::from((targets.len() - index) as u64);
            let budget = free / remaining_targets - self.fee_buffer;
            if budget <= Decimal::ZERO {
                log.push(format!(
                    "Insufficient {} to buy {}. Skipping...",
                    self.quote_asset, symbol
                ));
                continue;
            }

            log.push(format!(
                "Buying {} with {:.2} {}...",
                symbol, budget, self.quote_asset
            ));
            if self.buy(exchange, symbol, budget, log).await {
                acquired.push(symbol.clone());
            }
            tokio::time::sleep(self.order_delay).await;
        }

        Ok(acquired)
    }

    async fn buy(
        &self,
        exchange: &dyn ExchangeGateway,
        symbol: &str,
        budget: Decimal,
        log: &RunLog,
    ) -> bool {
        let price = match exchange.get_price(symbol).await {
            Ok(Some(price)) if price > Decimal::ZERO => price,
            Ok(_) => {
                log.push(format!("Cannot fetch price for {symbol}. Skipping..."));
                return false;
            }
            Err(e) => {
                log.push_error(format!("Error fetching price for {symbol}: {e}"));
                return false;
            }
        };

        let lot = match exchange.get_lot_constraint(symbol).await {
            Ok(Some(lot)) => lot,
            Ok(None) => {
                log.push(format!("Cannot fetch lot size for {symbol}. Skipping..."));
                return false;
            }
            Err(e) => {
                log.push_error(format!("Error fetching lot size for {symbol}: {e}"));
                return false;
            }
        };

        let Some(quantity) = normalize_quantity(budget / price, lot.step_size) else {
            log.push(format!("Unusable step size for {symbol}. Skipping..."));
            return false;
        };
        if quantity < lot.min_qty {
            log.push(format!(
                "Quantity {} is below the minimum allowed {} for {}. Skipping...",
                quantity, lot.min_qty, symbol
            ));
            return false;
        }

        log.push(format!("Placing order for {symbol} with quantity {quantity}..."));
        match exchange
            .submit_market_order(symbol, OrderSide::Buy, quantity)
            .await
        {
            Ok(fill) => {
                log.push(format!(
                    "Buy order successful for {}! Filled {} for {} {}",
                    symbol, fill.executed_qty, fill.cummulative_quote_qty, self.quote_asset
                ));
                true
            }
            Err(e) => {
                log.push_error(format!("Error buying {symbol}: {e}"));
                false
            }
        }
    }

    async fn quote_free_balance(
        &self,
        exchange: &dyn ExchangeGateway,
    ) -> Result<Decimal, GatewayError> {
        let balances = exchange.get_balances().await?;
        Ok(balances
            .iter()
            .find(|b| b.asset == self.quote_asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MockExchange;
    use rust_decimal_macros::dec;

    fn candidate(symbol: &str, week_change_pct: Decimal) -> RankedCandidate {
        RankedCandidate {
            symbol: symbol.to_string(),
            market_cap_rank: 1,
            current_price: dec!(1),
            week_change_pct,
            day_change_pct: dec!(1),
            quote_volume_24h: dec!(1_000_000),
        }
    }

    fn test_acquirer(target_positions: usize) -> Acquirer {
        let mut config = RotationConfig::default();
        config.target_positions = target_positions;
        config.order_delay_secs = 0;
        Acquirer::new(&config)
    }

    fn buyable(exchange: &MockExchange, symbol: &str, price: Decimal) {
        exchange.set_price(symbol, price);
        exchange.set_lot(symbol, dec!(0.001), dec!(0.001));
    }

    #[test]
    fn test_targets_padded_with_fallback() {
        let acquirer = test_acquirer(5);
        let candidates = vec![candidate("AUSDT", dec!(50)), candidate("BUSDT", dec!(40))];

        let targets = acquirer.build_targets(&candidates);
        assert_eq!(
            targets,
            vec!["AUSDT", "BUSDT", "BTCUSDT", "BTCUSDT", "BTCUSDT"]
        );
    }

    #[test]
    fn test_targets_truncated_to_slot_count() {
        let acquirer = test_acquirer(2);
        let candidates = vec![
            candidate("AUSDT", dec!(60)),
            candidate("BUSDT", dec!(50)),
            candidate("CUSDT", dec!(40)),
        ];

        assert_eq!(acquirer.build_targets(&candidates), vec!["AUSDT", "BUSDT"]);
    }

    #[test]
    fn test_empty_candidates_yield_all_fallback() {
        let acquirer = test_acquirer(5);
        let targets = acquirer.build_targets(&[]);
        assert_eq!(targets.len(), 5);
        assert!(targets.iter().all(|t| t == "BTCUSDT"));
    }

    #[tokio::test]
    async fn test_budget_splits_remaining_balance_minus_fee_buffer() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(10), Decimal::ZERO);
        buyable(&exchange, "AUSDT", dec!(1));
        buyable(&exchange, "BUSDT", dec!(1));

        let acquirer = test_acquirer(2);
        let candidates = vec![candidate("AUSDT", dec!(50)), candidate("BUSDT", dec!(40))];
        let acquired = acquirer
            .acquire_top(&exchange, &candidates, &RunLog::new())
            .await
            .unwrap();

        assert_eq!(acquired, vec!["AUSDT", "BUSDT"]);
        let orders = exchange.orders();
        // 10 / 2 - 0.1 = 4.9 at price 1.
        assert_eq!(orders[0].quantity, dec!(4.9));
        // Remaining 5.1 / 1 - 0.1 = 5.
        assert_eq!(orders[1].quantity, dec!(5));
    }

    #[tokio::test]
    async fn test_stops_when_quote_balance_exhausted() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", Decimal::ZERO, Decimal::ZERO);
        buyable(&exchange, "AUSDT", dec!(1));

        let acquirer = test_acquirer(3);
        let log = RunLog::new();
        let acquired = acquirer
            .acquire_top(&exchange, &[candidate("AUSDT", dec!(50))], &log)
            .await
            .unwrap();

        assert!(acquired.is_empty());
        assert!(exchange.orders().is_empty());
        assert!(log.render().contains("No USDT available"));
    }

    #[tokio::test]
    async fn test_skipped_symbol_redistributes_to_later_targets() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(100), Decimal::ZERO);
        // No price or lot for AUSDT: the buy is skipped, capital stays.
        buyable(&exchange, "BUSDT", dec!(1));

        let acquirer = test_acquirer(2);
        let candidates = vec![candidate("AUSDT", dec!(50)), candidate("BUSDT", dec!(40))];
        let log = RunLog::new();
        let acquired = acquirer
            .acquire_top(&exchange, &candidates, &log)
            .await
            .unwrap();

        assert_eq!(acquired, vec!["BUSDT"]);
        let orders = exchange.orders();
        assert_eq!(orders.len(), 1);
        // The full 100 was still available: 100 / 1 - 0.1 = 99.9.
        assert_eq!(orders[0].quantity, dec!(99.9));
        assert!(log.render().contains("Cannot fetch price for AUSDT"));
    }

    #[tokio::test]
    async fn test_below_minimum_quantity_is_skipped() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(10), Decimal::ZERO);
        exchange.set_price("AUSDT", dec!(100_000));
        exchange.set_lot("AUSDT", dec!(0.001), dec!(0.0001));

        let acquirer = test_acquirer(1);
        let log = RunLog::new();
        let acquired = acquirer
            .acquire_top(&exchange, &[candidate("AUSDT", dec!(50))], &log)
            .await
            .unwrap();

        assert!(acquired.is_empty());
        assert!(exchange.orders().is_empty());
        assert!(log.render().contains("below the minimum allowed"));
    }

    #[tokio::test]
    async fn test_rejected_order_does_not_count_as_acquired() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(100), Decimal::ZERO);
        buyable(&exchange, "AUSDT", dec!(1));
        buyable(&exchange, "BUSDT", dec!(1));
        exchange.inject_order_fault("AUSDT", GatewayError::Api("rejected".into()));

        let acquirer = test_acquirer(2);
        let candidates = vec![candidate("AUSDT", dec!(50)), candidate("BUSDT", dec!(40))];
        let log = RunLog::new();
        let acquired = acquirer
            .acquire_top(&exchange, &candidates, &log)
            .await
            .unwrap();

        assert_eq!(acquired, vec!["BUSDT"]);
        assert!(!log.error_lines().is_empty());
    }
}
