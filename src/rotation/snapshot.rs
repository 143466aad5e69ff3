//! Account balance snapshot valued in the quote asset.

use crate::error::GatewayError;
use crate::exchange::ExchangeGateway;
use crate::runlog::RunLog;
use rust_decimal::Decimal;

/// One held asset with its quote-asset valuation.
#[derive(Debug, Clone)]
pub struct ValuedBalance {
    pub asset: String,
    /// Free plus locked amount.
    pub amount: Decimal,
    pub quote_value: Decimal,
}

/// Point-in-time view of the whole account. Recomputed fresh on every
/// capture, never cached across rotation steps.
#[derive(Debug, Clone)]
pub struct PortfolioSnapshot {
    pub balances: Vec<ValuedBalance>,
    pub total_quote_value: Decimal,
}

/// Reads account holdings and values each against the quote asset.
pub struct SnapshotReader {
    quote_asset: String,
}

impl SnapshotReader {
    pub fn new(quote_asset: impl Into<String>) -> Self {
        Self {
            quote_asset: quote_asset.into(),
        }
    }

    /// Capture every asset with a nonzero balance.
    ///
    /// An asset with no trading pair against the quote asset contributes
    /// zero value. A gateway fault fails the whole capture: a snapshot is
    /// either fully priced or absent, never a mix of stale and fresh data.
    pub async fn capture(
        &self,
        exchange: &dyn ExchangeGateway,
        log: &RunLog,
    ) -> Result<PortfolioSnapshot, GatewayError> {
        let balances = exchange.get_balances().await?;

        let mut valued = Vec::new();
        let mut total = Decimal::ZERO;
        for balance in balances {
            let amount = balance.total();
            if amount <= Decimal::ZERO {
                continue;
            }

            let quote_value = if balance.asset == self.quote_asset {
                amount
            } else {
                let symbol = format!("{}{}", balance.asset, self.quote_asset);
                match exchange.get_price(&symbol).await? {
                    Some(price) => amount * price,
                    None => Decimal::ZERO,
                }
            };

            total += quote_value;
            log.push(format!(
                "{}: {} (~{:.2} {})",
                balance.asset, amount, quote_value, self.quote_asset
            ));
            valued.push(ValuedBalance {
                asset: balance.asset,
                amount,
                quote_value,
            });
        }

        log.push(format!(
            "Total portfolio value: {:.2} {}",
            total, self.quote_asset
        ));
        Ok(PortfolioSnapshot {
            balances: valued,
            total_quote_value: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MockExchange;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_quote_holding_valued_at_identity() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(100), Decimal::ZERO);
        exchange.set_balance("ETH", Decimal::ZERO, Decimal::ZERO);

        let snapshot = SnapshotReader::new("USDT")
            .capture(&exchange, &RunLog::new())
            .await
            .unwrap();

        assert_eq!(snapshot.balances.len(), 1);
        assert_eq!(snapshot.balances[0].asset, "USDT");
        assert_eq!(snapshot.balances[0].quote_value, dec!(100));
        assert_eq!(snapshot.total_quote_value, dec!(100));
    }

    #[tokio::test]
    async fn test_total_is_exact_sum_of_entries() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(12.5), Decimal::ZERO);
        exchange.set_balance("ETH", dec!(2), dec!(0.5));
        exchange.set_balance("SOL", dec!(3), Decimal::ZERO);
        exchange.set_price("ETHUSDT", dec!(2000.13));
        exchange.set_price("SOLUSDT", dec!(141.07));

        let snapshot = SnapshotReader::new("USDT")
            .capture(&exchange, &RunLog::new())
            .await
            .unwrap();

        let sum: Decimal = snapshot.balances.iter().map(|b| b.quote_value).sum();
        assert_eq!(snapshot.total_quote_value, sum);
        // Locked amounts count toward the valuation.
        let eth = snapshot.balances.iter().find(|b| b.asset == "ETH").unwrap();
        assert_eq!(eth.amount, dec!(2.5));
        assert_eq!(eth.quote_value, dec!(2.5) * dec!(2000.13));
    }

    #[tokio::test]
    async fn test_unpriceable_asset_contributes_zero() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(50), Decimal::ZERO);
        exchange.set_balance("OBSCURE", dec!(1000), Decimal::ZERO);

        let snapshot = SnapshotReader::new("USDT")
            .capture(&exchange, &RunLog::new())
            .await
            .unwrap();

        let obscure = snapshot
            .balances
            .iter()
            .find(|b| b.asset == "OBSCURE")
            .unwrap();
        assert_eq!(obscure.quote_value, Decimal::ZERO);
        assert_eq!(snapshot.total_quote_value, dec!(50));
    }

    #[tokio::test]
    async fn test_gateway_fault_fails_the_whole_capture() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("USDT", dec!(50), Decimal::ZERO);
        exchange.inject_balance_fault(GatewayError::Timeout("read deadline".into()));

        let result = SnapshotReader::new("USDT")
            .capture(&exchange, &RunLog::new())
            .await;
        assert!(matches!(result, Err(GatewayError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_price_fault_fails_the_whole_capture() {
        let exchange = MockExchange::new("USDT");
        exchange.set_balance("ETH", dec!(1), Decimal::ZERO);
        exchange.inject_price_fault("ETHUSDT", GatewayError::Connectivity("down".into()));

        let result = SnapshotReader::new("USDT")
            .capture(&exchange, &RunLog::new())
            .await;
        assert!(matches!(result, Err(GatewayError::Connectivity(_))));
    }
}
