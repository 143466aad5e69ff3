//! Two-pass liquidation into the quote asset.

use crate::config::RotationConfig;
use crate::error::GatewayError;
use crate::exchange::{ExchangeGateway, OrderSide};
use crate::runlog::RunLog;
use crate::utils::decimal::normalize_quantity;
use rust_decimal::Decimal;
use std::time::Duration;

/// Sells every non-reserve holding, then sweeps dust into the sink asset.
///
/// The quote asset and the sink asset are never offered for sale. Per-asset
/// faults skip that asset and the pass continues; only whole-account balance
/// reads propagate to the caller.
pub struct Liquidator {
    quote_asset: String,
    sink_asset: String,
    dust_threshold: Decimal,
    order_delay: Duration,
}

impl Liquidator {
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            quote_asset: config.quote_asset.clone(),
            sink_asset: config.sink_asset.clone(),
            dust_threshold: config.dust_threshold,
            order_delay: config.order_delay(),
        }
    }

    pub async fn liquidate_all(
        &self,
        exchange: &dyn ExchangeGateway,
        log: &RunLog,
    ) -> Result<(), GatewayError> {
        self.sell_pass(exchange, log).await?;
        self.dust_pass(exchange, log).await
    }

    async fn sell_pass(
        &self,
        exchange: &dyn ExchangeGateway,
        log: &RunLog,
    ) -> Result<(), GatewayError> {
        log.push("Selling all non-reserve holdings...");
        let balances = exchange.get_balances().await?;

        for balance in &balances {
            if self.is_reserve(&balance.asset) || balance.free <= Decimal::ZERO {
                continue;
            }
            let symbol = format!("{}{}", balance.asset, self.quote_asset);

            let lot = match exchange.get_lot_constraint(&symbol).await {
                Ok(Some(lot)) => lot,
                Ok(None) => {
                    log.push(format!("Lot size info not found for {symbol}. Skipping..."));
                    continue;
                }
                Err(e) => {
                    log.push_error(format!("Error fetching lot size for {symbol}: {e}"));
                    continue;
                }
            };

            let Some(quantity) = normalize_quantity(balance.free, lot.step_size) else {
                log.push(format!("Unusable step size for {symbol}. Skipping..."));
                continue;
            };
            if quantity < lot.min_qty {
                log.push(format!(
                    "Quantity {} is below minimum {} for {}. Skipping...",
                    quantity, lot.min_qty, symbol
                ));
                continue;
            }

            log.push(format!("Selling {quantity} of {symbol}..."));
            match exchange
                .submit_market_order(&symbol, OrderSide::Sell, quantity)
                .await
            {
                Ok(fill) => log.push(format!(
                    "Sell order successful for {}: filled {} for {} {}",
                    symbol, fill.executed_qty, fill.cummulative_quote_qty, self.quote_asset
                )),
                Err(e) => log.push_error(format!("Error selling {symbol}: {e}")),
            }
            tokio::time::sleep(self.order_delay).await;
        }

        Ok(())
    }

    async fn dust_pass(
        &self,
        exchange: &dyn ExchangeGateway,
        log: &RunLog,
    ) -> Result<(), GatewayError> {
        log.push("Scanning for dust to convert...");
        let balances = exchange.get_balances().await?;

        let mut dust = Vec::new();
        for balance in &balances {
            if self.is_reserve(&balance.asset) || balance.free <= Decimal::ZERO {
                continue;
            }
            let symbol = format!("{}{}", balance.asset, self.quote_asset);

            match exchange.get_price(&symbol).await {
                Ok(Some(price)) if price > Decimal::ZERO => {
                    if balance.free * price < self.dust_threshold {
                        dust.push(balance.asset.clone());
                    }
                }
                // Unpriceable holdings are ambiguous, leave them alone.
                Ok(_) => log.push(format!(
                    "No price for {symbol}, leaving {} untouched",
                    balance.asset
                )),
                Err(e) => log.push_error(format!("Error pricing {symbol}: {e}")),
            }
        }

        if dust.is_empty() {
            log.push(format!("No assets to convert to {}", self.sink_asset));
            return Ok(());
        }

        log.push(format!(
            "Converting to {}: {}",
            self.sink_asset,
            dust.join(", ")
        ));
        match exchange.submit_dust_conversion(&dust).await {
            Ok(result) => log.push(format!(
                "Dust conversion complete: received {} {}, service charge {}",
                result.total_transfered, self.sink_asset, result.total_service_charge
            )),
            Err(e) => log.push_error(format!("Error during dust conversion: {e}")),
        }
        tokio::time::sleep(self.order_delay).await;

        Ok(())
    }

    fn is_reserve(&self, asset: &str) -> bool {
        asset == self.quote_asset || asset == self.sink_asset
    }
}
