//! Momentum ranking over the market-capitalization universe.

use crate::config::RotationConfig;
use crate::error::GatewayError;
use crate::exchange::{ExchangeGateway, MarketRankingGateway, RankedCandidate};
use crate::runlog::RunLog;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tracing::debug;

/// Filters the capped capitalization universe down to symbols that cleared
/// the momentum bar and orders them by weekly performance.
pub struct MomentumRanker {
    quote_asset: String,
    min_weekly_gain_pct: Decimal,
    lookback_days: u32,
}

impl MomentumRanker {
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            quote_asset: config.quote_asset.clone(),
            min_weekly_gain_pct: config.min_weekly_gain_pct,
            lookback_days: config.lookback_days,
        }
    }

    /// Rank the current universe.
    ///
    /// Universe = capitalization list ∩ active quote-asset pairs, walked in
    /// exchange ticker order (which makes the descending sort stable for
    /// ties). A history fault for one symbol excludes only that symbol.
    pub async fn rank(
        &self,
        exchange: &dyn ExchangeGateway,
        ranking: &dyn MarketRankingGateway,
        log: &RunLog,
    ) -> Result<Vec<RankedCandidate>, GatewayError> {
        let universe = ranking.get_ranked_universe().await?;
        let ranks: HashMap<&str, u32> = universe
            .iter()
            .map(|entry| (entry.symbol.as_str(), entry.market_cap_rank))
            .collect();

        let tickers = exchange.get_24h_tickers().await?;
        log.push(format!(
            "Ranking universe: {} capitalization entries, {} exchange tickers",
            universe.len(),
            tickers.len()
        ));

        let mut candidates = Vec::new();
        for ticker in &tickers {
            if !ticker.symbol.ends_with(&self.quote_asset) {
                continue;
            }
            let Some(&market_cap_rank) = ranks.get(ticker.symbol.as_str()) else {
                continue;
            };

            let closes = match ranking
                .get_daily_closes(&ticker.symbol, self.lookback_days)
                .await
            {
                Ok(closes) => closes,
                Err(e) => {
                    log.push_error(format!("Error processing {}: {}", ticker.symbol, e));
                    continue;
                }
            };
            if (closes.len() as u32) < self.lookback_days {
                debug!(symbol = %ticker.symbol, points = closes.len(), "Insufficient history");
                continue;
            }

            let (Some(&oldest), Some(&latest)) = (closes.first(), closes.last()) else {
                continue;
            };
            if oldest <= Decimal::ZERO {
                continue;
            }
            let week_change_pct = (latest - oldest) / oldest * dec!(100);

            if ticker.price_change_percent <= Decimal::ZERO
                || week_change_pct <= self.min_weekly_gain_pct
            {
                continue;
            }

            candidates.push(RankedCandidate {
                symbol: ticker.symbol.clone(),
                market_cap_rank,
                current_price: latest,
                week_change_pct,
                day_change_pct: ticker.price_change_percent,
                quote_volume_24h: ticker.quote_volume,
            });
        }

        // Vec::sort_by is stable: ties keep encounter order.
        candidates.sort_by(|a, b| b.week_change_pct.cmp(&a.week_change_pct));
        log.push(format!(
            "{} candidates above the momentum threshold",
            candidates.len()
        ));
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{MockExchangeGateway, MockMarketRankingGateway, Ticker24h, UniverseEntry};
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str, day_change: Decimal) -> Ticker24h {
        Ticker24h {
            symbol: symbol.to_string(),
            last_price: dec!(1),
            price_change_percent: day_change,
            quote_volume: dec!(1_000_000),
        }
    }

    fn entry(symbol: &str, rank: u32) -> UniverseEntry {
        UniverseEntry {
            symbol: symbol.to_string(),
            market_cap_rank: rank,
        }
    }

    /// Seven closes with exact endpoints; only those drive the weekly change.
    fn closes(first: Decimal, last: Decimal) -> Vec<Decimal> {
        vec![first, first, first, first, first, first, last]
    }

    fn test_ranker() -> MomentumRanker {
        MomentumRanker::new(&RotationConfig::default())
    }

    #[tokio::test]
    async fn test_filters_and_orders_descending() {
        let mut exchange = MockExchangeGateway::new();
        let tickers = vec![
            ticker("SOLUSDT", dec!(2)),
            ticker("ADAUSDT", dec!(1)),
            ticker("XRPUSDT", dec!(3)),
            ticker("OUTUSDT", dec!(4)), // not in universe
            ticker("ETHBTC", dec!(5)),  // not a quote pair
        ];
        exchange
            .expect_get_24h_tickers()
            .returning(move || Ok(tickers.clone()));

        let mut ranking = MockMarketRankingGateway::new();
        ranking.expect_get_ranked_universe().returning(|| {
            Ok(vec![
                entry("SOLUSDT", 5),
                entry("ADAUSDT", 8),
                entry("XRPUSDT", 6),
            ])
        });
        ranking
            .expect_get_daily_closes()
            .returning(|symbol, _| match symbol {
                "SOLUSDT" => Ok(closes(dec!(100), dec!(140))), // +40%
                "ADAUSDT" => Ok(closes(dec!(1), dec!(1.5))),   // +50%
                "XRPUSDT" => Ok(closes(dec!(2), dec!(2.2))),   // +10%, below bar
                _ => Err(GatewayError::Api("unexpected symbol".into())),
            });

        let candidates = test_ranker()
            .rank(&exchange, &ranking, &RunLog::new())
            .await
            .unwrap();

        let symbols: Vec<&str> = candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ADAUSDT", "SOLUSDT"]);
        assert_eq!(candidates[0].week_change_pct, dec!(50));
        assert_eq!(candidates[0].market_cap_rank, 8);
    }

    #[tokio::test]
    async fn test_negative_day_change_is_excluded() {
        let mut exchange = MockExchangeGateway::new();
        let tickers = vec![ticker("SOLUSDT", dec!(-0.5))];
        exchange
            .expect_get_24h_tickers()
            .returning(move || Ok(tickers.clone()));

        let mut ranking = MockMarketRankingGateway::new();
        ranking
            .expect_get_ranked_universe()
            .returning(|| Ok(vec![entry("SOLUSDT", 5)]));
        ranking
            .expect_get_daily_closes()
            .returning(|_, _| Ok(closes(dec!(100), dec!(150))));

        let candidates = test_ranker()
            .rank(&exchange, &ranking, &RunLog::new())
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_short_history_is_excluded() {
        let mut exchange = MockExchangeGateway::new();
        let tickers = vec![ticker("NEWUSDT", dec!(9))];
        exchange
            .expect_get_24h_tickers()
            .returning(move || Ok(tickers.clone()));

        let mut ranking = MockMarketRankingGateway::new();
        ranking
            .expect_get_ranked_universe()
            .returning(|| Ok(vec![entry("NEWUSDT", 42)]));
        ranking
            .expect_get_daily_closes()
            .returning(|_, _| Ok(vec![dec!(1), dec!(2), dec!(3)]));

        let candidates = test_ranker()
            .rank(&exchange, &ranking, &RunLog::new())
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_history_fault_excludes_only_that_symbol() {
        let mut exchange = MockExchangeGateway::new();
        let tickers = vec![ticker("BADUSDT", dec!(2)), ticker("SOLUSDT", dec!(2))];
        exchange
            .expect_get_24h_tickers()
            .returning(move || Ok(tickers.clone()));

        let mut ranking = MockMarketRankingGateway::new();
        ranking
            .expect_get_ranked_universe()
            .returning(|| Ok(vec![entry("BADUSDT", 9), entry("SOLUSDT", 5)]));
        ranking
            .expect_get_daily_closes()
            .returning(|symbol, _| match symbol {
                "SOLUSDT" => Ok(closes(dec!(100), dec!(140))),
                _ => Err(GatewayError::Timeout("kline fetch".into())),
            });

        let log = RunLog::new();
        let candidates = test_ranker().rank(&exchange, &ranking, &log).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].symbol, "SOLUSDT");
        assert!(log.render().contains("Error processing BADUSDT"));
    }

    #[tokio::test]
    async fn test_ties_keep_encounter_order() {
        let mut exchange = MockExchangeGateway::new();
        let tickers = vec![
            ticker("AAAUSDT", dec!(1)),
            ticker("BBBUSDT", dec!(1)),
            ticker("CCCUSDT", dec!(1)),
        ];
        exchange
            .expect_get_24h_tickers()
            .returning(move || Ok(tickers.clone()));

        let mut ranking = MockMarketRankingGateway::new();
        ranking.expect_get_ranked_universe().returning(|| {
            Ok(vec![
                entry("AAAUSDT", 1),
                entry("BBBUSDT", 2),
                entry("CCCUSDT", 3),
            ])
        });
        ranking
            .expect_get_daily_closes()
            .returning(|_, _| Ok(closes(dec!(100), dec!(140))));

        let candidates = test_ranker()
            .rank(&exchange, &ranking, &RunLog::new())
            .await
            .unwrap();

        let symbols: Vec<&str> = candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAAUSDT", "BBBUSDT", "CCCUSDT"]);
    }

    #[tokio::test]
    async fn test_universe_fault_propagates() {
        let mut exchange = MockExchangeGateway::new();
        exchange.expect_get_24h_tickers().returning(|| Ok(vec![]));

        let mut ranking = MockMarketRankingGateway::new();
        ranking
            .expect_get_ranked_universe()
            .returning(|| Err(GatewayError::Connectivity("dns".into())));

        let result = test_ranker()
            .rank(&exchange, &ranking, &RunLog::new())
            .await;
        assert!(matches!(result, Err(GatewayError::Connectivity(_))));
    }
}
