//! Rotation sequencing, outer retry policy, and operator reporting.

use crate::config::{RetryConfig, RotationConfig};
use crate::error::GatewayError;
use crate::exchange::{ExchangeGateway, MarketRankingGateway};
use crate::notify::Notify;
use crate::rotation::acquirer::Acquirer;
use crate::rotation::liquidator::Liquidator;
use crate::rotation::ranker::MomentumRanker;
use crate::rotation::report::ExecutionReport;
use crate::rotation::snapshot::SnapshotReader;
use crate::runlog::RunLog;
use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Phases of one rotation run. A run walks them in order exactly once;
/// only the outer retry ever returns to `Idle` mid-sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    SnapshotBefore,
    Liquidating,
    Ranking,
    Acquiring,
    SnapshotAfter,
    Reporting,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::SnapshotBefore => "snapshot-before",
            RunPhase::Liquidating => "liquidating",
            RunPhase::Ranking => "ranking",
            RunPhase::Acquiring => "acquiring",
            RunPhase::SnapshotAfter => "snapshot-after",
            RunPhase::Reporting => "reporting",
        };
        write!(f, "{name}")
    }
}

/// Drives the full rotation sequence and retries failed attempts from
/// scratch; partial state like "sold but not yet bought" is never resumed,
/// the restart re-reads ground truth through the opening snapshot.
pub struct RotationOrchestrator {
    exchange: Arc<dyn ExchangeGateway>,
    ranking: Arc<dyn MarketRankingGateway>,
    snapshot: SnapshotReader,
    liquidator: Liquidator,
    ranker: MomentumRanker,
    acquirer: Acquirer,
    config: RotationConfig,
    retry: RetryConfig,
}

impl RotationOrchestrator {
    pub fn new(
        exchange: Arc<dyn ExchangeGateway>,
        ranking: Arc<dyn MarketRankingGateway>,
        config: RotationConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            snapshot: SnapshotReader::new(&config.quote_asset),
            liquidator: Liquidator::new(&config),
            ranker: MomentumRanker::new(&config),
            acquirer: Acquirer::new(&config),
            exchange,
            ranking,
            config,
            retry,
        }
    }

    /// Execute one full rotation pass.
    pub async fn run_once(&self) -> Result<ExecutionReport, GatewayError> {
        let log = RunLog::new();
        let started_at = Utc::now();

        self.enter(RunPhase::SnapshotBefore);
        log.push("Fetching balances before rotation...");
        let before = self.snapshot.capture(self.exchange.as_ref(), &log).await?;

        self.enter(RunPhase::Liquidating);
        self.liquidator
            .liquidate_all(self.exchange.as_ref(), &log)
            .await?;
        // Let sell orders settle before any capital math reads the balance.
        tokio::time::sleep(self.config.settle_delay()).await;
        let quote_free = self.quote_free_balance().await?;
        log.push(format!(
            "{} balance after liquidation: {:.2}",
            self.config.quote_asset, quote_free
        ));

        self.enter(RunPhase::Ranking);
        let candidates = self
            .ranker
            .rank(self.exchange.as_ref(), self.ranking.as_ref(), &log)
            .await?;
        for candidate in candidates.iter().take(self.config.target_positions) {
            log.push(format!(
                "#{} {}  7d {:.2}%  24h {:.2}%  vol {:.0}",
                candidate.market_cap_rank,
                candidate.symbol,
                candidate.week_change_pct,
                candidate.day_change_pct,
                candidate.quote_volume_24h
            ));
        }

        self.enter(RunPhase::Acquiring);
        let acquired = self
            .acquirer
            .acquire_top(self.exchange.as_ref(), &candidates, &log)
            .await?;

        self.enter(RunPhase::SnapshotAfter);
        log.push("Fetching balances after rotation...");
        let after = self.snapshot.capture(self.exchange.as_ref(), &log).await?;

        self.enter(RunPhase::Reporting);
        let report = ExecutionReport {
            started_at,
            finished_at: Utc::now(),
            quote_asset: self.config.quote_asset.clone(),
            before,
            after,
            acquired,
            error_lines: log.error_lines(),
            log_text: log.render(),
        };
        self.enter(RunPhase::Idle);
        Ok(report)
    }

    /// Retry the full run until it completes, then notify the operator.
    ///
    /// Aborted attempts send nothing: the error digest and summary both
    /// describe only the pass that succeeded.
    pub async fn run_to_completion(&self, notifier: &dyn Notify) -> ExecutionReport {
        loop {
            match self.run_once().await {
                Ok(report) => {
                    if let Some(digest) = report.error_digest() {
                        notifier.send_text(&digest).await;
                    }
                    notifier.send_text(&report.summary()).await;
                    return report;
                }
                Err(e) => {
                    let backoff = self.retry.backoff_for(&e);
                    error!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "Rotation attempt failed; restarting from idle after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn enter(&self, phase: RunPhase) {
        debug!(phase = %phase, "Entering rotation phase");
    }

    async fn quote_free_balance(&self) -> Result<Decimal, GatewayError> {
        let balances = self.exchange.get_balances().await?;
        Ok(balances
            .iter()
            .find(|b| b.asset == self.config.quote_asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_names() {
        assert_eq!(RunPhase::SnapshotBefore.to_string(), "snapshot-before");
        assert_eq!(RunPhase::Idle.to_string(), "idle");
    }
}
