//! Momentum Rotator - Main Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use momentum_rotator::config::Config;
use momentum_rotator::exchange::{
    BinanceClient, CoinGeckoClient, ExchangeGateway, MarketDataService, MarketRankingGateway,
};
use momentum_rotator::notify::TelegramNotifier;
use momentum_rotator::rotation::{MomentumRanker, RotationOrchestrator, SnapshotReader};
use momentum_rotator::runlog::RunLog;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Momentum Rotator CLI
#[derive(Parser)]
#[command(name = "momentum-rotator")]
#[command(version, about = "Weekly momentum rotation on Binance spot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print current account balances valued in the quote asset
    Balances,
    /// Print the current momentum ranking table
    Gainers,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let config = Config::load()?;
    config.validate()?;

    let exchange = Arc::new(BinanceClient::new(&config.binance)?);
    let market_data = Arc::new(MarketDataService::new(
        CoinGeckoClient::new()?,
        exchange.clone(),
        &config.rotation,
    ));

    match cli.command {
        Some(Commands::Balances) => return show_balances(exchange.as_ref(), &config).await,
        Some(Commands::Gainers) => {
            return show_gainers(exchange.as_ref(), market_data.as_ref(), &config).await;
        }
        None => {}
    }

    info!(
        "Momentum Rotator v{} starting rotation",
        env!("CARGO_PKG_VERSION")
    );

    let notifier = TelegramNotifier::new(&config.telegram)?;
    let orchestrator = RotationOrchestrator::new(
        exchange,
        market_data,
        config.rotation.clone(),
        config.retry.clone(),
    );

    let report = orchestrator.run_to_completion(&notifier).await;
    info!(
        total_before = %report.before.total_quote_value,
        total_after = %report.after.total_quote_value,
        acquired = ?report.acquired,
        "Rotation complete"
    );
    Ok(())
}

/// Standalone balance listing, outside any rotation run.
async fn show_balances(exchange: &dyn ExchangeGateway, config: &Config) -> Result<()> {
    let reader = SnapshotReader::new(&config.rotation.quote_asset);
    let snapshot = reader.capture(exchange, &RunLog::new()).await?;

    println!("Positive Balances with {} Equivalent:", config.rotation.quote_asset);
    println!("{}", "=".repeat(60));
    for balance in &snapshot.balances {
        println!(
            "{}: {} (~{:.2} {})",
            balance.asset, balance.amount, balance.quote_value, config.rotation.quote_asset
        );
    }
    println!(
        "Total Portfolio Value: {:.2} {}",
        snapshot.total_quote_value, config.rotation.quote_asset
    );
    Ok(())
}

/// Standalone momentum table, outside any rotation run.
async fn show_gainers(
    exchange: &dyn ExchangeGateway,
    market_data: &dyn MarketRankingGateway,
    config: &Config,
) -> Result<()> {
    let ranker = MomentumRanker::new(&config.rotation);
    let candidates = ranker.rank(exchange, market_data, &RunLog::new()).await?;

    println!(
        "\nTop {} Gainers (universe cap {}, >{}% weekly gain, positive 24h change):",
        config.rotation.target_positions,
        config.rotation.universe_size,
        config.rotation.min_weekly_gain_pct
    );
    println!("{}", "=".repeat(100));
    println!(
        "{:<6}{:<12}{:<15}{:<12}{:<12}{:<20}",
        "Rank", "Symbol", "Price", "7d Change", "24h Change", "24h Volume"
    );
    println!("{}", "-".repeat(100));
    for candidate in candidates.iter().take(config.rotation.target_positions) {
        println!(
            "{:<6}{:<12}${:<14.4}{:>8.2}%  {:>8.2}%  {:>18.2}",
            candidate.market_cap_rank,
            candidate.symbol,
            candidate.current_price,
            candidate.week_change_pct,
            candidate.day_change_pct,
            candidate.quote_volume_24h
        );
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // File appender for detailed logs
    let file_appender = tracing_appender::rolling::daily("logs", "momentum-rotator.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("momentum_rotator=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_ansi(false)
        .init();

    Ok(())
}
