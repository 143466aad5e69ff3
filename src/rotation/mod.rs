//! The rotation engine.
//!
//! One run walks snapshot → liquidation → ranking → acquisition → snapshot
//! → report. Quantities are normalized to exchange lot constraints, capital
//! is re-read before every acquisition, and the outer retry restarts a
//! failed pass from scratch.

mod acquirer;
mod liquidator;
mod orchestrator;
mod ranker;
mod report;
mod snapshot;

pub use acquirer::Acquirer;
pub use liquidator::Liquidator;
pub use orchestrator::{RotationOrchestrator, RunPhase};
pub use ranker::MomentumRanker;
pub use report::ExecutionReport;
pub use snapshot::{PortfolioSnapshot, SnapshotReader, ValuedBalance};
