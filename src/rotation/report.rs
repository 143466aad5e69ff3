//! Execution report assembly and operator summary formatting.

use crate::rotation::snapshot::PortfolioSnapshot;
use chrono::{DateTime, Utc};

/// Immutable record of one completed rotation pass. Consumed only by the
/// notification channel and the operator log.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub quote_asset: String,
    pub before: PortfolioSnapshot,
    pub after: PortfolioSnapshot,
    pub acquired: Vec<String>,
    /// Every line emitted during the run, in order.
    pub log_text: String,
    /// Failure lines extracted from the log by keyword match.
    pub error_lines: Vec<String>,
}

impl ExecutionReport {
    /// Human-readable summary for the operator channel.
    pub fn summary(&self) -> String {
        let acquired = if self.acquired.is_empty() {
            "- (none)".to_string()
        } else {
            self.acquired
                .iter()
                .map(|symbol| format!("- `{symbol}`"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        [
            "🚀 *Rotation Summary* 🚀".to_string(),
            String::new(),
            "*Balances Before Execution:*".to_string(),
            format_balances(&self.before),
            format!(
                "\n*Initial Total Portfolio Value:* `{:.2} {}`",
                self.before.total_quote_value, self.quote_asset
            ),
            String::new(),
            "*Symbols Purchased:*".to_string(),
            acquired,
            String::new(),
            "*Balances After Execution:*".to_string(),
            format_balances(&self.after),
            format!(
                "\n*Final Total Portfolio Value:* `{:.2} {}`",
                self.after.total_quote_value, self.quote_asset
            ),
            String::new(),
            "Happy Trading! 📈".to_string(),
        ]
        .join("\n")
    }

    /// Failure lines formatted for a separate preceding notification, or
    /// `None` when the run was clean.
    pub fn error_digest(&self) -> Option<String> {
        if self.error_lines.is_empty() {
            None
        } else {
            Some(format!("```\n{}\n```", self.error_lines.join("\n")))
        }
    }
}

fn format_balances(snapshot: &PortfolioSnapshot) -> String {
    if snapshot.balances.is_empty() {
        return "- (empty)".to_string();
    }
    snapshot
        .balances
        .iter()
        .map(|b| format!("- `{}`: {} (~{:.2})", b.asset, b.amount, b.quote_value))
        .collect::<Vec<_>>()
        .join("\n")
}
