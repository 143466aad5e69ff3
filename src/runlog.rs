//! Run-log accumulator shared across rotation components.
//!
//! Every component appends human-readable lines here during a run; the
//! accumulator mirrors each line to the tracing console output and retains
//! it for the execution report. The report and the console are two
//! independent consumers of the same log; components own neither.

use std::sync::Mutex;
use tracing::{error, info};

/// Case-insensitive tokens that mark a line as a failure for the
/// operator's error digest.
const ERROR_KEYWORDS: [&str; 3] = ["error", "exception", "failed"];

/// Append-only log for one rotation run.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Mutex<Vec<String>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, mirrored to the console at info level.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.lines.lock().expect("run log lock poisoned").push(line);
    }

    /// Append a failure line, mirrored to the console at error level.
    pub fn push_error(&self, line: impl Into<String>) {
        let line = line.into();
        error!("{line}");
        self.lines.lock().expect("run log lock poisoned").push(line);
    }

    /// Every line appended so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("run log lock poisoned").clone()
    }

    /// Full run text, one line per entry.
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    /// Lines that look like failures, selected by keyword match.
    pub fn error_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| {
                let lower = line.to_lowercase();
                ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_retained_in_order() {
        let log = RunLog::new();
        log.push("first");
        log.push_error("Error: second");
        log.push("third");

        assert_eq!(log.lines(), vec!["first", "Error: second", "third"]);
        assert_eq!(log.render(), "first\nError: second\nthird");
    }

    #[test]
    fn test_error_extraction_is_case_insensitive() {
        let log = RunLog::new();
        log.push("all good");
        log.push("An ERROR occurred while selling");
        log.push("order Failed for BTCUSDT");
        log.push("caught an Exception in ranking");
        log.push("errorless line does match by substring");

        let errors = log.error_lines();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|l| {
            let lower = l.to_lowercase();
            lower.contains("error") || lower.contains("failed") || lower.contains("exception")
        }));
    }

    #[test]
    fn test_push_error_lines_still_need_keywords() {
        // Extraction keys off text, not log level: a push_error line without
        // a keyword is not part of the digest.
        let log = RunLog::new();
        log.push_error("something odd happened");
        assert!(log.error_lines().is_empty());
    }
}
