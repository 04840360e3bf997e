use std::path::PathBuf;
use tracing::debug;

use super::pool::{TaskHandle, TaskOutcome};
use super::task::MatchResult;
use crate::results::TaskFailure;

/// Gathers task outcomes in submission order.
///
/// Each handle is awaited in turn; a slow early task holds back collection of
/// later ones but never changes their order in the output.
#[derive(Debug, Default)]
pub struct ResultCollector {
    matches: Vec<PathBuf>,
    failures: Vec<TaskFailure>,
    collected: usize,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits on every handle in iteration order and records its outcome
    pub fn collect<I>(handles: I) -> Self
    where
        I: IntoIterator<Item = TaskHandle<MatchResult>>,
    {
        let mut collector = Self::new();
        for handle in handles {
            let label = handle.label().to_string();
            let outcome = handle.wait();
            collector.record(label, outcome);
        }
        collector
    }

    /// Records one outcome; failures are kept and never stop collection
    pub fn record(&mut self, label: String, outcome: TaskOutcome<MatchResult>) {
        self.collected += 1;
        match outcome {
            TaskOutcome::Success(MatchResult::Matched { path, .. }) => self.matches.push(path),
            TaskOutcome::Success(MatchResult::NoMatch) => {}
            TaskOutcome::Failure(err) => {
                debug!("Task for {} failed: {}", label, err);
                self.failures.push(TaskFailure {
                    path: PathBuf::from(label),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Number of outcomes recorded so far
    pub fn collected(&self) -> usize {
        self.collected
    }

    pub fn matches(&self) -> &[PathBuf] {
        &self.matches
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn into_parts(self) -> (Vec<PathBuf>, Vec<TaskFailure>) {
        (self.matches, self.failures)
    }
}
