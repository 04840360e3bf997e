/// Aggregated search results handed to the reporting boundary.
///
/// Matches are stored as an ordered list of paths. The order is the order in
/// which tasks were submitted, which is the enumeration order of the files,
/// and never the order in which workers happened to finish them.
use std::path::PathBuf;
use std::time::Duration;

use crate::search::pool::PoolTermination;

/// A task that could not produce a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// File (or task label) the failure belongs to
    pub path: PathBuf,
    /// Human readable description of the error
    pub message: String,
}

/// Represents the complete search results
#[derive(Debug, Clone)]
pub struct SearchOutput {
    /// Paths of files containing the term, in submission order
    pub matches: Vec<PathBuf>,
    /// Tasks that failed, in submission order
    pub failures: Vec<TaskFailure>,
    /// Total number of files handed to the pool
    pub files_searched: usize,
    /// Worker threads used
    pub thread_count: usize,
    /// Wall-clock time from enumeration to the end of collection
    pub elapsed: Duration,
    /// How the worker pool shut down
    pub termination: PoolTermination,
}

impl Default for SearchOutput {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
            failures: Vec::new(),
            files_searched: 0,
            thread_count: 0,
            elapsed: Duration::ZERO,
            termination: PoolTermination::Graceful,
        }
    }
}

impl SearchOutput {
    /// Creates a new empty search output
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of files with at least one matching line
    pub fn files_with_matches(&self) -> usize {
        self.matches.len()
    }

    /// True when no task failed and the pool drained normally
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.termination == PoolTermination::Graceful
    }

    /// Elapsed time in whole milliseconds
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}
