//! This module implements the concurrent search pipeline.
//!
//! # Pipeline
//!
//! ```text
//! walker::enumerate_files ──► SearchTask per file ──► WorkerPool ──► ResultCollector ──► SearchOutput
//! ```
//!
//! 1. **Enumeration** produces the files in depth-first pre-order.
//! 2. **Tasks** pair one file with the search term. Each task reads its file line by
//!    line and stops at the first line containing the term.
//! 3. **The pool** runs the tasks on a fixed number of threads and hands back one
//!    [`pool::TaskHandle`] per task.
//! 4. **The collector** waits on the handles in submission order, so the output order
//!    is the enumeration order no matter which worker finished first.
//!
//! # Error Handling
//!
//! A file that cannot be opened or read does not stop the batch:
//! ```rust,ignore
//! let output = search(&config)?;        // Only configuration errors escape
//! for failure in &output.failures {     // Per-file errors are collected here
//!     eprintln!("{}: {}", failure.path.display(), failure.message);
//! }
//! ```

pub mod collector;
pub mod engine;
pub mod pool;
pub mod task;

pub use collector::ResultCollector;
pub use engine::{search, search_files};
pub use pool::{
    Interrupt, PoolPhase, PoolStats, PoolTermination, Task, TaskHandle, TaskOutcome, WorkerPool,
};
pub use task::{scan_lines, MatchResult, Scan, SearchTask};
