use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::collector::ResultCollector;
use super::pool::WorkerPool;
use super::task::SearchTask;
use crate::config::SearchConfig;
use crate::errors::SearchResult;
use crate::results::SearchOutput;
use crate::walker::{enumerate_files, FileHandle};

/// Searches every matching file under `config.root_path` for `config.pattern`.
///
/// Configuration errors (empty pattern, root not a directory) are returned before
/// any worker is started. Per-file errors end up in [`SearchOutput::failures`].
pub fn search(config: &SearchConfig) -> SearchResult<SearchOutput> {
    info!("Starting search for {:?} in {}", config.pattern, config.root_path.display());
    config.validate()?;

    let started = Instant::now();
    let files = enumerate_files(config)?;
    run_batch(files, config, started)
}

/// Searches an explicit list of files, skipping enumeration.
pub fn search_files(files: Vec<FileHandle>, config: &SearchConfig) -> SearchResult<SearchOutput> {
    config.validate()?;
    run_batch(files, config, Instant::now())
}

fn run_batch(
    files: Vec<FileHandle>,
    config: &SearchConfig,
    started: Instant,
) -> SearchResult<SearchOutput> {
    let mut pool = WorkerPool::new(config.thread_count)?;
    let term: Arc<str> = Arc::from(config.pattern.as_str());

    let handles: Vec<_> = files
        .iter()
        .map(|file| {
            pool.submit(SearchTask::new(
                file.clone(),
                Arc::clone(&term),
                config.encoding_mode,
            ))
        })
        .collect();
    debug!("Submitted {} search tasks", handles.len());

    let collector = ResultCollector::collect(handles);
    let stats = pool.stats();
    let termination = pool.shutdown(config.shutdown_timeout);
    let (matches, failures) = collector.into_parts();

    let output = SearchOutput {
        matches,
        failures,
        files_searched: files.len(),
        thread_count: config.thread_count.get(),
        elapsed: started.elapsed(),
        termination,
    };

    debug!(
        "Pool finished {} of {} tasks, peak concurrency {}",
        stats.completed, stats.submitted, stats.peak_running
    );
    info!(
        "Search complete. {} of {} files matched, {} failed, {} ms",
        output.files_with_matches(),
        output.files_searched,
        output.failures.len(),
        output.elapsed_millis()
    );

    Ok(output)
}
