use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

use super::pool::{Interrupt, Task};
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::walker::FileHandle;

const BUFFER_CAPACITY: usize = 8192; // Initial buffer size for reading files
const LINE_CAPACITY: usize = 256;

/// Result of scanning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The file has at least one line containing the term
    Matched {
        path: PathBuf,
        /// 1-based number of the first matching line
        line_number: usize,
    },
    NoMatch,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Path of the matching file, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Matched { path, .. } => Some(path),
            Self::NoMatch => None,
        }
    }
}

/// Searches a single file for a literal term, stopping at the first matching line.
#[derive(Debug, Clone)]
pub struct SearchTask {
    file: FileHandle,
    term: Arc<str>,
    encoding_mode: EncodingMode,
}

impl SearchTask {
    pub fn new(file: FileHandle, term: Arc<str>, encoding_mode: EncodingMode) -> Self {
        Self {
            file,
            term,
            encoding_mode,
        }
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// Opens the file and scans it
    pub fn execute(&self, interrupt: &Interrupt) -> SearchResult<MatchResult> {
        let path = self.file.path();
        trace!("Searching file: {}", path.display());

        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);

        match scan_lines(reader, &self.term, self.encoding_mode, interrupt) {
            Ok(Scan::Found(line_number)) => {
                trace!("Match in {} at line {}", path.display(), line_number);
                Ok(MatchResult::Matched {
                    path: path.to_path_buf(),
                    line_number,
                })
            }
            Ok(Scan::Exhausted) => Ok(MatchResult::NoMatch),
            Ok(Scan::InvalidUtf8(line)) => Err(SearchError::encoding_error(path, line)),
            Ok(Scan::Interrupted) => Err(SearchError::interrupted(path.display().to_string())),
            Err(e) => Err(SearchError::from_io(path, e)),
        }
    }
}

impl Task for SearchTask {
    type Output = MatchResult;

    fn run(self, interrupt: &Interrupt) -> SearchResult<MatchResult> {
        self.execute(interrupt)
    }

    fn describe(&self) -> String {
        self.file.path().display().to_string()
    }
}

/// How a line scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// 1-based number of the first line containing the term
    Found(usize),
    Exhausted,
    /// FailFast decoding hit invalid UTF-8 on this line
    InvalidUtf8(usize),
    Interrupted,
}

/// Reads `reader` line by line until a line contains `term`.
///
/// Nothing past the first matching line is consumed from the reader.
pub fn scan_lines<R: BufRead>(
    mut reader: R,
    term: &str,
    encoding_mode: EncodingMode,
    interrupt: &Interrupt,
) -> std::io::Result<Scan> {
    let mut buf = Vec::with_capacity(LINE_CAPACITY);
    let mut line_number = 0;

    loop {
        if interrupt.is_set() {
            return Ok(Scan::Interrupted);
        }

        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(Scan::Exhausted);
        }
        line_number += 1;

        let line = trim_line_ending(&buf);
        let found = match encoding_mode {
            EncodingMode::FailFast => match std::str::from_utf8(line) {
                Ok(text) => text.contains(term),
                Err(_) => return Ok(Scan::InvalidUtf8(line_number)),
            },
            EncodingMode::Lossy => String::from_utf8_lossy(line).contains(term),
        };

        if found {
            return Ok(Scan::Found(line_number));
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
