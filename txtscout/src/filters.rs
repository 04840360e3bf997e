/// File filtering used by the enumerator.
///
/// Two independent predicates decide whether a path is searched:
///
/// 1. **Name suffix**: the file name must end with one of the configured suffixes
///    (`.txt` by default). The comparison is case-sensitive, so `notes.TXT` is not
///    a match for `.txt`.
///
/// 2. **Ignore globs**: user supplied `glob` patterns checked against the path
///    relative to the search root. A directory that matches is pruned as a whole.
///
/// Both are plain functions over borrowed data so the walker can call them from
/// its `filter_entry` closure without cloning configuration.
use glob::Pattern;
use std::path::Path;
use tracing::warn;

/// Checks if a file name ends with one of the configured suffixes
pub fn has_valid_suffix(path: &Path, suffixes: &[String]) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())),
        None => false,
    }
}

/// Compiled ignore patterns
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compiles the given glob patterns, skipping (and logging) invalid ones
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring invalid glob pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Checks `relative` (a path relative to the search root) against every pattern
    pub fn should_ignore(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        // Patterns are written with forward slashes on every platform
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|p| p.matches(&normalized))
    }
}
