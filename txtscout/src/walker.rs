use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::SearchConfig;
use crate::errors::{absolute_path, SearchError, SearchResult};
use crate::filters::{has_valid_suffix, IgnoreSet};

/// A file selected for searching.
///
/// Captured once during enumeration and never mutated afterwards; search tasks
/// receive their own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
    len: u64,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>, len: u64) -> Self {
        Self {
            path: path.into(),
            len,
        }
    }

    /// Builds a handle from a path on disk, reading its metadata
    pub fn from_path(path: impl AsRef<Path>) -> SearchResult<Self> {
        let path = absolute_path(path.as_ref());
        let metadata = path
            .metadata()
            .map_err(|e| SearchError::from_io(&path, e))?;
        Ok(Self::new(path, metadata.len()))
    }

    /// Absolute path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes at enumeration time
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Ensures the root exists and is a directory.
pub fn validate_root(root: &Path) -> SearchResult<PathBuf> {
    if !root.is_dir() {
        return Err(SearchError::config_error(format!(
            "Invalid folder path: {}",
            root.display()
        )));
    }
    Ok(absolute_path(root))
}

/// Recursively lists the files under `config.root_path` whose names carry one of
/// the configured suffixes, in depth-first pre-order.
///
/// Unreadable directories and symlink loops are skipped without failing the walk.
pub fn enumerate_files(config: &SearchConfig) -> SearchResult<Vec<FileHandle>> {
    let root = validate_root(&config.root_path)?;
    let ignore_set = IgnoreSet::new(&config.ignore_patterns);

    let mut walker = WalkBuilder::new(&root);
    walker
        .standard_filters(config.respect_gitignore)
        .require_git(false)
        .follow_links(true);

    if config.sort_entries {
        walker.sort_by_file_name(|a, b| a.cmp(b));
    }

    if !ignore_set.is_empty() {
        let prune_root = root.clone();
        walker.filter_entry(move |entry| {
            match entry.path().strip_prefix(&prune_root) {
                Ok(relative) if !relative.as_os_str().is_empty() => {
                    !ignore_set.should_ignore(relative)
                }
                _ => true,
            }
        });
    }

    let mut files = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if !has_valid_suffix(entry.path(), &config.file_suffixes) {
            continue;
        }

        let len = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                debug!("Failed to get metadata for {}: {}", entry.path().display(), e);
                0
            }
        };
        files.push(FileHandle::new(entry.into_path(), len));
    }

    debug!("Found {} files to search under {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(root: &Path, files: &[FileHandle]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_preorder_with_suffix_filter() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.md"), "b").unwrap();
        fs::create_dir_all(root.join("c/e")).unwrap();
        fs::write(root.join("c/d.txt"), "d").unwrap();
        fs::write(root.join("c/e/f.txt"), "f").unwrap();
        fs::write(root.join("z.txt"), "z").unwrap();

        let config = SearchConfig::new("x", root);
        let files = enumerate_files(&config).unwrap();
        let root = absolute_path(root);

        assert_eq!(
            names(&root, &files),
            vec!["a.txt", "c/d.txt", "c/e/f.txt", "z.txt"]
        );
        assert!(files.iter().all(|f| f.path().is_absolute()));
        assert_eq!(files[0].len(), 1);
    }

    #[test]
    fn test_directory_named_like_a_file_is_recursed() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("looks_like.txt")).unwrap();
        fs::write(dir.path().join("looks_like.txt/inner.txt"), "x").unwrap();

        let config = SearchConfig::new("x", dir.path());
        let files = enumerate_files(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path().ends_with("looks_like.txt/inner.txt"));
    }

    #[test]
    fn test_hidden_files_included_by_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".hidden.txt"), "x").unwrap();
        fs::write(dir.path().join(".gitignore"), "skipped.txt\n").unwrap();
        fs::write(dir.path().join("skipped.txt"), "x").unwrap();

        let config = SearchConfig::new("x", dir.path());
        assert_eq!(enumerate_files(&config).unwrap().len(), 2);

        let mut config = SearchConfig::new("x", dir.path());
        config.respect_gitignore = true;
        assert!(enumerate_files(&config).unwrap().is_empty());
    }

    #[test]
    fn test_ignore_patterns_prune_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("archive/2020")).unwrap();
        fs::write(dir.path().join("archive/2020/old.txt"), "x").unwrap();
        fs::write(dir.path().join("draft_1.txt"), "x").unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();

        let mut config = SearchConfig::new("x", dir.path());
        config.ignore_patterns = vec!["archive".to_string(), "draft_*.txt".to_string()];

        let files = enumerate_files(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path().ends_with("keep.txt"));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let config = SearchConfig::new("x", dir.path());
        assert!(enumerate_files(&config).unwrap().is_empty());
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let err = enumerate_files(&SearchConfig::new("x", &file)).unwrap_err();
        assert!(matches!(err, SearchError::ConfigError(_)));

        let err = enumerate_files(&SearchConfig::new("x", dir.path().join("missing")))
            .unwrap_err();
        assert!(matches!(err, SearchError::ConfigError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/x.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let files = enumerate_files(&SearchConfig::new("x", dir.path())).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), "x").unwrap();
        fs::write(dir.path().join("open.txt"), "x").unwrap();
        fs::create_dir_all(dir.path().join("zeta")).unwrap();
        fs::write(dir.path().join("zeta/last.txt"), "x").unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores directory permissions
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = enumerate_files(&SearchConfig::new("x", dir.path()));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let files = result.unwrap();
        let root = absolute_path(dir.path());
        assert_eq!(names(&root, &files), vec!["open.txt", "zeta/last.txt"]);
    }

    #[test]
    fn test_file_handle_from_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("h.txt");
        fs::write(&file, "hello").unwrap();

        let handle = FileHandle::from_path(&file).unwrap();
        assert_eq!(handle.len(), 5);
        assert!(!handle.is_empty());

        let err = FileHandle::from_path(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, SearchError::FileNotFound(_)));
    }
}
