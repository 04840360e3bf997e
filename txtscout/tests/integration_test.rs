use anyhow::Result;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tempfile::tempdir;
use txtscout::search::search;
use txtscout::{enumerate_files, search_files, EncodingMode, FileHandle, SearchConfig, SearchError};

fn create_test_files(
    dir: &tempfile::TempDir,
    file_count: usize,
    lines_per_file: usize,
) -> Result<()> {
    for i in 0..file_count {
        let sub = dir.path().join(format!("group_{}", i % 4));
        fs::create_dir_all(&sub)?;
        let mut file = File::create(sub.join(format!("test_{}.txt", i)))?;
        for j in 0..lines_per_file {
            writeln!(file, "Line {} in file {}: nothing special", j, i)?;
            // Every third file carries the marker on its last line
            if i % 3 == 0 && j == lines_per_file - 1 {
                writeln!(file, "MARKER in file {}", i)?;
            }
        }
    }
    Ok(())
}

fn config_for(dir: &tempfile::TempDir, pattern: &str, threads: usize) -> SearchConfig {
    let mut config = SearchConfig::new(pattern, dir.path());
    config.thread_count = NonZeroUsize::new(threads).unwrap();
    config
}

#[test]
fn test_matches_equal_files_containing_term() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 30, 50)?;
    // Non-matching suffix with the marker must not be reported
    fs::write(dir.path().join("group_0/extra.md"), "MARKER")?;

    let output = search(&config_for(&dir, "MARKER", 4))?;

    let expected: BTreeSet<PathBuf> = (0..30)
        .filter(|i| i % 3 == 0)
        .map(|i| {
            dir.path()
                .join(format!("group_{}", i % 4))
                .join(format!("test_{}.txt", i))
        })
        .collect();
    let actual: BTreeSet<PathBuf> = output.matches.iter().cloned().collect();

    assert_eq!(actual, expected);
    assert_eq!(output.matches.len(), expected.len());
    assert_eq!(output.files_searched, 30);
    assert!(output.failures.is_empty());
    Ok(())
}

#[test]
fn test_output_follows_enumeration_order() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 40, 20)?;

    let config = config_for(&dir, "Line 0", 8);
    let enumerated: Vec<PathBuf> = enumerate_files(&config)?
        .into_iter()
        .map(|f| f.path().to_path_buf())
        .collect();

    let output = search(&config)?;
    assert_eq!(output.matches, enumerated);
    Ok(())
}

#[test]
fn test_repeated_runs_are_identical() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 25, 10)?;

    let config = config_for(&dir, "MARKER", 6);
    let first = search(&config)?;
    for _ in 0..3 {
        let again = search(&config)?;
        assert_eq!(again.matches, first.matches);
    }
    Ok(())
}

#[test]
fn test_thread_count_does_not_change_results() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, 20, 10)?;

    let single = search(&config_for(&dir, "MARKER", 1))?;
    let many = search(&config_for(&dir, "MARKER", 16))?;
    assert_eq!(single.matches, many.matches);
    assert_eq!(single.thread_count, 1);
    assert_eq!(many.thread_count, 16);
    Ok(())
}

#[test]
fn test_one_unreadable_file_among_many() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..9 {
        let content = if i % 2 == 0 { "has needle" } else { "plain" };
        fs::write(dir.path().join(format!("f{}.txt", i)), content)?;
    }
    // Invalid UTF-8 cannot be read under FailFast decoding
    fs::write(dir.path().join("f9.txt"), b"needle \xff\xfe\n")?;

    let mut config = config_for(&dir, "needle", 3);
    config.encoding_mode = EncodingMode::FailFast;
    let output = search(&config)?;

    assert_eq!(output.files_searched, 10);
    assert_eq!(
        output.matches,
        (0..9)
            .filter(|i| i % 2 == 0)
            .map(|i| dir.path().join(format!("f{}.txt", i)))
            .collect::<Vec<_>>()
    );
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].path, dir.path().join("f9.txt"));
    Ok(())
}

#[test]
fn test_vanishing_file_is_a_failure_not_a_crash() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "needle")?;
    fs::write(dir.path().join("b.txt"), "needle")?;

    let config = config_for(&dir, "needle", 2);
    let files = enumerate_files(&config)?;
    fs::remove_file(dir.path().join("a.txt"))?;

    let output = search_files(files, &config)?;
    assert_eq!(output.matches, vec![dir.path().join("b.txt")]);
    assert_eq!(output.failures.len(), 1);
    assert!(output.failures[0].message.contains("File not found"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_permission_denied_file_is_isolated() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "needle")?;
    fs::write(dir.path().join("b.txt"), "needle")?;
    fs::write(dir.path().join("c.txt"), "needle")?;
    let locked = dir.path().join("b.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;
    // Root can read the file regardless of its mode
    if File::open(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644))?;
        return Ok(());
    }

    let result = search(&config_for(&dir, "needle", 2));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644))?;
    let output = result?;

    assert_eq!(output.files_searched, 3);
    assert_eq!(
        output.matches,
        vec![dir.path().join("a.txt"), dir.path().join("c.txt")]
    );
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].path, locked);
    assert!(output.failures[0].message.starts_with("Permission denied"));
    Ok(())
}

#[test]
fn test_empty_directory_reports_nothing() -> Result<()> {
    let dir = tempdir()?;
    let output = search(&config_for(&dir, "anything", 2))?;
    assert!(output.matches.is_empty());
    assert_eq!(output.files_searched, 0);
    assert!(output.elapsed_millis() < 60_000);
    Ok(())
}

#[test]
fn test_root_is_a_file() -> Result<()> {
    let dir = tempdir()?;
    let file = dir.path().join("not_a_dir.txt");
    fs::write(&file, "hello")?;

    let err = search(&SearchConfig::new("hello", &file)).unwrap_err();
    assert!(matches!(err, SearchError::ConfigError(_)));
    Ok(())
}

#[test]
fn test_search_files_with_explicit_handles() -> Result<()> {
    let dir = tempdir()?;
    let first = dir.path().join("z_first.txt");
    let second = dir.path().join("a_second.txt");
    fs::write(&first, "alpha\nbeta\n")?;
    fs::write(&second, "beta\n")?;

    // Caller-provided order wins over name order
    let files = vec![FileHandle::from_path(&first)?, FileHandle::from_path(&second)?];
    let output = search_files(files, &SearchConfig::new("beta", dir.path()))?;
    assert_eq!(output.matches, vec![first, second]);
    Ok(())
}
