use clap::Parser;
use std::{num::NonZeroUsize, path::PathBuf, process::ExitCode, time::Duration};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use txtscout::{search, CliOverrides, EncodingMode, SearchConfig, SearchError, SearchOutput};

type Result<T> = std::result::Result<T, SearchError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to search recursively
    folder_path: PathBuf,

    /// Literal text to look for (case-sensitive)
    search_string: String,

    /// Number of worker threads to use (default: CPU cores)
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// File name suffix to include, can be repeated (default: .txt)
    #[arg(short = 's', long = "suffix")]
    suffixes: Vec<String>,

    /// Patterns to ignore (glob format, relative to the folder)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Honour .gitignore files and skip hidden entries
    #[arg(long)]
    gitignore: bool,

    /// Keep the filesystem's directory listing order instead of sorting by name
    #[arg(long)]
    unsorted: bool,

    /// How to handle invalid UTF-8 sequences (failfast|lossy) [default: lossy]
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// Grace period for workers to finish before they are interrupted [default: 60s]
    #[arg(long, value_parser = humantime::parse_duration)]
    shutdown_timeout: Option<Duration>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show only statistics, not matching files
    #[arg(long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error) [default: warn]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            file_suffixes: non_empty(&self.suffixes),
            ignore_patterns: non_empty(&self.ignore),
            respect_gitignore: self.gitignore.then_some(true),
            sort_entries: self.unsorted.then_some(false),
            stats_only: self.stats.then_some(true),
            thread_count: self.threads,
            shutdown_timeout: self.shutdown_timeout,
            encoding_mode: self.encoding,
            log_level: self.log_level.clone(),
            ..CliOverrides::new(self.search_string.clone(), self.folder_path.clone())
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (config, load_warning) = load_config(cli)?;
    init_logging(&config.log_level);
    if let Some(message) = load_warning {
        warn!("Ignoring configuration file: {}", message);
    }

    let output = search(&config)?;
    print_failures(&output);
    print_search_results(&output, &config);
    Ok(())
}

/// Builds the effective configuration.
///
/// An explicit `--config` file must load. The implicit global and local files
/// are optional; when they fail to parse the search runs on CLI values and
/// defaults, and the returned message is logged once logging is set up.
fn load_config(cli: &Cli) -> Result<(SearchConfig, Option<String>)> {
    let overrides = cli.overrides();
    match &cli.config {
        Some(path) => {
            let file_config = SearchConfig::load_from(Some(path.as_path()))
                .map_err(|e| SearchError::config_error(format!("{}: {}", path.display(), e)))?;
            Ok((file_config.merge_with_cli(overrides), None))
        }
        None => match SearchConfig::load() {
            Ok(file_config) => Ok((file_config.merge_with_cli(overrides), None)),
            Err(e) => Ok((
                SearchConfig::default().merge_with_cli(overrides),
                Some(e.to_string()),
            )),
        },
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_failures(output: &SearchOutput) {
    for failure in &output.failures {
        // Every message already names the file
        eprintln!("Error reading file: {}", failure.message);
    }
}

fn print_search_results(output: &SearchOutput, config: &SearchConfig) {
    println!("Number of threads used: {}", output.thread_count);

    if config.stats_only {
        println!(
            "Found {} matching files out of {} searched ({} failed)",
            output.files_with_matches(),
            output.files_searched,
            output.failures.len()
        );
    } else {
        println!("Files containing the string \"{}\":", config.pattern);
        for path in &output.matches {
            println!("{}", path.display());
        }
    }

    println!("Execution time: {}ms", output.elapsed_millis());
}
