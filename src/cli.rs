use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mkvharvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract chapters, subtitles and fonts from Matroska files")]
#[command(
    long_about = "mkvharvest walks a directory tree of Matroska files, inspects each one with \
                  mkvmerge and extracts its chapters, subtitle tracks and font attachments \
                  with a single mkvextract call per file."
)]
#[command(before_help = "🎞  mkvharvest - Matroska Stream Harvester")]
#[command(after_help = "EXAMPLES:\n  \
    mkvharvest --input-dir ~/Anime --output-dir ~/extracted\n  \
    mkvharvest --input-dir ~/Anime --parallel --workers 4\n  \
    mkvharvest --config mkvharvest.toml --dry-run\n  \
    mkvharvest --input-dir ~/Anime --output-format json --report report.json")]
pub struct Cli {
    /// Directory searched recursively for container files
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Root directory for extracted streams
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Path to the mkvextract executable
    #[arg(long, env = "MKVEXTRACT_PATH")]
    pub mkvextract_path: Option<PathBuf>,

    /// Path to the mkvmerge executable (defaults to the one next to mkvextract)
    #[arg(long, env = "MKVMERGE_PATH")]
    pub mkvmerge_path: Option<PathBuf>,

    /// Process files concurrently
    #[arg(short, long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Process files one at a time, overriding the config file
    #[arg(long)]
    pub sequential: bool,

    /// Maximum number of concurrent extractions in parallel mode
    #[arg(short, long, value_parser = parse_worker_count)]
    pub workers: Option<usize>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Write a JSON report of the batch to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Diagnostic log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only failures are reported)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be extracted without running mkvextract)
    #[arg(long, help = "Show what would be extracted without actually doing it")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let use_parallel = if self.parallel {
            Some(true)
        } else if self.sequential {
            Some(false)
        } else {
            None
        };

        CliOverrides::new()
            .with_input_dir(self.input_dir.clone())
            .with_output_dir(self.output_dir.clone())
            .with_mkvextract_path(self.mkvextract_path.clone())
            .with_mkvmerge_path(self.mkvmerge_path.clone())
            .with_log_file(self.log_file.clone())
            .with_report_file(self.report.clone())
            .with_parallel(use_parallel)
            .with_max_workers(self.workers)
    }

    pub fn should_use_colors(&self) -> bool {
        !self.quiet && console::Term::stdout().features().colors_supported()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_worker_count(s: &str) -> std::result::Result<usize, String> {
    let count: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid worker count: {}", s))?;

    if count == 0 {
        return Err("Worker count must be at least 1".to_string());
    }

    Ok(count)
}
