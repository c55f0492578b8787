pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod probe;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, PathsConfig, SettingsConfig};
pub use error::{HarvestError, ProbeError, Result, UserFriendlyError};

// Core functionality re-exports
pub use batch::{
    BatchSummary, DryRunEntry, FileOutcome, FileStatus, LogLevel, NullSink, Orchestrator,
    ProgressSink,
};
pub use extractor::{ExtractionOutcome, ExtractionTarget, Extractor, Plan, PlanWarning, TargetKind};
pub use probe::{ContainerDescription, MetadataProbe, MkvmergeProbe};
pub use scanner::{FileFilter, MediaFile, MediaScanner};
pub use ui::{BatchReport, OutputFormatter, OutputMode, TerminalProgress};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Main library interface: one configured batch with its terminal output.
pub struct MkvHarvest {
    config: Config,
    output_formatter: OutputFormatter,
    verbose: u8,
    quiet: bool,
}

impl MkvHarvest {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            verbose,
            quiet,
        }
    }

    /// Create an instance from CLI arguments, loading and validating the config.
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Ok(Self::new(
            config,
            output_mode_for(&cli_args.output_format),
            cli_args.verbosity_level(),
            cli_args.quiet,
        ))
    }

    /// Run the batch, print the results table and write the optional report.
    pub async fn run(&self) -> Result<Vec<FileOutcome>> {
        let start_time = Instant::now();

        self.output_formatter.start_operation(&format!(
            "Harvesting {} into {}",
            self.config.paths.input_dir.display(),
            self.config.paths.output_dir.display()
        ));

        let progress = Arc::new(TerminalProgress::new(
            self.output_formatter.wants_progress_bars(),
            self.verbose,
            self.quiet,
        ));
        let orchestrator = Orchestrator::new(self.config.clone(), progress.clone());

        let result = orchestrator.run().await;
        progress.clear();
        let outcomes = result?;

        let elapsed = start_time.elapsed();
        self.output_formatter.print_results(&outcomes, elapsed);

        if let Some(ref report_path) = self.config.paths.report_file {
            let report = BatchReport::new(&self.config, &outcomes, elapsed);
            match report.save_to_file(report_path) {
                Ok(()) => self
                    .output_formatter
                    .success(&format!("Report written to {}", report_path.display())),
                Err(e) => {
                    tracing::warn!("Failed to write report {}: {}", report_path.display(), e);
                    self.output_formatter
                        .warning(&format!("Could not write report: {}", e.user_message()));
                }
            }
        }

        Ok(outcomes)
    }

    /// Probe and plan every file without running the extractor.
    pub async fn plan_only(&self) -> Result<Vec<DryRunEntry>> {
        let orchestrator = Orchestrator::new(self.config.clone(), Arc::new(NullSink));
        orchestrator.dry_run().await
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &HarvestError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn output_mode_for(format: &OutputFormat) -> OutputMode {
    match format {
        OutputFormat::Human => OutputMode::Human,
        OutputFormat::Json => OutputMode::Json,
        OutputFormat::Plain => OutputMode::Plain,
    }
}

/// Process exit code for a setup-level failure.
pub fn exit_code_for(error: &HarvestError) -> i32 {
    match error {
        HarvestError::ExtractorNotFound { .. } => 3,
        HarvestError::InvalidInputDirectory { .. } => 4,
        HarvestError::Config { .. } => 5,
        _ => 1,
    }
}

/// Process exit code for a finished batch: 2 when any file failed.
pub fn exit_code_for_outcomes(outcomes: &[FileOutcome]) -> i32 {
    if BatchSummary::from_outcomes(outcomes).has_failures() {
        2
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_instance_creation() {
        let harvest = MkvHarvest::new(Config::default(), OutputMode::Plain, 1, false);
        assert_eq!(harvest.config().settings.extensions, vec!["mkv".to_string()]);
        assert_eq!(harvest.output_formatter().mode(), OutputMode::Plain);
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        MkvHarvest::generate_sample_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[settings]"));

        let reloaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(reloaded.settings.info_file_name, "info.txt");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&HarvestError::ExtractorNotFound { path: "x".to_string() }),
            3
        );
        assert_eq!(
            exit_code_for(&HarvestError::InvalidInputDirectory { path: "x".to_string() }),
            4
        );
        assert_eq!(
            exit_code_for(&HarvestError::Config { message: "x".to_string() }),
            5
        );
        assert_eq!(
            exit_code_for(&HarvestError::Runtime { message: "x".to_string() }),
            1
        );

        let ok = vec![FileOutcome::new("a.mkv", "a.mkv", FileStatus::NoContent)];
        assert_eq!(exit_code_for_outcomes(&ok), 0);
        assert_eq!(exit_code_for_outcomes(&[]), 0);

        let failed = vec![FileOutcome::new("a.mkv", "a.mkv", FileStatus::ProbeFailed("x".to_string()))];
        assert_eq!(exit_code_for_outcomes(&failed), 2);
    }

    #[tokio::test]
    async fn test_run_reports_setup_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.input_dir = temp_dir.path().to_path_buf();
        config.paths.output_dir = temp_dir.path().join("out");
        config.paths.mkvextract_path = temp_dir.path().join("no-mkvextract");

        let harvest = MkvHarvest::new(config, OutputMode::Plain, 0, true);
        let result = harvest.run().await;

        assert!(matches!(result, Err(HarvestError::ExtractorNotFound { .. })));
    }
}
