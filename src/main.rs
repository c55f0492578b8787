use clap::Parser;
use mkvharvest::{
    exit_code_for, exit_code_for_outcomes, logging, output_mode_for, Cli, HarvestError,
    MkvHarvest, OutputFormatter, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let harvest = match MkvHarvest::from_cli(&cli) {
        Ok(harvest) => harvest,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    // Held until the end of `run` so buffered log lines reach the file
    let _log_guard = match logging::init(
        harvest.config().paths.log_file.as_deref(),
        cli.verbosity_level(),
    ) {
        Ok(guard) => guard,
        Err(e) => {
            harvest
                .output_formatter()
                .warning(&format!("Diagnostic log disabled: {}", e.user_message()));
            None
        }
    };

    if cli.dry_run {
        return handle_dry_run(&harvest).await;
    }

    match harvest.run().await {
        Ok(outcomes) => exit_code_for_outcomes(&outcomes),
        Err(e) => {
            harvest.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "mkvharvest.toml".to_string());

    match MkvHarvest::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  mkvharvest --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

async fn handle_dry_run(harvest: &MkvHarvest) -> i32 {
    let formatter = harvest.output_formatter();
    let config = harvest.config();

    formatter.info("DRY RUN MODE - No files will be extracted");
    formatter.debug(&format!("Input directory: {}", config.paths.input_dir.display()));
    formatter.debug(&format!("Output directory: {}", config.paths.output_dir.display()));
    formatter.debug(&format!("Probe: {}", config.mkvmerge_path().display()));
    formatter.debug(&format!("Extensions: {}", config.settings.extensions.join(", ")));

    match harvest.plan_only().await {
        Ok(entries) => {
            formatter.print_dry_run(&entries);
            formatter.info("Run without --dry-run to perform actual extraction");
            if entries.iter().any(|(_, plan)| plan.is_err()) {
                2
            } else {
                0
            }
        }
        Err(e) => {
            harvest.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn print_startup_error(cli: &Cli, error: &HarvestError) {
    let formatter = OutputFormatter::new(output_mode_for(&cli.output_format), 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::try_parse_from([
            "mkvharvest",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .unwrap();

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("max_workers"));
    }

    #[tokio::test]
    async fn test_dry_run_with_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = mkvharvest::Config::default();
        config.paths.input_dir = temp_dir.path().join("missing");

        let harvest = MkvHarvest::new(config, mkvharvest::OutputMode::Plain, 0, true);
        assert_eq!(handle_dry_run(&harvest).await, 4);
    }
}
