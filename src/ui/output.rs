use crate::batch::{BatchSummary, DryRunEntry, FileOutcome, FileStatus};
use crate::config::Config;
use crate::error::{HarvestError, Result, UserFriendlyError};
use chrono::{DateTime, Utc};
use console::{style, Emoji, Term};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

/// Machine-readable record of one batch run, written with `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub parallel: bool,
    pub max_workers: usize,
    pub duration_ms: u128,
    pub summary: BatchSummary,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new(config: &Config, outcomes: &[FileOutcome], elapsed: Duration) -> Self {
        Self {
            generated_at: Utc::now(),
            input_dir: config.paths.input_dir.clone(),
            output_dir: config.paths.output_dir.clone(),
            parallel: config.settings.use_parallel,
            max_workers: config.settings.max_workers,
            duration_ms: elapsed.as_millis(),
            summary: BatchSummary::from_outcomes(outcomes),
            files: outcomes.to_vec(),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).map_err(|e| HarvestError::Runtime {
            message: format!("Failed to serialize report: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Progress bars only make sense for an interactive human run.
    pub fn wants_progress_bars(&self) -> bool {
        self.mode == OutputMode::Human && !self.quiet && Term::stderr().is_term()
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &HarvestError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Per-file results followed by the batch summary.
    ///
    /// Every file gets exactly one row, in quiet mode too.
    pub fn print_results(&self, outcomes: &[FileOutcome], elapsed: Duration) {
        let summary = BatchSummary::from_outcomes(outcomes);

        match self.mode {
            OutputMode::Human => self.print_human_results(outcomes, &summary, elapsed),
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "results",
                    "files": outcomes,
                    "summary": summary,
                    "duration_ms": elapsed.as_millis(),
                    "timestamp": Utc::now().to_rfc3339()
                }));
            }
            OutputMode::Plain => {
                for outcome in outcomes {
                    println!("{}\t{}\t{}", outcome.status.kind(), outcome.path.display(), outcome.status);
                }
                println!(
                    "TOTAL: {} extracted: {} no_content: {} failed: {} duration: {}",
                    summary.total,
                    summary.extracted,
                    summary.no_content,
                    summary.failed,
                    format_duration(elapsed)
                );
            }
        }
    }

    pub fn print_dry_run(&self, entries: &[DryRunEntry]) {
        match self.mode {
            OutputMode::Human | OutputMode::Plain => {
                self.print_header("Dry run");
                for (file, plan) in entries {
                    println!("{}", file.display_path());
                    match plan {
                        Ok(plan) if plan.is_empty() => println!("  (nothing to extract)"),
                        Ok(plan) => {
                            for target in &plan.targets {
                                println!("  {} -> {}", target.label, target.destination.display());
                            }
                            for warning in &plan.warnings {
                                println!("  warning: {}", warning);
                            }
                        }
                        Err(e) => println!("  Failed to get MKV info: {}", e),
                    }
                }
            }
            OutputMode::Json => {
                let files: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|(file, plan)| match plan {
                        Ok(plan) => serde_json::json!({
                            "path": file.source_path,
                            "targets": plan.targets,
                            "warnings": plan.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
                        }),
                        Err(e) => serde_json::json!({
                            "path": file.source_path,
                            "error": e.to_string(),
                        }),
                    })
                    .collect();

                self.print_json_object(&serde_json::json!({
                    "type": "dry_run",
                    "files": files,
                }));
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_results(&self, outcomes: &[FileOutcome], summary: &BatchSummary, elapsed: Duration) {
        self.print_header("Results");

        let name_width = outcomes
            .iter()
            .map(|o| o.file_name.chars().count())
            .max()
            .unwrap_or(0)
            .min(48);

        for outcome in outcomes {
            let name = format!("{:<width$}", outcome.file_name, width = name_width);
            let detail = outcome.status.to_string();

            if self.use_colors {
                let marker = status_marker(&outcome.status);
                let detail = match outcome.status {
                    FileStatus::Extracted(_) => style(detail).green(),
                    FileStatus::NoContent => style(detail).dim(),
                    _ => style(detail).red(),
                };
                println!("{} {}  {}", marker, style(name).bold(), detail);
            } else {
                println!("{}  {}", name, detail);
            }
        }

        println!();
        self.print_separator();

        let count = |n: usize| {
            if self.use_colors {
                style(n).cyan().bold().to_string()
            } else {
                n.to_string()
            }
        };

        println!("  Files processed: {}", count(summary.total));
        println!("  Extracted:       {}", count(summary.extracted));
        println!("  No content:      {}", count(summary.no_content));
        if summary.has_failures() {
            let failed = if self.use_colors {
                style(summary.failed).red().bold().to_string()
            } else {
                summary.failed.to_string()
            };
            println!("  Failed:          {}", failed);
        }
        println!("  Time taken:      {}", format_duration(elapsed));

        self.print_separator();
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn status_marker(status: &FileStatus) -> console::StyledObject<&'static str> {
    match status {
        FileStatus::Extracted(_) => style("✓").green().bold(),
        FileStatus::NoContent => style("-").dim(),
        _ => style("✗").red().bold(),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
