use crate::batch::{FileId, LogLevel, ProgressSink};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Terminal rendering of a batch: one overall bar plus a bar per file in flight.
pub struct TerminalProgress {
    multi_progress: MultiProgress,
    overall: ProgressBar,
    files: Mutex<HashMap<FileId, ProgressBar>>,
    enabled: bool,
    verbose: u8,
    quiet: bool,
}

impl TerminalProgress {
    pub fn new(enabled: bool, verbose: u8, quiet: bool) -> Self {
        let multi_progress = if enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let overall = multi_progress.add(ProgressBar::new(0));
        overall.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} files {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        overall.set_message("Scanning...");
        if enabled {
            overall.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            multi_progress,
            overall,
            files: Mutex::new(HashMap::new()),
            enabled,
            verbose,
            quiet,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn create_file_bar(&self, name: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(100));
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.blue} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn should_show(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Error => true,
            LogLevel::Warning => !self.quiet,
            LogLevel::Info => !self.quiet && self.verbose > 0,
        }
    }

    fn print_line(&self, line: String) {
        if self.enabled {
            if self.multi_progress.println(&line).is_err() {
                eprintln!("{}", line);
            }
        } else {
            eprintln!("{}", line);
        }
    }

    /// Remove every bar from the terminal.
    pub fn clear(&self) {
        for (_, pb) in self.files.lock().unwrap_or_else(|e| e.into_inner()).drain() {
            pb.finish_and_clear();
        }
        self.overall.finish_and_clear();
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn log(&self, level: LogLevel, message: &str) {
        if !self.should_show(level) {
            return;
        }

        let line = match level {
            LogLevel::Error => format!("{} {}", style("✗").red().bold(), style(message).red()),
            LogLevel::Warning => format!("{} {}", style("!").yellow().bold(), style(message).yellow()),
            LogLevel::Info => format!("{} {}", style("i").cyan(), message),
        };
        self.print_line(line);
    }

    fn group_entered(&self, dir: &Path) {
        self.log(LogLevel::Info, &format!("Processing folder: {}", dir.display()));
    }

    fn file_started(&self, id: FileId, name: &str) {
        let pb = self.create_file_bar(name);
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, pb);
    }

    fn file_progress(&self, id: FileId, percent: u8) {
        if let Some(pb) = self.files.lock().unwrap_or_else(|e| e.into_inner()).get(&id) {
            pb.set_position(u64::from(percent.min(100)));
        }
    }

    fn file_finished(&self, id: FileId) {
        let pb = self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);

        if let Some(pb) = pb {
            pb.finish_and_clear();
            self.multi_progress.remove(&pb);
        }
    }

    fn overall(&self, completed: usize, total: usize) {
        self.overall.set_length(total as u64);
        self.overall.set_position(completed as u64);

        if completed >= total {
            self.overall
                .finish_with_message(format!("Processed {} files", total));
        } else {
            self.overall.set_message("Processing files...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_bars_are_hidden() {
        let progress = TerminalProgress::new(false, 0, false);
        assert!(!progress.is_enabled());

        progress.file_started(0, "ep01.mkv");
        let files = progress.files.lock().unwrap();
        assert!(files.get(&0).unwrap().is_hidden());
    }

    #[test]
    fn test_file_bar_lifecycle() {
        let progress = TerminalProgress::new(false, 0, true);

        progress.overall(0, 2);
        progress.file_started(3, "ep01.mkv");
        progress.file_progress(3, 55);
        assert_eq!(progress.files.lock().unwrap().get(&3).unwrap().position(), 55);

        progress.file_progress(3, 250);
        assert_eq!(progress.files.lock().unwrap().get(&3).unwrap().position(), 100);

        progress.file_finished(3);
        assert!(progress.files.lock().unwrap().is_empty());

        // Unknown ids are ignored
        progress.file_progress(9, 10);
        progress.file_finished(9);
    }

    #[test]
    fn test_overall_counters() {
        let progress = TerminalProgress::new(false, 0, true);

        progress.overall(1, 4);
        assert_eq!(progress.overall.length(), Some(4));
        assert_eq!(progress.overall.position(), 1);
        assert!(!progress.overall.is_finished());

        progress.overall(4, 4);
        assert!(progress.overall.is_finished());
    }

    #[test]
    fn test_log_levels() {
        let progress = TerminalProgress::new(false, 0, false);
        assert!(progress.should_show(LogLevel::Error));
        assert!(progress.should_show(LogLevel::Warning));
        assert!(!progress.should_show(LogLevel::Info));

        let verbose = TerminalProgress::new(false, 1, false);
        assert!(verbose.should_show(LogLevel::Info));

        let quiet = TerminalProgress::new(false, 2, true);
        assert!(quiet.should_show(LogLevel::Error));
        assert!(!quiet.should_show(LogLevel::Warning));
        assert!(!quiet.should_show(LogLevel::Info));
    }
}
