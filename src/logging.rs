use crate::error::{HarvestError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "mkvharvest=warn",
        1 => "mkvharvest=info",
        2 => "mkvharvest=debug",
        _ => "mkvharvest=trace",
    }
}

/// Install the global subscriber for the crate's `tracing` events.
///
/// Operator-facing messages go through the progress sink; this log is for
/// inspecting probe and extraction failures after a batch.
///
/// With a log file, events are appended to it through a background writer;
/// keep the returned guard alive until exit so buffered lines are flushed.
/// Without one, events only reach stderr when `RUST_LOG` asks for them.
pub fn init(log_file: Option<&Path>, verbose: u8) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let Some(path) = log_file else {
        if std::env::var_os("RUST_LOG").is_some() {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(filter)
                .try_init();
        }
        return Ok(None);
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HarvestError::Config {
            message: format!("Cannot open log file {}: {}", path.display(), e),
        })?;

    let (writer, guard) = tracing_appender::non_blocking(file);

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .try_init();

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_follows_verbosity() {
        assert_eq!(default_filter(0), "mkvharvest=warn");
        assert_eq!(default_filter(1), "mkvharvest=info");
        assert_eq!(default_filter(2), "mkvharvest=debug");
        assert_eq!(default_filter(7), "mkvharvest=trace");
    }

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as a log file
        let result = init(Some(temp_dir.path()), 0);
        assert!(matches!(result, Err(HarvestError::Config { .. })));
    }
}
