use crate::extractor::planner::{Plan, TargetKind};
use anyhow::Context;
use regex::Regex;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Extracted(Vec<String>),
    NoContent,
    Failed(String),
}

impl fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionOutcome::Extracted(items) => write!(f, "Extracted: {}", items.join(", ")),
            ExtractionOutcome::NoContent => write!(f, "No extractable content found"),
            ExtractionOutcome::Failed(reason) => write!(f, "Error extracting: {}", reason),
        }
    }
}

fn progress_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"Progress:\s*(\d{1,3})\s*%").ok())
        .as_ref()
}

/// Extract the percentage from a `Progress: N%` line.
pub fn parse_progress(line: &str) -> Option<u8> {
    let captures = progress_pattern()?.captures(line)?;
    let value: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

/// Arguments for a single mkvextract call covering every target of the plan.
pub fn build_arguments(file_path: &Path, plan: &Plan) -> Vec<OsString> {
    let mut args = vec![file_path.as_os_str().to_os_string()];

    for target in &plan.targets {
        match (target.kind, target.source_id) {
            (TargetKind::Chapters, _) => {
                args.push("chapters".into());
                args.push(target.destination.as_os_str().to_os_string());
            }
            (TargetKind::SubtitleTrack, Some(id)) => {
                args.push("tracks".into());
                args.push(id_spec(id, &target.destination));
            }
            (TargetKind::FontAttachment, Some(id)) => {
                args.push("attachments".into());
                args.push(id_spec(id, &target.destination));
            }
            (kind, None) => {
                tracing::warn!("Skipping {:?} target without a source id", kind);
            }
        }
    }

    args
}

fn id_spec(id: u32, destination: &Path) -> OsString {
    let mut spec = OsString::from(format!("{}:", id));
    spec.push(destination.as_os_str());
    spec
}

pub struct Extractor {
    mkvextract_path: PathBuf,
}

impl Extractor {
    pub fn new<P: Into<PathBuf>>(mkvextract_path: P) -> Self {
        Self {
            mkvextract_path: mkvextract_path.into(),
        }
    }

    /// Run mkvextract once for the whole plan.
    ///
    /// `on_progress` receives every percentage printed by the tool while it
    /// runs, and 100 on success. Every failure is folded into
    /// [`ExtractionOutcome::Failed`].
    pub fn execute<F>(&self, file_path: &Path, plan: &Plan, mut on_progress: F) -> ExtractionOutcome
    where
        F: FnMut(u8),
    {
        if plan.is_empty() {
            return ExtractionOutcome::NoContent;
        }

        match self.run_extraction(file_path, plan, &mut on_progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Exception during extraction of {}: {:#}", file_path.display(), e);
                ExtractionOutcome::Failed(format!("{:#}", e))
            }
        }
    }

    fn run_extraction(
        &self,
        file_path: &Path,
        plan: &Plan,
        on_progress: &mut dyn FnMut(u8),
    ) -> anyhow::Result<ExtractionOutcome> {
        create_destination_dirs(plan)?;

        let mut child = Command::new(&self.mkvextract_path)
            .args(build_arguments(file_path, plan))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start {}", self.mkvextract_path.display()))?;

        let mut stderr = child.stderr.take().context("mkvextract stderr was not captured")?;
        let stderr_reader = thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        });

        let mut last_reported = None;
        let streamed = stream_progress(&mut child, |percent| {
            last_reported = Some(percent);
            on_progress(percent);
        });

        if let Err(e) = streamed {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let status = child.wait().context("failed to wait for mkvextract")?;
        let stderr_text = stderr_reader.join().unwrap_or_default();

        if status.success() {
            if last_reported != Some(100) {
                on_progress(100);
            }
            return Ok(ExtractionOutcome::Extracted(plan.labels()));
        }

        let reason = match stderr_text.trim() {
            "" => match status.code() {
                Some(code) => format!("mkvextract exited with status {}", code),
                None => "mkvextract was terminated by a signal".to_string(),
            },
            text => text.to_string(),
        };

        tracing::error!("Error extracting file {}: {}", file_path.display(), reason);
        Ok(ExtractionOutcome::Failed(reason))
    }
}

fn create_destination_dirs(plan: &Plan) -> anyhow::Result<()> {
    for target in &plan.targets {
        if let Some(parent) = target.destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Read stdout until the tool closes it, splitting on `\n` and `\r` so
/// carriage-return progress updates arrive as they are printed.
fn stream_progress<F>(child: &mut Child, mut report: F) -> anyhow::Result<()>
where
    F: FnMut(u8),
{
    let stdout = child.stdout.take().context("mkvextract stdout was not captured")?;
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();

    let mut handle_line = |line: &[u8]| {
        let text = String::from_utf8_lossy(line);
        match parse_progress(&text) {
            Some(percent) => report(percent),
            None if !text.trim().is_empty() => tracing::trace!("mkvextract: {}", text.trim()),
            None => {}
        }
    };

    loop {
        let available = reader.fill_buf().context("failed to read mkvextract output")?;
        if available.is_empty() {
            break;
        }

        let consumed = available.len();
        for &byte in available {
            if byte == b'\n' || byte == b'\r' {
                handle_line(&line);
                line.clear();
            } else {
                line.push(byte);
            }
        }
        reader.consume(consumed);
    }

    if !line.is_empty() {
        handle_line(&line);
    }

    Ok(())
}
