use crate::extractor::ExtractionOutcome;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FileStatus {
    Extracted(Vec<String>),
    NoContent,
    ProbeFailed(String),
    ExtractionFailed(String),
    UnexpectedFailure(String),
}

impl FileStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileStatus::ProbeFailed(_)
                | FileStatus::ExtractionFailed(_)
                | FileStatus::UnexpectedFailure(_)
        )
    }

    /// Short label for result tables.
    pub fn kind(&self) -> &'static str {
        match self {
            FileStatus::Extracted(_) => "extracted",
            FileStatus::NoContent => "no content",
            FileStatus::ProbeFailed(_) => "probe failed",
            FileStatus::ExtractionFailed(_) => "extraction failed",
            FileStatus::UnexpectedFailure(_) => "unexpected failure",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Extracted(items) => write!(f, "Extracted: {}", items.join(", ")),
            FileStatus::NoContent => write!(f, "No extractable content found"),
            FileStatus::ProbeFailed(reason) => write!(f, "Failed to get MKV info: {}", reason),
            FileStatus::ExtractionFailed(reason) => write!(f, "Error extracting: {}", reason),
            FileStatus::UnexpectedFailure(reason) => write!(f, "Unexpected error: {}", reason),
        }
    }
}

impl From<ExtractionOutcome> for FileStatus {
    fn from(outcome: ExtractionOutcome) -> Self {
        match outcome {
            ExtractionOutcome::Extracted(items) => FileStatus::Extracted(items),
            ExtractionOutcome::NoContent => FileStatus::NoContent,
            ExtractionOutcome::Failed(reason) => FileStatus::ExtractionFailed(reason),
        }
    }
}

/// Final record for one discovered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file_name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn new(file_name: impl Into<String>, path: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            file_name: file_name.into(),
            path: path.into(),
            status,
        }
    }
}

/// Aggregate counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub extracted: usize,
    pub no_content: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome.status {
                FileStatus::Extracted(_) => summary.extracted += 1,
                FileStatus::NoContent => summary.no_content += 1,
                _ => summary.failed += 1,
            }
        }

        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
