pub mod orchestrator;
pub mod outcome;
pub mod progress;
pub mod sink;

pub use orchestrator::{DryRunEntry, Orchestrator};
pub use outcome::{BatchSummary, FileOutcome, FileStatus};
pub use progress::{BatchProgress, ProgressSnapshot};
pub use sink::{FileId, LogLevel, NullSink, ProgressSink};
