pub mod output;
pub mod progress;

pub use output::{BatchReport, OutputFormatter, OutputMode};
pub use progress::TerminalProgress;
