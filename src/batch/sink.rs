use std::path::Path;

/// Identifier of a file within one batch run, its index in discovery order.
pub type FileId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Receives operator-facing events from a batch run.
///
/// Calls may arrive concurrently from several workers. The batch result never
/// depends on what a sink does with them.
pub trait ProgressSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    /// First file of a source directory is about to be processed.
    fn group_entered(&self, dir: &Path);

    fn file_started(&self, id: FileId, name: &str);

    fn file_progress(&self, id: FileId, percent: u8);

    fn file_finished(&self, id: FileId);

    fn overall(&self, completed: usize, total: usize);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn log(&self, _level: LogLevel, _message: &str) {}
    fn group_entered(&self, _dir: &Path) {}
    fn file_started(&self, _id: FileId, _name: &str) {}
    fn file_progress(&self, _id: FileId, _percent: u8) {}
    fn file_finished(&self, _id: FileId) {}
    fn overall(&self, _completed: usize, _total: usize) {}
}
