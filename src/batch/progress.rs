use crate::batch::outcome::FileOutcome;
use crate::batch::sink::{FileId, ProgressSink};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ProgressState {
    files_completed: usize,
    files_total: usize,
    in_flight: HashMap<FileId, u8>,
    recorded: HashSet<FileId>,
    outcomes: Vec<FileOutcome>,
}

/// Point-in-time copy of the batch counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub files_completed: usize,
    pub files_total: usize,
    pub in_flight: Vec<(FileId, u8)>,
}

/// Shared progress of one batch run.
///
/// Every mutation happens under a single lock, so readers never observe a
/// completed count that disagrees with the recorded outcomes.
#[derive(Debug, Default)]
pub struct BatchProgress {
    state: Mutex<ProgressState>,
}

impl BatchProgress {
    pub fn new(files_total: usize) -> Self {
        Self {
            state: Mutex::new(ProgressState {
                files_total,
                ..ProgressState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        // A worker that panicked while holding the lock left the counters intact
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start_file(&self, id: FileId) {
        self.lock().in_flight.insert(id, 0);
    }

    pub fn update_file(&self, id: FileId, percent: u8) {
        self.lock().in_flight.insert(id, percent.min(100));
    }

    /// Record a finished file and publish the overall counters to `sink`
    /// while still holding the lock.
    ///
    /// Returns the new completed count, or `None` when `id` already has an
    /// outcome, in which case nothing changes.
    pub fn finish_file(&self, id: FileId, outcome: FileOutcome, sink: &dyn ProgressSink) -> Option<usize> {
        let mut state = self.lock();
        state.in_flight.remove(&id);
        if !state.recorded.insert(id) {
            tracing::warn!("Ignoring second outcome for file {}", id);
            return None;
        }
        state.outcomes.push(outcome);
        state.files_completed += 1;
        sink.overall(state.files_completed, state.files_total);
        Some(state.files_completed)
    }

    pub fn is_recorded(&self, id: FileId) -> bool {
        self.lock().recorded.contains(&id)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.lock();
        let mut in_flight: Vec<(FileId, u8)> = state.in_flight.iter().map(|(k, v)| (*k, *v)).collect();
        in_flight.sort_unstable();

        ProgressSnapshot {
            files_completed: state.files_completed,
            files_total: state.files_total,
            in_flight,
        }
    }

    /// Outcomes in completion order.
    pub fn outcomes(&self) -> Vec<FileOutcome> {
        self.lock().outcomes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::outcome::FileStatus;
    use crate::batch::sink::NullSink;
    use std::sync::Arc;
    use std::thread;

    fn outcome(name: &str) -> FileOutcome {
        FileOutcome::new(name, name, FileStatus::NoContent)
    }

    #[test]
    fn test_in_flight_tracking() {
        let progress = BatchProgress::new(2);
        progress.start_file(0);
        progress.start_file(1);
        progress.update_file(1, 55);
        progress.update_file(0, 250);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.in_flight, vec![(0, 100), (1, 55)]);
        assert_eq!(snapshot.files_completed, 0);

        assert_eq!(progress.finish_file(0, outcome("a.mkv"), &NullSink), Some(1));
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.in_flight, vec![(1, 55)]);
        assert_eq!(snapshot.files_completed, 1);
        assert_eq!(snapshot.files_total, 2);
    }

    #[test]
    fn test_concurrent_completion_is_consistent() {
        let progress = Arc::new(BatchProgress::new(64));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let progress = Arc::clone(&progress);
                thread::spawn(move || {
                    for i in 0..8 {
                        let id = worker * 8 + i;
                        progress.start_file(id);
                        progress.update_file(id, 50);
                        progress.finish_file(id, outcome(&format!("{}.mkv", id)), &NullSink);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_completed, 64);
        assert!(snapshot.in_flight.is_empty());
        assert_eq!(progress.outcomes().len(), 64);
    }

    #[test]
    fn test_outcome_is_recorded_once_per_file() {
        let progress = BatchProgress::new(2);
        progress.start_file(0);

        assert!(!progress.is_recorded(0));
        assert_eq!(progress.finish_file(0, outcome("a.mkv"), &NullSink), Some(1));
        assert!(progress.is_recorded(0));
        assert_eq!(progress.finish_file(0, outcome("a.mkv"), &NullSink), None);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_completed, 1);
        assert_eq!(progress.outcomes().len(), 1);
    }
}
