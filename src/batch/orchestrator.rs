use crate::batch::outcome::{FileOutcome, FileStatus};
use crate::batch::progress::BatchProgress;
use crate::batch::sink::{FileId, LogLevel, ProgressSink};
use crate::config::Config;
use crate::error::{HarvestError, ProbeError, Result};
use crate::extractor::{planner, Extractor, Plan, TargetKind};
use crate::probe::{MetadataProbe, MkvmergeProbe};
use crate::scanner::{FileFilter, MediaFile, MediaScanner};
use std::any::Any;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

/// Probe result and plan for one file, produced without running the extractor.
pub type DryRunEntry = (MediaFile, std::result::Result<Plan, ProbeError>);

/// Drives a whole batch: discovery, per-file pipeline, progress and outcomes.
pub struct Orchestrator {
    config: Config,
    probe: Arc<dyn MetadataProbe>,
    sink: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    /// Orchestrator probing with `mkvmerge` as resolved by the config.
    pub fn new(config: Config, sink: Arc<dyn ProgressSink>) -> Self {
        let probe = Arc::new(MkvmergeProbe::new(config.mkvmerge_path()));
        Self::with_probe(config, probe, sink)
    }

    pub fn with_probe(
        config: Config,
        probe: Arc<dyn MetadataProbe>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self { config, probe, sink }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every container file under the input root.
    ///
    /// Setup problems abort before any file is touched. After that every
    /// discovered file yields exactly one outcome, whatever happens to it.
    pub async fn run(&self) -> Result<Vec<FileOutcome>> {
        self.validate_setup()?;
        self.prepare_output_root()?;

        let files = self.discover()?;
        let total = files.len();
        tracing::info!(
            "Found {} files under {}",
            total,
            self.config.paths.input_dir.display()
        );

        if files.is_empty() {
            self.sink.log(LogLevel::Info, "No matching files found");
            self.sink.overall(0, 0);
            return Ok(Vec::new());
        }

        let context = Arc::new(WorkerContext {
            probe: Arc::clone(&self.probe),
            extractor: Extractor::new(&self.config.paths.mkvextract_path),
            sink: Arc::clone(&self.sink),
            progress: BatchProgress::new(total),
            groups: Mutex::new(HashSet::new()),
            claimed: Mutex::new(HashSet::new()),
            output_root: self.config.paths.output_dir.clone(),
            info_file_name: self.config.settings.info_file_name.clone(),
        });

        self.sink.overall(0, total);

        if self.config.settings.use_parallel {
            let workers = self.config.settings.max_workers.max(1);
            tracing::info!("Processing {} files with {} workers", total, workers);
            run_parallel(Arc::clone(&context), files, workers).await;
        } else {
            tracing::info!("Processing {} files sequentially", total);
            for (id, file) in files.into_iter().enumerate() {
                run_one(Arc::clone(&context), id, file).await;
            }
        }

        let snapshot = context.progress.snapshot();
        if !snapshot.in_flight.is_empty() {
            tracing::warn!(
                "{} files never reported completion: {:?}",
                snapshot.in_flight.len(),
                snapshot.in_flight
            );
        }
        tracing::info!(
            "Batch finished: {}/{} files",
            snapshot.files_completed,
            snapshot.files_total
        );

        Ok(context.progress.outcomes())
    }

    /// Probe and plan every file without extracting anything.
    pub async fn dry_run(&self) -> Result<Vec<DryRunEntry>> {
        let files = self.discover()?;
        let probe = Arc::clone(&self.probe);
        let output_root = self.config.paths.output_dir.clone();

        task::spawn_blocking(move || {
            files
                .into_iter()
                .map(|file| {
                    let file_root = output_root.join(file.relative_dir());
                    let plan = probe
                        .probe(&file.source_path)
                        .map(|description| planner::plan(&description, &file.output_stem, &file_root));
                    (file, plan)
                })
                .collect()
        })
        .await
        .map_err(|e| HarvestError::Runtime {
            message: e.to_string(),
        })
    }

    fn validate_setup(&self) -> Result<()> {
        self.config.validate()?;

        let extractor = &self.config.paths.mkvextract_path;
        if !extractor.exists() {
            tracing::error!("mkvextract not found at {}", extractor.display());
            return Err(HarvestError::ExtractorNotFound {
                path: extractor.display().to_string(),
            });
        }

        let input = &self.config.paths.input_dir;
        if !input.is_dir() {
            tracing::error!("Input directory does not exist: {}", input.display());
            return Err(HarvestError::InvalidInputDirectory {
                path: input.display().to_string(),
            });
        }

        Ok(())
    }

    fn prepare_output_root(&self) -> Result<()> {
        let output = &self.config.paths.output_dir;
        fs::create_dir_all(output).map_err(|e| HarvestError::OutputDirectory {
            path: output.display().to_string(),
            message: e.to_string(),
        })
    }

    fn discover(&self) -> Result<Vec<MediaFile>> {
        let settings = &self.config.settings;
        let input = &self.config.paths.input_dir;

        let mut filter = FileFilter::new(settings);
        if let Some(excluded) = nested_output_dir(input, &self.config.paths.output_dir) {
            tracing::debug!("Excluding output directory {} from scan", excluded.display());
            filter = filter.with_excluded_dir(excluded);
        }

        MediaScanner::new(settings)
            .with_filter(filter)
            .scan_directory(input)
    }
}

/// The output root expressed under the input root, when it lives inside it.
fn nested_output_dir(input: &Path, output: &Path) -> Option<PathBuf> {
    let input_canonical = fs::canonicalize(input).ok()?;
    let output_canonical = fs::canonicalize(output).ok()?;
    let relative = output_canonical.strip_prefix(&input_canonical).ok()?;

    if relative.as_os_str().is_empty() {
        return None;
    }

    Some(input.join(relative))
}

struct WorkerContext {
    probe: Arc<dyn MetadataProbe>,
    extractor: Extractor,
    sink: Arc<dyn ProgressSink>,
    progress: BatchProgress,
    groups: Mutex<HashSet<PathBuf>>,
    claimed: Mutex<HashSet<PathBuf>>,
    output_root: PathBuf,
    info_file_name: String,
}

impl WorkerContext {
    fn process(&self, id: FileId, file: &MediaFile) {
        self.sink.file_started(id, &file.filename);
        self.progress.start_file(id);

        let status = match panic::catch_unwind(AssertUnwindSafe(|| {
            self.enter_group(file);
            self.extract(id, file)
        })) {
            Ok(status) => status,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Worker panicked on {}: {}", file.display_path(), message);
                FileStatus::UnexpectedFailure(message)
            }
        };

        self.complete(id, file, status);
    }

    fn extract(&self, id: FileId, file: &MediaFile) -> FileStatus {
        let description = match self.probe.probe(&file.source_path) {
            Ok(description) => description,
            Err(e) => {
                tracing::error!("Failed to get MKV info for {}: {}", file.display_path(), e);
                return FileStatus::ProbeFailed(e.to_string());
            }
        };

        let file_root = self.output_root.join(file.relative_dir());
        let plan = planner::plan(&description, &file.output_stem, &file_root);

        if file.has_renamed_outputs() {
            self.sink.log(
                LogLevel::Warning,
                &format!(
                    "{}: another file has the same name, outputs are named {}",
                    file.filename, file.output_stem
                ),
            );
        }

        for warning in &plan.warnings {
            tracing::warn!("{}: {}", file.display_path(), warning);
            self.sink
                .log(LogLevel::Warning, &format!("{}: {}", file.filename, warning));
        }

        if let Some(taken) = self.claim_destinations(&plan) {
            tracing::error!(
                "{} would overwrite {} written by another file",
                file.display_path(),
                taken.display()
            );
            return FileStatus::ExtractionFailed(format!(
                "Output path already used by another file: {}",
                taken.display()
            ));
        }

        let outcome = self.extractor.execute(&file.source_path, &plan, |percent| {
            self.progress.update_file(id, percent);
            self.sink.file_progress(id, percent);
        });

        FileStatus::from(outcome)
    }

    fn complete(&self, id: FileId, file: &MediaFile, status: FileStatus) {
        let level = if status.is_failure() {
            LogLevel::Error
        } else {
            LogLevel::Info
        };
        self.sink.log(level, &format!("{}: {}", file.filename, status));
        self.sink.file_finished(id);

        let outcome = FileOutcome::new(file.filename.clone(), file.source_path.clone(), status);
        self.progress.finish_file(id, outcome, self.sink.as_ref());
    }

    /// Reserve the chapter and subtitle destinations of `plan` for one file.
    ///
    /// Returns the first destination another file already holds, reserving
    /// nothing in that case. Fonts keep their attachment names and are shared.
    fn claim_destinations(&self, plan: &Plan) -> Option<PathBuf> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        let owned: Vec<&PathBuf> = plan
            .targets
            .iter()
            .filter(|t| t.kind != TargetKind::FontAttachment)
            .map(|t| &t.destination)
            .collect();

        if let Some(taken) = owned.iter().find(|d| claimed.contains(**d)) {
            return Some((*taken).clone());
        }

        claimed.extend(owned.into_iter().cloned());
        None
    }

    /// On the first file of a source directory, copy its info file into the
    /// mirrored output directory.
    fn enter_group(&self, file: &MediaFile) {
        let group = file.group().to_path_buf();
        let first_visit = self
            .groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(group.clone());

        if !first_visit {
            return;
        }

        tracing::info!("Processing folder: {}", group.display());
        self.sink.group_entered(&group);

        let source = group.join(&self.info_file_name);
        if !source.is_file() {
            return;
        }

        let destination = self
            .output_root
            .join(file.relative_dir())
            .join(&self.info_file_name);

        match copy_preserving_mtime(&source, &destination) {
            Ok(()) => tracing::debug!("Copied {} to {}", source.display(), destination.display()),
            Err(e) => {
                let message = format!(
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    destination.display(),
                    e
                );
                tracing::warn!("{}", message);
                self.sink.log(LogLevel::Warning, &message);
            }
        }
    }
}

async fn run_one(context: Arc<WorkerContext>, id: FileId, file: MediaFile) {
    let worker = Arc::clone(&context);
    let worker_file = file.clone();

    let joined = task::spawn_blocking(move || worker.process(id, &worker_file)).await;

    // The worker records its own outcome; only a lost task needs one here
    if let Err(e) = joined {
        tracing::error!("Worker for {} did not finish: {}", file.display_path(), e);
        if !context.progress.is_recorded(id) {
            context.complete(id, &file, FileStatus::UnexpectedFailure(e.to_string()));
        }
    }
}

async fn run_parallel(context: Arc<WorkerContext>, files: Vec<MediaFile>, max_workers: usize) {
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let mut workers = JoinSet::new();

    for (id, file) in files.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let context = Arc::clone(&context);

        workers.spawn(async move {
            let permit = semaphore.acquire_owned().await.ok();
            run_one(context, id, file).await;
            drop(permit);
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Batch task failed: {}", e);
        }
    }
}

fn copy_preserving_mtime(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::copy(source, destination)?;

    let modified = fs::metadata(source)?.modified()?;
    filetime::set_file_mtime(destination, filetime::FileTime::from_system_time(modified))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
