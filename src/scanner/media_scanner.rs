use crate::config::SettingsConfig;
use crate::error::{HarvestError, Result};
use crate::scanner::file_filter::FileFilter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A container file discovered under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub filename: String,
    pub stem: String,
    /// Stem used for chapter and subtitle file names. Equal to `stem` unless
    /// another file in the same directory shares it.
    pub output_stem: String,
}

impl MediaFile {
    pub fn new(source_path: PathBuf, relative_path: PathBuf) -> Self {
        let filename = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            source_path,
            relative_path,
            filename,
            output_stem: stem.clone(),
            stem,
        }
    }

    /// Source directory of the file; files sharing it form one group.
    pub fn group(&self) -> &Path {
        self.source_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Directory relative to the input root, mirrored under the output root.
    pub fn relative_dir(&self) -> &Path {
        self.relative_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn display_path(&self) -> String {
        self.relative_path.display().to_string()
    }

    pub fn has_renamed_outputs(&self) -> bool {
        self.output_stem != self.stem
    }
}

pub struct MediaScanner {
    filter: FileFilter,
    max_depth: usize,
}

impl MediaScanner {
    pub fn new(settings: &SettingsConfig) -> Self {
        Self {
            filter: FileFilter::new(settings),
            max_depth: settings.max_depth,
        }
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Recursively list container files, sorted by relative path.
    ///
    /// An empty result is not an error; unreadable entries are logged and skipped.
    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<MediaFile>> {
        let root_path = root.as_ref();

        if !root_path.is_dir() {
            return Err(HarvestError::InvalidInputDirectory {
                path: root_path.display().to_string(),
            });
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(root_path)
            .max_depth(self.max_depth)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| self.should_traverse(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry during scan: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.filter.is_container_file(entry.path()) {
                continue;
            }

            match self.process_file(&entry, root_path) {
                Ok(media_file) => files.push(media_file),
                Err(err) => {
                    tracing::warn!("Error processing {}: {}", entry.path().display(), err);
                }
            }
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        assign_output_stems(&mut files);

        Ok(files)
    }

    fn should_traverse(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        self.filter.should_traverse_directory(entry.path())
    }

    fn process_file(&self, entry: &DirEntry, root_path: &Path) -> Result<MediaFile> {
        let path = entry.path();

        let relative_path = path
            .strip_prefix(root_path)
            .map_err(|_| HarvestError::Config {
                message: format!(
                    "Cannot calculate relative path for {} from root {}",
                    path.display(),
                    root_path.display()
                ),
            })?
            .to_path_buf();

        Ok(MediaFile::new(path.to_path_buf(), relative_path))
    }
}

/// Give files that share a directory and a stem (ignoring case) distinct
/// output stems, so their chapter and subtitle files cannot overwrite each
/// other. The first file in scan order keeps its stem. Later ones get their
/// extension appended, then a counter if that name is taken as well.
fn assign_output_stems(files: &mut [MediaFile]) {
    let plain: HashSet<(PathBuf, String)> = files
        .iter()
        .map(|f| (f.relative_dir().to_path_buf(), f.stem.to_lowercase()))
        .collect();
    let mut assigned = HashSet::new();

    for file in files.iter_mut() {
        let dir = file.relative_dir().to_path_buf();
        if assigned.insert((dir.clone(), file.stem.to_lowercase())) {
            continue;
        }

        let extension = file
            .source_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let base = format!("{}_{}", file.stem, extension);

        let mut candidate = base.clone();
        let mut counter = 2;
        loop {
            let key = (dir.clone(), candidate.to_lowercase());
            if !plain.contains(&key) && assigned.insert(key) {
                break;
            }
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }

        tracing::warn!(
            "{} shares its name with another file; writing its outputs as {}",
            file.display_path(),
            candidate
        );
        file.output_stem = candidate;
    }
}
