use crate::config::SettingsConfig;
use std::path::{Path, PathBuf};

pub struct FileFilter {
    container_extensions: Vec<String>,
    exclude_dirs: Vec<PathBuf>,
}

impl FileFilter {
    pub fn new(settings: &SettingsConfig) -> Self {
        let container_extensions = settings
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Self {
            container_extensions,
            exclude_dirs: Vec::new(),
        }
    }

    /// Skip a directory subtree, e.g. an output root nested inside the input root.
    pub fn with_excluded_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }

    pub fn is_container_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.container_extensions.contains(&ext_lower)
            })
            .unwrap_or(false)
    }

    pub fn should_traverse_directory(&self, path: &Path) -> bool {
        !self.exclude_dirs.iter().any(|excluded| path == excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(extensions: &[&str]) -> SettingsConfig {
        SettingsConfig {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            ..SettingsConfig::default()
        }
    }

    #[test]
    fn test_container_detection_is_case_insensitive() {
        let filter = FileFilter::new(&settings_with(&["mkv"]));

        assert!(filter.is_container_file(Path::new("show/ep01.mkv")));
        assert!(filter.is_container_file(Path::new("show/EP02.MKV")));
        assert!(!filter.is_container_file(Path::new("show/ep01.mp4")));
        assert!(!filter.is_container_file(Path::new("show/mkv")));
    }

    #[test]
    fn test_extension_normalisation() {
        let filter = FileFilter::new(&settings_with(&[".MKV", " mka ", ""]));
        assert_eq!(filter.container_extensions, vec!["mkv".to_string(), "mka".to_string()]);
        assert!(filter.is_container_file(Path::new("audio.mka")));
        assert!(filter.is_container_file(Path::new("ep01.Mkv")));
    }

    #[test]
    fn test_excluded_directories() {
        let filter = FileFilter::new(&SettingsConfig::default())
            .with_excluded_dir("/media/anime/output");

        assert!(!filter.should_traverse_directory(Path::new("/media/anime/output")));
        assert!(filter.should_traverse_directory(Path::new("/media/anime/season1")));
    }
}
