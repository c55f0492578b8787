use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mkvextract_path: PathBuf,
    /// Defaults to the mkvmerge that sits next to `mkvextract_path`.
    pub mkvmerge_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub use_parallel: bool,
    pub max_workers: usize,
    pub extensions: Vec<String>,
    pub info_file_name: String,
    pub max_depth: usize,
}

#[cfg(windows)]
const DEFAULT_INPUT_DIR: &str = r"C:\Anime";
#[cfg(not(windows))]
const DEFAULT_INPUT_DIR: &str = ".";

#[cfg(windows)]
const DEFAULT_OUTPUT_DIR: &str = r"C:\output";
#[cfg(not(windows))]
const DEFAULT_OUTPUT_DIR: &str = "output";

#[cfg(windows)]
const DEFAULT_MKVEXTRACT_PATH: &str = r"C:\Program Files\MKVToolNix\mkvextract.exe";
#[cfg(not(windows))]
const DEFAULT_MKVEXTRACT_PATH: &str = "/usr/bin/mkvextract";

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            mkvextract_path: PathBuf::from(DEFAULT_MKVEXTRACT_PATH),
            mkvmerge_path: None,
            log_file: Some(PathBuf::from("mkvharvest.log")),
            report_file: None,
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            use_parallel: false,
            max_workers: num_cpus::get(),
            extensions: vec!["mkv".to_string()],
            info_file_name: "info.txt".to_string(),
            max_depth: 64,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HarvestError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| HarvestError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| HarvestError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["mkvharvest.toml", ".mkvharvest.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref input_dir) = cli_args.input_dir {
            self.paths.input_dir = input_dir.clone();
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.paths.output_dir = output_dir.clone();
        }

        if let Some(ref mkvextract) = cli_args.mkvextract_path {
            self.paths.mkvextract_path = mkvextract.clone();
        }

        if let Some(ref mkvmerge) = cli_args.mkvmerge_path {
            self.paths.mkvmerge_path = Some(mkvmerge.clone());
        }

        if let Some(ref log_file) = cli_args.log_file {
            self.paths.log_file = Some(log_file.clone());
        }

        if let Some(ref report_file) = cli_args.report_file {
            self.paths.report_file = Some(report_file.clone());
        }

        if let Some(parallel) = cli_args.use_parallel {
            self.settings.use_parallel = parallel;
        }

        if let Some(workers) = cli_args.max_workers {
            self.settings.max_workers = workers;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| HarvestError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| HarvestError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings.max_workers == 0 {
            return Err(HarvestError::Config {
                message: "max_workers must be greater than 0".to_string(),
            });
        }

        if self.settings.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(HarvestError::Config {
                message: "At least one container extension must be specified".to_string(),
            });
        }

        if self.settings.max_depth == 0 {
            return Err(HarvestError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.settings.info_file_name.contains(['/', '\\']) {
            return Err(HarvestError::Config {
                message: format!(
                    "info_file_name must be a plain file name: {}",
                    self.settings.info_file_name
                ),
            });
        }

        Ok(())
    }

    /// The probe executable, falling back to `mkvmerge` beside `mkvextract`.
    pub fn mkvmerge_path(&self) -> PathBuf {
        if let Some(ref path) = self.paths.mkvmerge_path {
            return path.clone();
        }

        let name = match self.paths.mkvextract_path.extension() {
            Some(ext) => format!("mkvmerge.{}", ext.to_string_lossy()),
            None => "mkvmerge".to_string(),
        };

        match self.paths.mkvextract_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
            _ => PathBuf::from(name),
        }
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub mkvextract_path: Option<PathBuf>,
    pub mkvmerge_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub use_parallel: Option<bool>,
    pub max_workers: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_dir(mut self, input_dir: Option<PathBuf>) -> Self {
        self.input_dir = input_dir;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_mkvextract_path(mut self, path: Option<PathBuf>) -> Self {
        self.mkvextract_path = path;
        self
    }

    pub fn with_mkvmerge_path(mut self, path: Option<PathBuf>) -> Self {
        self.mkvmerge_path = path;
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_report_file(mut self, path: Option<PathBuf>) -> Self {
        self.report_file = path;
        self
    }

    pub fn with_parallel(mut self, parallel: Option<bool>) -> Self {
        self.use_parallel = parallel;
        self
    }

    pub fn with_max_workers(mut self, workers: Option<usize>) -> Self {
        self.max_workers = workers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.settings.use_parallel);
        assert!(config.settings.max_workers >= 1);
        assert_eq!(config.settings.extensions, vec!["mkv"]);
        assert_eq!(config.settings.info_file_name, "info.txt");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.settings.max_workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.settings.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.settings.info_file_name = "../info.txt".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.settings.max_workers = 3;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.settings.max_workers, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[settings]\nuse_parallel = true").unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert!(config.settings.use_parallel);
        assert_eq!(config.settings.extensions, vec!["mkv"]);
        assert_eq!(config.paths.mkvextract_path, PathBuf::from(DEFAULT_MKVEXTRACT_PATH));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let result = Config::load_with_defaults(Some("/definitely/not/here.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_input_dir(Some(PathBuf::from("/media/anime")))
            .with_parallel(Some(true))
            .with_max_workers(Some(4));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.paths.input_dir, PathBuf::from("/media/anime"));
        assert!(config.settings.use_parallel);
        assert_eq!(config.settings.max_workers, 4);
    }

    #[test]
    fn test_mkvmerge_path_derivation() {
        let mut config = Config::default();
        config.paths.mkvextract_path = PathBuf::from("/opt/mkvtoolnix/mkvextract");
        assert_eq!(
            config.mkvmerge_path(),
            PathBuf::from("/opt/mkvtoolnix/mkvmerge")
        );

        config.paths.mkvextract_path = PathBuf::from("tools/mkvextract.exe");
        assert_eq!(config.mkvmerge_path(), PathBuf::from("tools/mkvmerge.exe"));

        config.paths.mkvextract_path = PathBuf::from("mkvextract");
        assert_eq!(config.mkvmerge_path(), PathBuf::from("mkvmerge"));

        config.paths.mkvmerge_path = Some(PathBuf::from("/usr/local/bin/mkvmerge"));
        assert_eq!(
            config.mkvmerge_path(),
            PathBuf::from("/usr/local/bin/mkvmerge")
        );
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[paths]"));
        assert!(sample.contains("[settings]"));
    }
}
