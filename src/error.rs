use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("mkvextract not found: {path}")]
    ExtractorNotFound { path: String },

    #[error("Input directory does not exist: {path}")]
    InvalidInputDirectory { path: String },

    #[error("Cannot create output directory {path}: {message}")]
    OutputDirectory { path: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Worker runtime failed: {message}")]
    Runtime { message: String },
}

/// Failure of the metadata probe for a single file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("mkvmerge exited with {}: {stderr}", describe_exit(.exit_code))]
    ToolFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("could not parse mkvmerge output: {0}")]
    MalformedOutput(String),

    #[error("could not run mkvmerge: {0}")]
    Spawn(#[source] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for HarvestError {
    fn user_message(&self) -> String {
        match self {
            HarvestError::ExtractorNotFound { path } => {
                format!("mkvextract not found at: {}", path)
            }
            HarvestError::InvalidInputDirectory { path } => {
                format!("Input directory '{}' does not exist", path)
            }
            HarvestError::OutputDirectory { path, message } => {
                format!("Cannot prepare output directory {}: {}", path, message)
            }
            HarvestError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            HarvestError::ExtractorNotFound { .. } => Some(
                "Install MKVToolNix or point --mkvextract-path at the mkvextract executable.".to_string()
            ),
            HarvestError::InvalidInputDirectory { .. } => Some(
                "Pass an existing directory with --input-dir or set input_dir under [paths] in the config file.".to_string()
            ),
            HarvestError::OutputDirectory { .. } => Some(
                "Ensure you have write permission for the output location or choose another one with --output-dir.".to_string()
            ),
            HarvestError::Config { .. } => Some(
                "Check your configuration file syntax. Run with --generate-config to see every supported key.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for HarvestError {
    fn from(error: toml::de::Error) -> Self {
        HarvestError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
