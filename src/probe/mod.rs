pub mod container;
pub mod mkvmerge;

pub use container::{AttachmentInfo, ContainerDescription, TrackInfo, TrackKind};
pub use mkvmerge::{parse_identification, MkvmergeProbe};

use crate::error::ProbeError;
use std::path::Path;

/// Reads the structure of a container file.
///
/// Implementations must be shareable across workers.
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, file_path: &Path) -> Result<ContainerDescription, ProbeError>;
}
