pub mod file_filter;
pub mod media_scanner;

pub use file_filter::FileFilter;
pub use media_scanner::{MediaFile, MediaScanner};
