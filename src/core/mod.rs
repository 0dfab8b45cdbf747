pub mod cleaner;
pub mod comparator;
pub mod downloader;
pub mod engine;
pub mod scanner;

pub use cleaner::Cleaner;
pub use comparator::{diff, FileDiff};
pub use downloader::{DownloadReport, Downloader};
pub use engine::{SyncEngine, SyncReport};
pub use scanner::LocalScanner;
