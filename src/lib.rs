pub mod config;
pub mod console;
pub mod core;
pub mod logging;
pub mod storage;

pub use config::{RawOptions, SyncOptions};
pub use console::{Console, TermConsole};
pub use core::{SyncEngine, SyncReport};
pub use storage::{FileRecord, RemoteStore};
