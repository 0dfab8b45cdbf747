use crate::console::Console;
use crate::storage::FileRecord;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

/// Removes local files that no longer exist remotely.
///
/// Silent runs auto-approve deletion; interactive runs may view the list
/// first. The keep-old flag suppresses deletion entirely - it is one flag
/// covering both "keep replaced downloads" and "keep redundant files",
/// matching observed behavior.
pub struct Cleaner {
    local_root: PathBuf,
    silence: bool,
    keep_old: bool,
}

impl Cleaner {
    pub fn new(local_root: impl Into<PathBuf>, silence: bool, keep_old: bool) -> Self {
        Self {
            local_root: local_root.into(),
            silence,
            keep_old,
        }
    }

    /// Returns the number of files actually deleted.
    pub async fn run(&self, redundant: &[FileRecord], console: &dyn Console) -> u32 {
        if redundant.is_empty() {
            return 0;
        }

        if !self.silence {
            console.notice(&format!(
                "{} redundant file(s) exist locally but not on cloud.",
                redundant.len()
            ));
            if console.confirm("View the file list first?") {
                let rows: Vec<Vec<String>> = redundant
                    .iter()
                    .map(|r| {
                        vec![
                            r.name.clone(),
                            r.length.map_or_else(|| "unknown".to_string(), |l| l.to_string()),
                            if r.content_md5.is_empty() {
                                "not computed".to_string()
                            } else {
                                r.content_md5.clone()
                            },
                        ]
                    })
                    .collect();
                console.table(&["File Name", "Length (bytes)", "Content-MD5"], &rows);
            }
        }

        if !(self.silence || console.confirm("Delete these files?")) {
            return 0;
        }

        if self.keep_old {
            console.line("Skipping deletion because keep-old is enabled.");
            return 0;
        }

        let mut deleted = 0u32;
        for record in redundant {
            let path = self.local_root.join(&record.name);
            match fs::remove_file(&path).await {
                Ok(()) => {
                    deleted += 1;
                    debug!("deleted {}", path.display());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Already gone; nothing to count.
                }
                Err(e) => {
                    console.error(&format!("Failed to delete {}: {}", record.name, e));
                    warn!("failed to delete {}: {}", path.display(), e);
                }
            }
        }

        deleted
    }
}
