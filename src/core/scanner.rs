use crate::storage::FileRecord;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Collects the local side of the inventory.
///
/// The scan is non-recursive: only entries directly inside the target
/// directory are listed. Subdirectories created by earlier downloads are left
/// alone. Hashing, when enabled, streams each file through MD5 with its own
/// concurrency bound, independent of the download bound.
pub struct LocalScanner {
    max_concurrent: usize,
    compare_hash: bool,
}

impl LocalScanner {
    pub fn new(max_concurrent: usize, compare_hash: bool) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            compare_hash,
        }
    }

    /// Scan the target directory. A missing directory is created and yields
    /// an empty inventory. Entries that vanish between listing and reading
    /// are skipped, never fatal.
    pub async fn scan(&self, dir: &Path) -> Result<Vec<FileRecord>> {
        if !fs::try_exists(dir).await.unwrap_or(false) {
            fs::create_dir_all(dir).await?;
            info!("created local folder {}", dir.display());
            return Ok(Vec::new());
        }

        let mut entries: Vec<(String, PathBuf)> = Vec::new();
        let mut read_dir = fs::read_dir(dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("skipping {:?}: {}", entry.file_name(), e);
                    continue;
                }
            };
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push((name, entry.path()));
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(entries.len());

        for (name, path) in entries {
            let permit = semaphore.clone().acquire_owned().await?;
            let compare_hash = self.compare_hash;

            handles.push(tokio::spawn(async move {
                let _permit = permit;

                let metadata = match fs::metadata(&path).await {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("skipping {}: {}", name, e);
                        return None;
                    }
                };

                let content_md5 = if compare_hash {
                    match hash_file(&path).await {
                        Ok(digest) => digest,
                        Err(e) => {
                            warn!("skipping {}: {}", name, e);
                            return None;
                        }
                    }
                } else {
                    String::new()
                };

                Some(FileRecord {
                    name,
                    length: Some(metadata.len()),
                    content_md5,
                    is_archive: false,
                })
            }));
        }

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(Some(record)) = handle.await {
                records.push(record);
            }
        }

        debug!("local scan found {} file(s)", records.len());
        Ok(records)
    }
}

/// Stream a file through MD5 and return the base64 digest, the same
/// representation Azure reports as Content-MD5.
async fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(STANDARD.encode(hasher.finalize()))
}
