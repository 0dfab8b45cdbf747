pub mod azblob;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub use azblob::AzblobStore;

// ============ shared constants ============

/// Timeout for non-IO operations (seconds) - verify, stat, etc.
pub const OP_TIMEOUT_SECS: u64 = 60;
/// Timeout for IO operations (seconds) - list pages, downloads.
pub const IO_TIMEOUT_SECS: u64 = 300;

/// One file, remote or local, reduced to what the sync comparison needs.
///
/// Remote names may contain `/`, implying nested directories under the local
/// root. `length` is `None` when the store did not report a size, which is a
/// different state from a zero-byte file. An empty `content_md5` means the
/// hash was not computed for this run, not that hashing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub length: Option<u64>,
    /// Base64 MD5 digest, matching Azure's Content-MD5 representation.
    pub content_md5: String,
    /// Archive access tier; always false for local records.
    pub is_archive: bool,
}

impl FileRecord {
    /// Equivalence key for set membership: case-insensitive name, exact
    /// length (including both-absent), byte-for-byte hash. When hashing is
    /// disabled both sides carry an empty hash, so the hash component is a
    /// no-op.
    pub fn sync_key(&self) -> (String, Option<u64>, String) {
        (
            self.name.to_lowercase(),
            self.length,
            self.content_md5.clone(),
        )
    }
}

/// Remote object store abstraction.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fail fast when the container is missing or not accessible.
    async fn verify(&self) -> Result<()>;

    /// Enumerate every object in the container. The content hash is attached
    /// only when `with_hash` is set and the store reports one. Enumeration
    /// errors are fatal to the run; there is no partial listing.
    async fn list(&self, with_hash: bool) -> Result<Vec<FileRecord>>;

    /// Download one object to the given local path. The caller owns
    /// destination resolution and conflict handling.
    async fn download(&self, name: &str, dest: &Path) -> Result<()>;

    /// Store name for logs.
    fn name(&self) -> &str;
}

/// Build the store for a validated set of run options.
pub fn create_store(options: &crate::config::SyncOptions) -> Result<Arc<dyn RemoteStore>> {
    let store = AzblobStore::new(&options.connection_string, &options.container)?;
    tracing::info!("initialized store: {}", store.name());
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, length: Option<u64>, md5: &str) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            length,
            content_md5: md5.to_string(),
            is_archive: false,
        }
    }

    #[test]
    fn sync_key_is_case_insensitive_on_name() {
        let a = record("Photo.JPG", Some(42), "");
        let b = record("photo.jpg", Some(42), "");
        assert_eq!(a.sync_key(), b.sync_key());
    }

    #[test]
    fn absent_length_differs_from_zero() {
        let absent = record("a.txt", None, "");
        let zero = record("a.txt", Some(0), "");
        assert_ne!(absent.sync_key(), zero.sync_key());
    }

    #[test]
    fn hash_mismatch_changes_key() {
        let a = record("a.txt", Some(1), "XrY7u+Ae7tCTyyK7j1rNww==");
        let b = record("a.txt", Some(1), "1B2M2Y8AsgTpgAmY7PhCfg==");
        assert_ne!(a.sync_key(), b.sync_key());
    }
}
