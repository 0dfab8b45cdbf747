use crate::storage::FileRecord;
use std::collections::HashSet;

/// The two set differences a sync run acts on.
#[derive(Debug, Clone, Default)]
pub struct FileDiff {
    /// Remote records with no local equivalent.
    pub to_download: Vec<FileRecord>,
    /// Local records with no remote equivalent.
    pub redundant: Vec<FileRecord>,
}

/// Compute `remote - local` and `local - remote` under the record
/// equivalence key. Pure; input order is irrelevant to membership, output
/// preserves each input's original order for deterministic reporting.
pub fn diff(remote: &[FileRecord], local: &[FileRecord]) -> FileDiff {
    let local_keys: HashSet<_> = local.iter().map(FileRecord::sync_key).collect();
    let remote_keys: HashSet<_> = remote.iter().map(FileRecord::sync_key).collect();

    FileDiff {
        to_download: remote
            .iter()
            .filter(|r| !local_keys.contains(&r.sync_key()))
            .cloned()
            .collect(),
        redundant: local
            .iter()
            .filter(|r| !remote_keys.contains(&r.sync_key()))
            .cloned()
            .collect(),
    }
}
