//! End-to-end tests for the sync core, driven through in-memory doubles for
//! the remote store and the operator console.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use blobsync::config::SyncOptions;
use blobsync::console::Console;
use blobsync::core::{Cleaner, Downloader, SyncEngine};
use blobsync::storage::{FileRecord, RemoteStore};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn record(name: &str, length: u64) -> FileRecord {
    FileRecord {
        name: name.to_string(),
        length: Some(length),
        content_md5: String::new(),
        is_archive: false,
    }
}

fn archived(name: &str, length: u64) -> FileRecord {
    FileRecord {
        is_archive: true,
        ..record(name, length)
    }
}

/// Remote store double. Serves canned records and contents, optionally
/// failing named objects, and tracks how many downloads run concurrently.
#[derive(Default)]
struct MockStore {
    objects: Vec<FileRecord>,
    contents: HashMap<String, Vec<u8>>,
    fail: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    attempted: Mutex<Vec<String>>,
}

impl MockStore {
    fn with_objects(objects: Vec<FileRecord>) -> Self {
        let contents = objects
            .iter()
            .map(|r| (r.name.clone(), format!("content of {}", r.name).into_bytes()))
            .collect();
        Self {
            objects,
            contents,
            ..Default::default()
        }
    }

    fn failing(mut self, names: &[&str]) -> Self {
        self.fail = names.iter().map(|n| n.to_string()).collect();
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn verify(&self) -> Result<()> {
        Ok(())
    }

    async fn list(&self, _with_hash: bool) -> Result<Vec<FileRecord>> {
        Ok(self.objects.clone())
    }

    async fn download(&self, name: &str, dest: &Path) -> Result<()> {
        self.attempted.lock().unwrap().push(name.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = if self.fail.contains(name) {
            Err(anyhow!("simulated transfer failure"))
        } else {
            let data = self
                .contents
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("no such object: {name}"))?;
            tokio::fs::write(dest, data).await.map_err(Into::into)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Console double: records output, answers confirmations from a script
/// (defaulting to yes once the script runs out).
#[derive(Default)]
struct TestConsole {
    lines: Mutex<Vec<String>>,
    confirms: Mutex<VecDeque<bool>>,
}

impl TestConsole {
    fn scripted(answers: &[bool]) -> Self {
        Self {
            confirms: Mutex::new(answers.iter().copied().collect()),
            ..Default::default()
        }
    }

    fn output(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Console for TestConsole {
    fn line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn notice(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("error: {message}"));
    }

    fn status(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, _prompt: &str) -> bool {
        self.confirms.lock().unwrap().pop_front().unwrap_or(true)
    }

    fn ask(&self, _prompt: &str) -> String {
        String::new()
    }

    fn table(&self, _headers: &[&str], _rows: &[Vec<String>]) {}
}

fn options(local_path: PathBuf, threads: usize, silence: bool, keep_old: bool) -> SyncOptions {
    SyncOptions {
        connection_string: "AccountName=demo;AccountKey=k".to_string(),
        container: "backups".to_string(),
        local_path,
        threads,
        silence,
        keep_old,
        compare_hash: false,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_concurrency_is_respected() {
    let tmp = tempfile::tempdir().unwrap();
    let to_download: Vec<FileRecord> = (0..10).map(|i| record(&format!("f{i}.bin"), 1)).collect();
    let store = Arc::new(
        MockStore::with_objects(to_download.clone()).with_delay(Duration::from_millis(50)),
    );

    let downloader = Downloader::new(store.clone(), tmp.path(), 2, false);
    let report = downloader
        .run(&to_download, Arc::new(TestConsole::default()))
        .await;

    assert_eq!(report.not_downloaded, 0);
    assert!(
        store.max_in_flight.load(Ordering::SeqCst) <= 2,
        "no instant may have more than 2 downloads in flight"
    );
    for r in &to_download {
        assert!(tmp.path().join(&r.name).is_file());
    }
}

#[tokio::test]
async fn archived_objects_are_skipped_not_attempted() {
    let tmp = tempfile::tempdir().unwrap();
    let objects = vec![record("a.txt", 10), archived("b.txt", 20)];
    let store = Arc::new(MockStore::with_objects(objects));

    let options = options(tmp.path().to_path_buf(), 1, true, false);
    let console = Arc::new(TestConsole::default());
    let engine = SyncEngine::new(options, store.clone(), console.clone());

    let report = engine.run().await.unwrap();

    assert_eq!(report.to_download, 2);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.archived_skipped, 1);
    assert_eq!(store.attempted(), vec!["a.txt"]);
    assert!(tmp.path().join("a.txt").is_file());
    assert!(!tmp.path().join("b.txt").exists());
    assert!(console
        .output()
        .iter()
        .any(|l| l.contains("Skipped archived file 'b.txt'")));
}

#[tokio::test]
async fn failures_are_counted_and_do_not_cancel_siblings() {
    let tmp = tempfile::tempdir().unwrap();
    let to_download: Vec<FileRecord> = (0..5).map(|i| record(&format!("f{i}.bin"), 1)).collect();
    let store =
        Arc::new(MockStore::with_objects(to_download.clone()).failing(&["f1.bin", "f3.bin"]));

    let downloader = Downloader::new(store, tmp.path(), 3, false);
    let report = downloader
        .run(&to_download, Arc::new(TestConsole::default()))
        .await;

    assert_eq!(report.not_downloaded, 2);
    assert_eq!(report.archived_skipped, 0);
    for name in ["f0.bin", "f2.bin", "f4.bin"] {
        assert!(tmp.path().join(name).is_file());
    }
    for name in ["f1.bin", "f3.bin"] {
        assert!(!tmp.path().join(name).exists());
    }
}

#[tokio::test]
async fn keep_old_preserves_the_previous_content_under_a_timestamped_name() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("report.csv"), b"old bytes").unwrap();

    let to_download = vec![record("report.csv", 9)];
    let store = Arc::new(MockStore::with_objects(to_download.clone()));

    let downloader = Downloader::new(store, tmp.path(), 1, true);
    let report = downloader
        .run(&to_download, Arc::new(TestConsole::default()))
        .await;
    assert_eq!(report.not_downloaded, 0);

    assert_eq!(
        std::fs::read(tmp.path().join("report.csv")).unwrap(),
        b"content of report.csv"
    );

    let renamed: Vec<PathBuf> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            name.starts_with("report_") && name.ends_with(".csv")
        })
        .collect();
    assert_eq!(renamed.len(), 1, "exactly one renamed copy of the old file");
    assert_eq!(std::fs::read(&renamed[0]).unwrap(), b"old bytes");
}

#[tokio::test]
async fn overwrite_without_keep_old_leaves_a_single_file() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("report.csv"), b"old bytes").unwrap();

    let to_download = vec![record("report.csv", 9)];
    let store = Arc::new(MockStore::with_objects(to_download.clone()));

    Downloader::new(store, tmp.path(), 1, false)
        .run(&to_download, Arc::new(TestConsole::default()))
        .await;

    let entries = std::fs::read_dir(tmp.path()).unwrap().count();
    assert_eq!(entries, 1);
    assert_eq!(
        std::fs::read(tmp.path().join("report.csv")).unwrap(),
        b"content of report.csv"
    );
}

#[tokio::test]
async fn nested_object_names_create_intermediate_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let to_download = vec![record("images/2024/photo.jpg", 3)];
    let store = Arc::new(MockStore::with_objects(to_download.clone()));

    let report = Downloader::new(store, tmp.path(), 1, false)
        .run(&to_download, Arc::new(TestConsole::default()))
        .await;

    assert_eq!(report.not_downloaded, 0);
    assert!(tmp.path().join("images/2024/photo.jpg").is_file());
}

#[tokio::test]
async fn redundant_files_are_deleted_in_a_silent_run() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("old.txt"), b"stale").unwrap();

    let store = Arc::new(MockStore::with_objects(vec![]));
    let options = options(tmp.path().to_path_buf(), 1, true, false);
    let engine = SyncEngine::new(options, store, Arc::new(TestConsole::default()));

    let report = engine.run().await.unwrap();

    assert_eq!(report.downloaded, 0);
    assert_eq!(report.deleted, 1);
    assert!(!tmp.path().join("old.txt").exists());
}

#[tokio::test]
async fn keep_old_suppresses_redundant_file_deletion() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("old.txt"), b"stale").unwrap();

    let redundant = vec![record("old.txt", 5)];
    let console = TestConsole::default();

    // Silent run approves deletion automatically, but keep-old wins.
    let deleted = Cleaner::new(tmp.path(), true, true)
        .run(&redundant, &console)
        .await;

    assert_eq!(deleted, 0);
    assert!(tmp.path().join("old.txt").exists());
    assert!(console
        .output()
        .iter()
        .any(|l| l.contains("keep-old")));
}

#[tokio::test]
async fn declined_deletion_leaves_files_in_place() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("old.txt"), b"stale").unwrap();

    let redundant = vec![record("old.txt", 5)];
    // First answer: skip viewing the list; second: refuse deletion.
    let console = TestConsole::scripted(&[false, false]);

    let deleted = Cleaner::new(tmp.path(), false, false)
        .run(&redundant, &console)
        .await;

    assert_eq!(deleted, 0);
    assert!(tmp.path().join("old.txt").exists());
}

#[tokio::test]
async fn individual_delete_failures_are_skipped_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.txt"), b"x").unwrap();
    std::fs::write(tmp.path().join("b.txt"), b"y").unwrap();

    // "missing.txt" is already gone; the two real files must still go.
    let redundant = vec![
        record("missing.txt", 1),
        record("a.txt", 1),
        record("b.txt", 1),
    ];

    let deleted = Cleaner::new(tmp.path(), true, false)
        .run(&redundant, &TestConsole::default())
        .await;

    assert_eq!(deleted, 2);
    assert!(!tmp.path().join("a.txt").exists());
    assert!(!tmp.path().join("b.txt").exists());
}

#[tokio::test]
async fn declined_download_confirmation_downloads_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let objects = vec![record("a.txt", 10)];
    let store = Arc::new(MockStore::with_objects(objects));

    // Interactive run: approve "Good to go?", refuse the download prompt.
    let console = Arc::new(TestConsole::scripted(&[true, false]));
    let options = options(tmp.path().to_path_buf(), 1, false, false);
    let engine = SyncEngine::new(options, store.clone(), console);

    engine.run().await.unwrap();

    assert!(store.attempted().is_empty());
    assert!(!tmp.path().join("a.txt").exists());
}

#[tokio::test]
async fn unchanged_inventories_produce_no_work() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.txt"), b"0123456789").unwrap();

    let store = Arc::new(MockStore::with_objects(vec![record("a.txt", 10)]));
    let options = options(tmp.path().to_path_buf(), 1, true, false);
    let console = Arc::new(TestConsole::default());
    let engine = SyncEngine::new(options, store.clone(), console.clone());

    let report = engine.run().await.unwrap();

    assert_eq!(report.to_download, 0);
    assert_eq!(report.deleted, 0);
    assert!(store.attempted().is_empty());
    assert!(console
        .output()
        .iter()
        .any(|l| l.contains("No new files need to be downloaded.")));
}

#[tokio::test]
async fn cancel_flag_stops_new_downloads() {
    let tmp = tempfile::tempdir().unwrap();
    let to_download: Vec<FileRecord> = (0..4).map(|i| record(&format!("f{i}.bin"), 1)).collect();
    let store = Arc::new(MockStore::with_objects(to_download.clone()));

    let downloader = Downloader::new(store.clone(), tmp.path(), 1, false);
    downloader.cancel_flag().store(true, Ordering::SeqCst);

    downloader
        .run(&to_download, Arc::new(TestConsole::default()))
        .await;

    assert!(store.attempted().is_empty());
}
