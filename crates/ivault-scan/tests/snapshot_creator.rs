//! Integration tests for whole-tree snapshots with in-memory and directory
//! backed stores.

use std::fs;
use std::sync::Arc;

use ivault_core::config::IvaultConfig;
use ivault_core::ChunkingParams;
use ivault_crypto::Secret;
use ivault_scan::{ScanPool, SnapshotCreator};
use ivault_snapshot::{
    restore_file, FsChunkStore, FsInodeStore, FsSnapshotStore, InodeStore, InodeType,
    MemoryChunkStore, MemoryInodeStore, MemorySnapshotStore, Snapshot, SnapshotStore,
};
use tempfile::TempDir;

fn small_params() -> ChunkingParams {
    ChunkingParams {
        min_chunksize: 128,
        max_chunksize: 1024,
        avg_bits: 8,
        ..Default::default()
    }
}

fn populate(root: &std::path::Path) {
    fs::create_dir_all(root.join("docs/drafts")).unwrap();
    fs::write(root.join("docs/readme.md"), b"# readme\n").unwrap();
    fs::write(root.join("docs/drafts/big.bin"), vec![7u8; 10_000]).unwrap();
    fs::write(root.join("empty"), b"").unwrap();
    fs::write(root.join("scratch.tmp"), b"excluded").unwrap();
}

struct MemoryTree {
    tmp: TempDir,
    secret: Secret,
    chunks: Arc<MemoryChunkStore>,
    inodes: Arc<MemoryInodeStore>,
    snapshots: Arc<MemorySnapshotStore>,
}

impl MemoryTree {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path());
        Self {
            tmp,
            secret: Secret::generate().unwrap(),
            chunks: Arc::new(MemoryChunkStore::new()),
            inodes: Arc::new(MemoryInodeStore::new()),
            snapshots: Arc::new(MemorySnapshotStore::new()),
        }
    }

    fn creator(&self) -> SnapshotCreator {
        SnapshotCreator::new(
            self.secret.clone(),
            self.tmp.path(),
            self.chunks.clone(),
            self.inodes.clone(),
            self.snapshots.clone(),
            ScanPool::new(2).unwrap(),
        )
        .with_exclude_patterns(&["*.tmp".to_string(), "[invalid".to_string()])
    }
}

#[test]
fn snapshot_lists_every_entry_in_path_order() {
    let tree = MemoryTree::new();
    let previous = Snapshot::initial(small_params()).unwrap();

    let report = tree.creator().create(&previous).unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.snapshot.revision(), 1);
    assert_eq!(report.snapshot.chunking(), &small_params());
    // docs, docs/drafts, docs/drafts/big.bin, docs/readme.md, empty
    assert_eq!(report.scanned, 5);

    let names: Vec<String> = report
        .snapshot
        .inode_hashes()
        .iter()
        .map(|h| {
            tree.inodes
                .get_inode(h)
                .unwrap()
                .path()
                .decrypt_to_string(&tree.secret)
                .unwrap()
        })
        .collect();
    assert_eq!(
        names,
        ["docs", "docs/drafts", "docs/drafts/big.bin", "docs/readme.md", "empty"]
    );

    assert_eq!(tree.snapshots.latest_snapshot().unwrap(), Some(report.snapshot));
}

#[test]
fn stored_files_restore_from_snapshot() {
    let tree = MemoryTree::new();
    let report = tree
        .creator()
        .create(&Snapshot::initial(small_params()).unwrap())
        .unwrap();

    let big = report
        .snapshot
        .inode_hashes()
        .iter()
        .map(|h| tree.inodes.get_inode(h).unwrap())
        .find(|inode| inode.path().decrypt_to_string(&tree.secret).unwrap() == "docs/drafts/big.bin")
        .unwrap();
    assert_eq!(big.inode_type(), InodeType::File);

    let mut restored = Vec::new();
    restore_file(&big, &tree.secret, &*tree.chunks, &mut restored).unwrap();
    assert_eq!(restored, vec![7u8; 10_000]);
}

#[test]
fn unchanged_tree_reuses_every_chunk() {
    let tree = MemoryTree::new();
    let creator = tree.creator();

    let first = creator.create_next(small_params()).unwrap();
    let stored = tree.chunks.len();
    let second = creator.create_next(small_params()).unwrap();

    assert_eq!(first.snapshot.revision(), 1, "revision 0 is the empty initial tree");
    assert_eq!(second.snapshot.revision(), 2);
    assert_eq!(tree.chunks.len(), stored);
    assert_eq!(tree.snapshots.get_snapshot(0).unwrap().inode_hashes().len(), 0);
}

#[cfg(unix)]
#[test]
fn unsupported_entries_are_reported_not_fatal() {
    let tree = MemoryTree::new();
    let sock = tree.tmp.path().join("daemon.sock");
    let _listener = std::os::unix::net::UnixListener::bind(&sock).unwrap();

    let report = tree
        .creator()
        .create(&Snapshot::initial(small_params()).unwrap())
        .unwrap();
    assert_eq!(report.scanned, 5);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path(), sock.as_path());
}

#[test]
fn open_from_config_persists_to_directories() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir(&root).unwrap();
    populate(&root);

    let mut config = IvaultConfig::default();
    config.chunking = small_params();
    config.scanner.workers = 2;
    config.scanner.exclude_patterns = vec!["*.tmp".into()];
    config.storage.chunk_dir = tmp.path().join("store/chunks");
    config.storage.inode_dir = tmp.path().join("store/inodes");
    config.storage.snapshot_dir = tmp.path().join("store/snapshots");

    let secret = Secret::generate().unwrap();
    let report = SnapshotCreator::open(secret.clone(), &root, &config)
        .unwrap()
        .create_next(config.chunking)
        .unwrap();
    assert!(report.failures.is_empty());

    let snapshots = FsSnapshotStore::open(&config.storage.snapshot_dir).unwrap();
    let latest = snapshots.latest_snapshot().unwrap().unwrap();
    assert_eq!(latest, report.snapshot);

    let inodes = FsInodeStore::open(&config.storage.inode_dir).unwrap();
    let chunks = FsChunkStore::open(&config.storage.chunk_dir).unwrap();
    for hash in latest.inode_hashes() {
        let inode = inodes.get_inode(hash).unwrap();
        if inode.inode_type() == InodeType::File {
            let mut out = Vec::new();
            let n = restore_file(&inode, &secret, &chunks, &mut out).unwrap();
            assert_eq!(n, inode.file_size());
        }
    }
}

#[tokio::test]
async fn create_from_async_code_via_blocking_thread() {
    let tree = MemoryTree::new();
    let creator = tree.creator();
    let previous = Snapshot::initial(small_params()).unwrap();

    let report = tokio::task::spawn_blocking(move || creator.create(&previous))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.snapshot.revision(), 1);
}
