//! Whole-tree snapshots
//!
//! [`SnapshotCreator`] walks a sync root, scans every entry on the
//! [`ScanPool`], stores the resulting inodes and records the next
//! [`Snapshot`] revision. Entries that fail to scan are reported and left out
//! of the snapshot; storage failures abort it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use ivault_core::config::{expand_tilde, CryptoConfig, IvaultConfig};
use ivault_core::{ChunkingParams, IvaultResult};
use ivault_crypto::{KdfParams, Secret};
use ivault_snapshot::{
    ChunkStore, FsChunkStore, FsInodeStore, FsSnapshotStore, InodeStore, Snapshot, SnapshotStore,
};
use tracing::{info, warn};

use crate::attrs::{default_collector, AttributeCollector};
use crate::error::ScanError;
use crate::pool::{ScanPool, ScanTask};
use crate::scanner::InodeScanner;

/// Argon2id costs from the `[crypto]` config section.
pub fn kdf_params(config: &CryptoConfig) -> KdfParams {
    KdfParams {
        mem_cost_kib: config.argon2_mem_cost_kib,
        time_cost: config.argon2_time_cost,
        parallelism: config.argon2_parallelism,
    }
}

/// Every entry below `root` (the root itself excluded), sorted by path.
///
/// Entries whose file name matches one of `excludes` are skipped along with
/// everything below them. Symlinks are listed but never followed.
pub fn collect_entries(root: &Path, excludes: &[glob::Pattern]) -> Result<Vec<PathBuf>, ScanError> {
    let mut entries = Vec::new();
    collect_entries_inner(root, root, excludes, &mut entries)?;
    entries.sort();
    Ok(entries)
}

fn collect_entries_inner(
    root: &Path,
    dir: &Path,
    excludes: &[glob::Pattern],
    out: &mut Vec<PathBuf>,
) -> Result<(), ScanError> {
    let io = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        // Vanished since it was listed; its own scan reports it as deleted
        Err(e) if dir != root && e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io(e)),
    };

    for entry in read_dir {
        let entry = entry.map_err(io)?;
        let path = entry.path();

        let name = entry.file_name();
        if excludes.iter().any(|p| p.matches(&name.to_string_lossy())) {
            continue;
        }

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        out.push(path.clone());
        if is_dir {
            collect_entries_inner(root, &path, excludes, out)?;
        }
    }
    Ok(())
}

/// Outcome of one [`SnapshotCreator::create`] run.
#[derive(Debug)]
pub struct SnapshotReport {
    /// The new revision, already persisted
    pub snapshot: Snapshot,
    /// Entries that were scanned and stored
    pub scanned: usize,
    /// Entries left out of the snapshot
    pub failures: Vec<ScanError>,
}

pub struct SnapshotCreator {
    secret: Secret,
    root: PathBuf,
    chunk_store: Arc<dyn ChunkStore>,
    inode_store: Arc<dyn InodeStore>,
    snapshot_store: Arc<dyn SnapshotStore>,
    pool: ScanPool,
    excludes: Vec<glob::Pattern>,
    attributes: Arc<dyn AttributeCollector>,
}

impl SnapshotCreator {
    pub fn new(
        secret: Secret,
        root: impl Into<PathBuf>,
        chunk_store: Arc<dyn ChunkStore>,
        inode_store: Arc<dyn InodeStore>,
        snapshot_store: Arc<dyn SnapshotStore>,
        pool: ScanPool,
    ) -> Self {
        Self {
            secret,
            root: root.into(),
            chunk_store,
            inode_store,
            snapshot_store,
            pool,
            excludes: Vec::new(),
            attributes: default_collector(),
        }
    }

    /// Directory-backed stores, worker count and excludes from `config`.
    pub fn open(secret: Secret, root: impl Into<PathBuf>, config: &IvaultConfig) -> IvaultResult<Self> {
        let storage = &config.storage;
        let chunk_dir = expand_tilde(&storage.chunk_dir);
        let inode_dir = expand_tilde(&storage.inode_dir);
        let snapshot_dir = expand_tilde(&storage.snapshot_dir);

        let chunk_store = FsChunkStore::open(&chunk_dir)
            .with_context(|| format!("opening chunk store: {}", chunk_dir.display()))?;
        let inode_store = FsInodeStore::open(&inode_dir)
            .with_context(|| format!("opening inode store: {}", inode_dir.display()))?;
        let snapshot_store = FsSnapshotStore::open(&snapshot_dir)
            .with_context(|| format!("opening snapshot store: {}", snapshot_dir.display()))?;
        let pool = ScanPool::new(config.scanner.workers)?;

        Ok(Self::new(
            secret,
            root,
            Arc::new(chunk_store),
            Arc::new(inode_store),
            Arc::new(snapshot_store),
            pool,
        )
        .with_exclude_patterns(&config.scanner.exclude_patterns))
    }

    /// Glob patterns matched against entry names; invalid ones are skipped.
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Self {
        self.excludes = patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %p, "ignoring invalid exclude pattern: {e}");
                    None
                }
            })
            .collect();
        self
    }

    pub fn with_attribute_collector(mut self, collector: Arc<dyn AttributeCollector>) -> Self {
        self.attributes = collector;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the tree and persist the revision following `previous`.
    ///
    /// Blocks until every scan has finished; from async code run it on a
    /// blocking thread.
    pub fn create(&self, previous: &Snapshot) -> Result<SnapshotReport, ScanError> {
        let started = Instant::now();
        let entries = collect_entries(&self.root, &self.excludes)?;

        let tasks: Vec<ScanTask> = entries
            .iter()
            .map(|path| self.pool.submit(self.scanner(path, previous)))
            .collect();

        let mut inode_hashes = Vec::with_capacity(tasks.len());
        let mut failures = Vec::new();
        for task in tasks {
            let path = task.path().to_path_buf();
            match task.wait() {
                Ok(inode) => {
                    let hash = self
                        .inode_store
                        .put_inode(&inode)
                        .map_err(|source| ScanError::Storage { path, source })?;
                    inode_hashes.push(hash);
                }
                Err(e) => {
                    warn!(path = %path.display(), "leaving entry out of snapshot: {e}");
                    failures.push(e);
                }
            }
        }

        let snapshot = previous.next(inode_hashes);
        self.snapshot_store
            .put_snapshot(&snapshot)
            .map_err(|source| ScanError::Storage {
                path: self.root.clone(),
                source,
            })?;

        info!(
            root = %self.root.display(),
            revision = snapshot.revision(),
            inodes = snapshot.inode_hashes().len(),
            failures = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snapshot created"
        );
        Ok(SnapshotReport {
            scanned: snapshot.inode_hashes().len(),
            snapshot,
            failures,
        })
    }

    /// Like [`create`](Self::create), continuing from the latest stored
    /// snapshot, or from revision 0 with `chunking` for a new tree.
    pub fn create_next(&self, chunking: ChunkingParams) -> Result<SnapshotReport, ScanError> {
        let storage = |source| ScanError::Storage {
            path: self.root.clone(),
            source,
        };
        let previous = match self.snapshot_store.latest_snapshot().map_err(storage)? {
            Some(latest) => {
                if latest.chunking() != &chunking {
                    warn!(
                        revision = latest.revision(),
                        "configured chunking differs from the tree's; keeping the tree's"
                    );
                }
                latest
            }
            None => {
                let initial =
                    Snapshot::initial(chunking).map_err(|source| ScanError::InvalidParams {
                        path: self.root.clone(),
                        source,
                    })?;
                self.snapshot_store.put_snapshot(&initial).map_err(storage)?;
                initial
            }
        };
        self.create(&previous)
    }

    fn scanner(&self, path: &Path, snapshot: &Snapshot) -> InodeScanner {
        InodeScanner::new(
            path,
            self.secret.clone(),
            &self.root,
            snapshot,
            self.inode_store.clone(),
            self.chunk_store.clone(),
        )
        .with_attribute_collector(self.attributes.clone())
    }
}
