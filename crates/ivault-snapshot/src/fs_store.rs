//! Directory-backed stores: one file per object
//!
//! Layout:
//! - chunks: `{dir}/{hash[0..2]}/{hash}` (hex, two-level sharding)
//! - inodes: `{dir}/{hash}.inode`
//! - snapshots: `{dir}/{revision}.snapshot`
//!
//! Every write goes to a temp file in the target directory and is renamed into
//! place, so readers never observe a partial object.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunk_info::ChunkInfo;
use crate::inode::Inode;
use crate::snapshot::Snapshot;
use crate::store::{ChunkIndex, ChunkStore, InodeStore, SnapshotStore, StoreError, StoreResult};

const INODE_EXT: &str = "inode";
const SNAPSHOT_EXT: &str = "snapshot";

fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn read_object(path: &Path, describe: impl FnOnce() -> String) -> StoreResult<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(describe())),
        Err(e) => Err(e.into()),
    }
}

fn object_key(hash: &[u8]) -> StoreResult<String> {
    if hash.is_empty() {
        return Err(StoreError::Corrupt("empty object key".into()));
    }
    Ok(hex::encode(hash))
}

pub struct FsChunkStore {
    dir: PathBuf,
}

impl FsChunkStore {
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(&key[..2]).join(key)
    }
}

impl ChunkStore for FsChunkStore {
    fn put_chunk(&self, ciphertext_hash: &[u8], ciphertext: &[u8]) -> StoreResult<()> {
        let path = self.path_for(&object_key(ciphertext_hash)?);
        if path.exists() {
            return Ok(());
        }
        write_atomic(&path, ciphertext)?;
        debug!(path = %path.display(), bytes = ciphertext.len(), "stored chunk");
        Ok(())
    }

    fn get_chunk(&self, ciphertext_hash: &[u8]) -> StoreResult<Vec<u8>> {
        let key = object_key(ciphertext_hash)?;
        read_object(&self.path_for(&key), || format!("chunk {key}"))
    }

    fn has_chunk(&self, ciphertext_hash: &[u8]) -> StoreResult<bool> {
        Ok(self.path_for(&object_key(ciphertext_hash)?).is_file())
    }
}

pub struct FsInodeStore {
    dir: PathBuf,
    index: ChunkIndex,
}

impl FsInodeStore {
    /// Open the store and rebuild the keyed-hash index from the stored inodes.
    ///
    /// Records that fail to decode are skipped with a warning; they only cost
    /// dedup opportunities.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let index = ChunkIndex::default();

        let mut inodes = 0usize;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(INODE_EXT) {
                continue;
            }
            match fs::read(&path)
                .map_err(StoreError::from)
                .and_then(|bytes| Ok(Inode::decode(&bytes)?))
            {
                Ok(inode) => {
                    index.index_inode(&inode);
                    inodes += 1;
                }
                Err(e) => warn!(path = %path.display(), "skipping unreadable inode: {e}"),
            }
        }

        info!(
            dir = %dir.display(),
            inodes,
            indexed_chunks = index.len(),
            "opened inode store"
        );
        Ok(Self { dir, index })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{INODE_EXT}"))
    }
}

impl InodeStore for FsInodeStore {
    fn put_inode(&self, inode: &Inode) -> StoreResult<Vec<u8>> {
        let encoded = inode.encode_to_vec();
        let hash = ivault_chunks::hash_bytes(&encoded).as_bytes().to_vec();
        let path = self.path_for(&object_key(&hash)?);
        if !path.exists() {
            write_atomic(&path, &encoded)?;
        }
        self.index.index_inode(inode);
        Ok(hash)
    }

    fn get_inode(&self, inode_hash: &[u8]) -> StoreResult<Inode> {
        let key = object_key(inode_hash)?;
        let bytes = read_object(&self.path_for(&key), || format!("inode {key}"))?;
        if ivault_chunks::hash_bytes(&bytes).as_bytes().as_slice() != inode_hash {
            return Err(StoreError::Corrupt(format!("inode {key} does not match its hash")));
        }
        Ok(Inode::decode(&bytes)?)
    }

    fn get_chunk_by_plaintext_keyed_hash(
        &self,
        plaintext_keyed_hash: &[u8],
    ) -> StoreResult<Option<ChunkInfo>> {
        Ok(self.index.get(plaintext_keyed_hash))
    }

    fn insert_chunk(&self, chunk: ChunkInfo) -> StoreResult<ChunkInfo> {
        Ok(self.index.insert(chunk))
    }
}

pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, revision: i64) -> PathBuf {
        self.dir.join(format!("{revision}.{SNAPSHOT_EXT}"))
    }

    fn revisions(&self) -> StoreResult<Vec<i64>> {
        let mut revisions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(revision) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i64>().ok())
            {
                revisions.push(revision);
            }
        }
        revisions.sort_unstable();
        Ok(revisions)
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn put_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let path = self.path_for(snapshot.revision());
        if path.exists() {
            let existing = self.get_snapshot(snapshot.revision())?;
            if &existing != snapshot {
                return Err(StoreError::Conflict(format!(
                    "revision {} already stored with different content",
                    snapshot.revision()
                )));
            }
            return Ok(());
        }
        write_atomic(&path, &snapshot.encode_to_vec())
    }

    fn get_snapshot(&self, revision: i64) -> StoreResult<Snapshot> {
        let bytes = read_object(&self.path_for(revision), || {
            format!("snapshot revision {revision}")
        })?;
        Ok(Snapshot::decode(&bytes)?)
    }

    fn latest_snapshot(&self) -> StoreResult<Option<Snapshot>> {
        match self.revisions()?.last() {
            Some(&revision) => self.get_snapshot(revision).map(Some),
            None => Ok(None),
        }
    }
}
