//! In-process stores backed by lock-protected maps

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::chunk_info::ChunkInfo;
use crate::inode::Inode;
use crate::snapshot::Snapshot;
use crate::store::{ChunkIndex, ChunkStore, InodeStore, SnapshotStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkStore for MemoryChunkStore {
    fn put_chunk(&self, ciphertext_hash: &[u8], ciphertext: &[u8]) -> StoreResult<()> {
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(ciphertext_hash.to_vec())
            .or_insert_with(|| ciphertext.to_vec());
        Ok(())
    }

    fn get_chunk(&self, ciphertext_hash: &[u8]) -> StoreResult<Vec<u8>> {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ciphertext_hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("chunk {}", hex::encode(ciphertext_hash))))
    }

    fn has_chunk(&self, ciphertext_hash: &[u8]) -> StoreResult<bool> {
        Ok(self
            .chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(ciphertext_hash))
    }
}

#[derive(Debug, Default)]
pub struct MemoryInodeStore {
    inodes: RwLock<HashMap<Vec<u8>, Inode>>,
    index: ChunkIndex,
}

impl MemoryInodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored inodes.
    pub fn len(&self) -> usize {
        self.inodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct keyed hashes known to the index.
    pub fn indexed_chunks(&self) -> usize {
        self.index.len()
    }
}

impl InodeStore for MemoryInodeStore {
    fn put_inode(&self, inode: &Inode) -> StoreResult<Vec<u8>> {
        let hash = inode.hash();
        self.inodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(hash.clone())
            .or_insert_with(|| inode.clone());
        self.index.index_inode(inode);
        Ok(hash)
    }

    fn get_inode(&self, inode_hash: &[u8]) -> StoreResult<Inode> {
        self.inodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(inode_hash)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("inode {}", hex::encode(inode_hash))))
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

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<i64, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match snapshots.get(&snapshot.revision()) {
            Some(existing) if existing != snapshot => Err(StoreError::Conflict(format!(
                "revision {} already stored with different content",
                snapshot.revision()
            ))),
            Some(_) => Ok(()),
            None => {
                snapshots.insert(snapshot.revision(), snapshot.clone());
                Ok(())
            }
        }
    }

    fn get_snapshot(&self, revision: i64) -> StoreResult<Snapshot> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&revision)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("snapshot revision {revision}")))
    }

    fn latest_snapshot(&self) -> StoreResult<Option<Snapshot>> {
        Ok(self
            .snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .next_back()
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypted::EncryptedData;
    use crate::inode::{InodeType, Timestamp};
    use ivault_core::ChunkingParams;

    fn chunk(keyed: u8, ct: u8) -> ChunkInfo {
        ChunkInfo::new(vec![ct; 32], 64, vec![ct; 16], vec![keyed; 32])
    }

    fn file_inode(chunks: Vec<ChunkInfo>) -> Inode {
        Inode::builder(InodeType::File, EncryptedData::from_parts(vec![1; 16], vec![2; 16]))
            .timestamp(Timestamp::new(100, 0))
            .chunks(chunks)
            .build()
            .unwrap()
    }

    #[test]
    fn chunk_store_put_get() {
        let store = MemoryChunkStore::new();
        assert!(!store.has_chunk(b"h").unwrap());
        store.put_chunk(b"h", b"ciphertext").unwrap();
        store.put_chunk(b"h", b"ignored").unwrap();
        assert!(store.has_chunk(b"h").unwrap());
        assert_eq!(store.get_chunk(b"h").unwrap(), b"ciphertext");
        assert_eq!(store.len(), 1);
        assert!(matches!(store.get_chunk(b"x"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn put_inode_indexes_chunks() {
        let store = MemoryInodeStore::new();
        let inode = file_inode(vec![chunk(1, 10), chunk(2, 20)]);
        let hash = store.put_inode(&inode).unwrap();

        assert_eq!(hash, inode.hash());
        assert_eq!(store.get_inode(&hash).unwrap(), inode);
        assert!(store.has_chunk_by_plaintext_keyed_hash(&[1; 32]).unwrap());
        assert_eq!(
            store.get_chunk_by_plaintext_keyed_hash(&[2; 32]).unwrap(),
            Some(chunk(2, 20))
        );
        assert!(!store.has_chunk_by_plaintext_keyed_hash(&[3; 32]).unwrap());
        assert_eq!(store.indexed_chunks(), 2);
    }

    #[test]
    fn insert_chunk_returns_canonical() {
        let store = MemoryInodeStore::new();
        assert_eq!(store.insert_chunk(chunk(5, 1)).unwrap(), chunk(5, 1));
        assert_eq!(store.insert_chunk(chunk(5, 2)).unwrap(), chunk(5, 1));
    }

    #[test]
    fn snapshot_store_tracks_latest() {
        let store = MemorySnapshotStore::new();
        assert!(store.latest_snapshot().unwrap().is_none());

        let first = Snapshot::initial(ChunkingParams::default()).unwrap();
        let second = first.next(vec![vec![9; 32]]);
        store.put_snapshot(&second).unwrap();
        store.put_snapshot(&first).unwrap();

        assert_eq!(store.latest_snapshot().unwrap(), Some(second.clone()));
        assert_eq!(store.get_snapshot(0).unwrap(), first);
        assert!(store.put_snapshot(&second).is_ok(), "identical rewrite is allowed");
        assert!(matches!(
            store.put_snapshot(&first.next(Vec::new())),
            Err(StoreError::Conflict(_))
        ));
    }
}
