//! Storage contracts used by scanners and the snapshot creator
//!
//! All stores are shared across concurrently running scans, so every
//! implementation is `Send + Sync` and synchronizes internally. Objects are
//! immutable once written: puts of an existing key keep the first value.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;
use tracing::debug;

use crate::chunk_info::ChunkInfo;
use crate::inode::{Inode, InodeError};
use crate::snapshot::Snapshot;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("corrupt object: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inode record: {0}")]
    Inode(#[from] InodeError),

    #[error("snapshot record: {0}")]
    Snapshot(#[from] ivault_core::IvaultError),
}

/// Encrypted chunk bodies, addressed by BLAKE3 of the ciphertext.
pub trait ChunkStore: Send + Sync {
    /// Store `ciphertext` under its hash. Storing an existing hash is a no-op.
    fn put_chunk(&self, ciphertext_hash: &[u8], ciphertext: &[u8]) -> StoreResult<()>;

    fn get_chunk(&self, ciphertext_hash: &[u8]) -> StoreResult<Vec<u8>>;

    fn has_chunk(&self, ciphertext_hash: &[u8]) -> StoreResult<bool>;
}

/// Inode records plus the plaintext-keyed-hash index over their chunks.
pub trait InodeStore: Send + Sync {
    /// Store `inode`, index its chunks, and return its hash.
    fn put_inode(&self, inode: &Inode) -> StoreResult<Vec<u8>>;

    fn get_inode(&self, inode_hash: &[u8]) -> StoreResult<Inode>;

    fn get_chunk_by_plaintext_keyed_hash(
        &self,
        plaintext_keyed_hash: &[u8],
    ) -> StoreResult<Option<ChunkInfo>>;

    fn has_chunk_by_plaintext_keyed_hash(&self, plaintext_keyed_hash: &[u8]) -> StoreResult<bool> {
        Ok(self
            .get_chunk_by_plaintext_keyed_hash(plaintext_keyed_hash)?
            .is_some())
    }

    /// Register `chunk` unless its keyed hash is already known.
    ///
    /// Returns the entry that is canonical afterwards: `chunk` itself if it was
    /// inserted, otherwise the one registered first.
    fn insert_chunk(&self, chunk: ChunkInfo) -> StoreResult<ChunkInfo>;
}

/// Snapshot records, addressed by revision.
pub trait SnapshotStore: Send + Sync {
    fn put_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()>;

    fn get_snapshot(&self, revision: i64) -> StoreResult<Snapshot>;

    /// The highest stored revision, if any.
    fn latest_snapshot(&self) -> StoreResult<Option<Snapshot>>;
}

/// Keyed-hash → ChunkInfo map with insert-if-absent semantics, shared by the
/// inode store implementations.
#[derive(Debug, Default)]
pub(crate) struct ChunkIndex {
    entries: RwLock<HashMap<Vec<u8>, ChunkInfo>>,
}

impl ChunkIndex {
    pub(crate) fn get(&self, plaintext_keyed_hash: &[u8]) -> Option<ChunkInfo> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(plaintext_keyed_hash)
            .cloned()
    }

    pub(crate) fn insert(&self, chunk: ChunkInfo) -> ChunkInfo {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let canonical = entries
            .entry(chunk.plaintext_keyed_hash().to_vec())
            .or_insert_with(|| chunk.clone());
        if canonical.ciphertext_hash() != chunk.ciphertext_hash() {
            debug!(
                keyed_hash = %hex::encode(chunk.plaintext_keyed_hash()),
                "keyed hash already registered, keeping first entry"
            );
        }
        canonical.clone()
    }

    pub(crate) fn index_inode(&self, inode: &Inode) {
        for chunk in inode.chunks() {
            self.insert(chunk.clone());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
