//! Single-entry scanner: one path in, one encrypted [`Inode`] out
//!
//! Flow: classify → DELETED (path + timestamp only) | DIRECTORY (attributes)
//! | SYMLINK (attributes, encrypted normalized target) | FILE (attributes,
//! chunked + deduplicated + encrypted content). Any failure aborts the whole
//! scan; no partially built inode is ever returned.
//!
//! Chunk policy, per plaintext chunk `p`:
//! 1. `k = keyed_hash(p)`
//! 2. reuse the chunk already produced for `k` earlier in this file, else
//! 3. reuse the inode store's chunk for `k`, else
//! 4. encrypt under a fresh IV, write the ciphertext to the chunk store, then
//!    register it with `insert_chunk`; a chunk registered concurrently by
//!    another scan wins and our stored body is left unreferenced.
//!
//! The body is always stored before it is indexed, so every indexed keyed
//! hash can be restored, also after a failed and retried scan.
//!
//! Each keyed hash is therefore encrypted at most once per tree, and equal
//! keyed hashes always map to the same ciphertext hash, IV and size.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ivault_chunks::ChunkReader;
use ivault_core::ChunkingParams;
use ivault_crypto::{CryptoError, Secret};
use ivault_snapshot::{
    ChunkInfo, ChunkStore, EncryptedData, Inode, InodeStore, InodeType, Snapshot, StoreError,
    Timestamp,
};
use tracing::{debug, info};

use crate::attrs::{default_collector, AttributeCollector};
use crate::classify::classify;
use crate::error::ScanError;
use crate::normalize::normalize_path;

/// Cooperative cancellation flag for one scan. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct InodeScanner {
    path: PathBuf,
    root: PathBuf,
    secret: Secret,
    chunking: ChunkingParams,
    inode_store: Arc<dyn InodeStore>,
    chunk_store: Arc<dyn ChunkStore>,
    attributes: Arc<dyn AttributeCollector>,
    cancel: CancelHandle,
}

impl InodeScanner {
    /// Bind a scanner to `path` below the sync `root`, chunking with the
    /// parameters of `snapshot`. New ciphertext goes to `chunk_store`.
    pub fn new(
        path: impl Into<PathBuf>,
        secret: Secret,
        root: impl Into<PathBuf>,
        snapshot: &Snapshot,
        inode_store: Arc<dyn InodeStore>,
        chunk_store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
            secret,
            chunking: *snapshot.chunking(),
            inode_store,
            chunk_store,
            attributes: default_collector(),
            cancel: CancelHandle::new(),
        }
    }

    /// Share `cancel` with other holders, e.g. every scan of one snapshot.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_attribute_collector(mut self, collector: Arc<dyn AttributeCollector>) -> Self {
        self.attributes = collector;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation; a scan in progress fails with `ScanAborted`.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scan(&self) -> Result<Inode, ScanError> {
        let started = Instant::now();
        self.check_cancelled()?;

        let normalized = normalize_path(&self.path, &self.root);
        let encrypted_path =
            EncryptedData::encrypt(&self.secret, normalized.as_bytes()).map_err(|e| self.crypto(e))?;
        let inode_type = classify(&self.path)?;

        let mut builder = Inode::builder(inode_type, encrypted_path).timestamp(Timestamp::now());

        if inode_type != InodeType::Deleted {
            let attrs = self
                .attributes
                .collect(&self.path)
                .map_err(|source| ScanError::AttributeReadFailure {
                    path: self.path.clone(),
                    source,
                })?;
            builder = builder
                .mtime(attrs.mtime)
                .attributes(attrs.platform)
                .mtime_granularity(self.attributes.mtime_granularity(&self.path));
        }

        match inode_type {
            InodeType::Symlink => {
                let target = std::fs::read_link(&self.path).map_err(|e| self.io(e))?;
                let target = normalize_path(&target, &self.root);
                let encrypted = EncryptedData::encrypt(&self.secret, target.as_bytes())
                    .map_err(|e| self.crypto(e))?;
                builder = builder.symlink_target(encrypted);
            }
            InodeType::File => {
                builder = builder.chunks(self.chunk_file()?);
            }
            InodeType::Directory | InodeType::Deleted => {}
        }

        let inode = builder.build().map_err(|source| ScanError::Inode {
            path: self.path.clone(),
            source,
        })?;
        self.check_cancelled()?;

        info!(
            path = %self.path.display(),
            kind = %inode_type,
            chunks = inode.chunks().len(),
            bytes = inode.file_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scanned entry"
        );
        Ok(inode)
    }

    fn chunk_file(&self) -> Result<Vec<ChunkInfo>, ScanError> {
        let file = File::open(&self.path).map_err(|e| self.io(e))?;
        let mut reader = ChunkReader::new(file, &self.chunking)
            .map_err(|e| ScanError::from_chunking(&self.path, e))?;

        let mut seen: HashMap<Vec<u8>, ChunkInfo> = HashMap::new();
        let mut chunks = Vec::new();
        while let Some(plaintext) = reader
            .next_chunk_with(|| self.cancel.is_cancelled())
            .map_err(|e| ScanError::from_chunking(&self.path, e))?
        {
            let chunk = self.populate_chunk(&plaintext, &seen)?;
            seen.entry(chunk.plaintext_keyed_hash().to_vec())
                .or_insert_with(|| chunk.clone());
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    fn populate_chunk(
        &self,
        plaintext: &[u8],
        seen: &HashMap<Vec<u8>, ChunkInfo>,
    ) -> Result<ChunkInfo, ScanError> {
        let key = self.secret.encryption_key();
        let keyed_hash = key.keyed_hash(plaintext);

        if let Some(chunk) = seen.get(keyed_hash.as_slice()) {
            debug!(path = %self.path.display(), size = plaintext.len(), "chunk repeats within file");
            return Ok(chunk.clone());
        }

        if let Some(chunk) = self
            .inode_store
            .get_chunk_by_plaintext_keyed_hash(&keyed_hash)
            .map_err(|e| self.storage(e))?
        {
            debug!(path = %self.path.display(), size = plaintext.len(), "chunk already stored");
            return Ok(chunk);
        }

        let iv = ivault_crypto::random_iv();
        let ciphertext = ivault_crypto::encrypt(key, &iv, plaintext).map_err(|e| self.crypto(e))?;
        let ciphertext_hash = ivault_chunks::hash_bytes(&ciphertext).as_bytes().to_vec();
        let fresh = ChunkInfo::new(
            ciphertext_hash,
            plaintext.len() as u64,
            iv.to_vec(),
            keyed_hash.to_vec(),
        );

        self.chunk_store
            .put_chunk(fresh.ciphertext_hash(), &ciphertext)
            .map_err(|e| self.storage(e))?;
        let canonical = self
            .inode_store
            .insert_chunk(fresh.clone())
            .map_err(|e| self.storage(e))?;
        if canonical != fresh {
            debug!(
                path = %self.path.display(),
                size = plaintext.len(),
                "chunk registered concurrently, using the registered one"
            );
            return Ok(canonical);
        }

        debug!(path = %self.path.display(), size = plaintext.len(), "encrypted new chunk");
        Ok(canonical)
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            return Err(ScanError::ScanAborted {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn io(&self, source: std::io::Error) -> ScanError {
        ScanError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn crypto(&self, source: CryptoError) -> ScanError {
        ScanError::Crypto {
            path: self.path.clone(),
            source,
        }
    }

    fn storage(&self, source: StoreError) -> ScanError {
        ScanError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}
