//! Rebuild a file's plaintext from its inode and the chunk store

use std::io::Write;

use ivault_crypto::{CryptoError, Secret};
use thiserror::Error;
use tracing::debug;

use crate::inode::{Inode, InodeType};
use crate::store::{ChunkStore, StoreError};

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("cannot restore content of a {0} inode")]
    NotAFile(InodeType),

    #[error("chunk {index}: ciphertext does not match its hash")]
    CiphertextHashMismatch { index: usize },

    #[error("chunk {index}: expected {expected} plaintext bytes, got {actual}")]
    SizeMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    #[error("chunk {index}: plaintext does not match its keyed hash")]
    KeyedHashMismatch { index: usize },

    #[error("chunk store: {0}")]
    Store(#[from] StoreError),

    #[error("decryption failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the plaintext of a FILE inode to `writer`, chunk by chunk.
///
/// Every chunk is checked against its ciphertext hash before decryption and
/// against its size and keyed hash after. Returns the number of bytes written.
pub fn restore_file<W: Write>(
    inode: &Inode,
    secret: &Secret,
    chunks: &dyn ChunkStore,
    mut writer: W,
) -> Result<u64, RestoreError> {
    if inode.inode_type() != InodeType::File {
        return Err(RestoreError::NotAFile(inode.inode_type()));
    }

    let key = secret.encryption_key();
    let mut written = 0u64;
    for (index, info) in inode.chunks().iter().enumerate() {
        let ciphertext = chunks.get_chunk(info.ciphertext_hash())?;
        if ivault_chunks::hash_bytes(&ciphertext).as_bytes().as_slice() != info.ciphertext_hash() {
            return Err(RestoreError::CiphertextHashMismatch { index });
        }

        let plaintext = ivault_crypto::decrypt(key, info.iv(), &ciphertext)?;
        if plaintext.len() as u64 != info.size() {
            return Err(RestoreError::SizeMismatch {
                index,
                expected: info.size(),
                actual: plaintext.len() as u64,
            });
        }
        if key.keyed_hash(&plaintext).as_slice() != info.plaintext_keyed_hash() {
            return Err(RestoreError::KeyedHashMismatch { index });
        }

        writer.write_all(&plaintext)?;
        written += info.size();
    }
    writer.flush()?;

    debug!(chunks = inode.chunks().len(), bytes = written, "restored file");
    Ok(written)
}
