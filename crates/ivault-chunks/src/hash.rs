//! BLAKE3 content hashing
//!
//! The ciphertext hash of a chunk is its content-addressing key in the chunk
//! store; inode records are identified the same way.

/// A BLAKE3 hash digest (32 bytes), displayed as 64 hex chars
pub type Hash = blake3::Hash;

/// Hash a byte slice in memory.
pub fn hash_bytes(data: &[u8]) -> Hash {
    blake3::hash(data)
}
