use ivault_core::proto;

/// Identity and recovery metadata for one encrypted chunk.
///
/// `ciphertext_hash` addresses the ciphertext in the chunk store;
/// `plaintext_keyed_hash` is the dedup key. `size` is the plaintext length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkInfo {
    ciphertext_hash: Vec<u8>,
    size: u64,
    iv: Vec<u8>,
    plaintext_keyed_hash: Vec<u8>,
}

impl ChunkInfo {
    pub fn new(
        ciphertext_hash: Vec<u8>,
        size: u64,
        iv: Vec<u8>,
        plaintext_keyed_hash: Vec<u8>,
    ) -> Self {
        Self {
            ciphertext_hash,
            size,
            iv,
            plaintext_keyed_hash,
        }
    }

    pub fn ciphertext_hash(&self) -> &[u8] {
        &self.ciphertext_hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn plaintext_keyed_hash(&self) -> &[u8] {
        &self.plaintext_keyed_hash
    }
}

impl From<&ChunkInfo> for proto::ChunkInfo {
    fn from(chunk: &ChunkInfo) -> Self {
        proto::ChunkInfo {
            ciphertext_hash: chunk.ciphertext_hash.clone(),
            size: chunk.size,
            iv: chunk.iv.clone(),
            plaintext_keyed_hash: chunk.plaintext_keyed_hash.clone(),
        }
    }
}

impl From<proto::ChunkInfo> for ChunkInfo {
    fn from(chunk: proto::ChunkInfo) -> Self {
        Self::new(
            chunk.ciphertext_hash,
            chunk.size,
            chunk.iv,
            chunk.plaintext_keyed_hash,
        )
    }
}
