//! Tree secret and the keys derived from it

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::{KEYED_HASH_SIZE, KEY_SIZE};

const ENCRYPTION_KEY_INFO: &[u8] = b"ivault-encryption";

/// The 256-bit secret shared by everyone who may read a synchronized tree.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct Secret {
    bytes: [u8; KEY_SIZE],
    encryption_key: EncryptionKey,
}

impl Secret {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Result<Self, CryptoError> {
        let encryption_key = EncryptionKey::derive(&bytes)?;
        Ok(Self {
            bytes,
            encryption_key,
        })
    }

    /// Generate a fresh random secret for a new tree.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = Self::from_bytes(bytes);
        bytes.zeroize();
        secret
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Key used for chunk and path encryption and for the plaintext-keyed hash.
    pub fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 256-bit key derived from a [`Secret`]. Zeroized on drop.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// HKDF-SHA256 expansion of the secret with a domain-specific info string.
    fn derive(ikm: &[u8; KEY_SIZE]) -> Result<Self, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(None, ikm);
        let mut okm = [0u8; KEY_SIZE];
        hkdf.expand(ENCRYPTION_KEY_INFO, &mut okm)
            .map_err(|e| CryptoError::Kdf(format!("HKDF expand failed: {e}")))?;
        Ok(Self { bytes: okm })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Keyed BLAKE3 of `data`.
    ///
    /// Equal plaintexts under the same key give equal digests, but the digest
    /// reveals nothing to a party without the key.
    pub fn keyed_hash(&self, data: &[u8]) -> [u8; KEYED_HASH_SIZE] {
        *blake3::keyed_hash(&self.bytes, data).as_bytes()
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
