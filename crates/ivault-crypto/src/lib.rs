//! ivault-crypto: client-side encryption for ivault snapshots
//!
//! Every synchronized tree has one [`Secret`]. Everything else is derived:
//! ```text
//! Secret (256-bit, random or Argon2id from passphrase)
//!   └── Encryption Key (HKDF-SHA256, domain="ivault-encryption")
//!       ├── Chunk / path cipher: AES-256-CBC, PKCS#7, random 128-bit IV per object
//!       └── Plaintext-keyed hash: BLAKE3 keyed mode (dedup identity)
//! ```
//!
//! The cipher carries no authentication tag. Integrity of stored chunks is
//! checked through the ciphertext hash and the plaintext-keyed hash instead.

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod secret;

pub use cipher::{decrypt, encrypt, random_iv};
pub use error::CryptoError;
pub use kdf::{derive_secret, KdfParams};
pub use secret::{EncryptionKey, Secret};

/// Size of a secret and of every derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-CBC initialization vector (one AES block)
pub const IV_SIZE: usize = 16;

/// Size of a keyed BLAKE3 digest
pub const KEYED_HASH_SIZE: usize = 32;
