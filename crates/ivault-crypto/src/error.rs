use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("IV must be {expected} bytes, got {actual}")]
    InvalidIv { expected: usize, actual: usize },

    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidCiphertextLength(usize),

    #[error("decryption failed: wrong key or corrupted ciphertext")]
    Decrypt,

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("decrypted data is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
