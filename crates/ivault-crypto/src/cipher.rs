//! AES-256-CBC encryption with an explicit IV
//!
//! Used for chunk bodies, inode paths and symlink targets. The IV is stored
//! next to the ciphertext by the caller; it is not prepended here.
//! Output length is the plaintext length rounded up to the next full block
//! (PKCS#7 always adds at least one byte of padding).

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::CryptoError;
use crate::secret::EncryptionKey;
use crate::IV_SIZE;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const BLOCK_SIZE: usize = 16;

/// Generate a random 128-bit IV.
pub fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

fn check_iv(iv: &[u8]) -> Result<(), CryptoError> {
    if iv.len() != IV_SIZE {
        return Err(CryptoError::InvalidIv {
            expected: IV_SIZE,
            actual: iv.len(),
        });
    }
    Ok(())
}

/// Encrypt `plaintext` under `key` with the given IV.
pub fn encrypt(key: &EncryptionKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv).map_err(|_| {
        CryptoError::InvalidIv {
            expected: IV_SIZE,
            actual: iv.len(),
        }
    })?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt `ciphertext` produced by [`encrypt`] with the same key and IV.
///
/// There is no authentication tag: a wrong key usually surfaces as a padding
/// error, but may also return garbage.
pub fn decrypt(key: &EncryptionKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_iv(iv)?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength(ciphertext.len()));
    }
    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv).map_err(|_| {
        CryptoError::InvalidIv {
            expected: IV_SIZE,
            actual: iv.len(),
        }
    })?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decrypt)
}
