//! Ciphertext + IV container

use ivault_core::proto;
use ivault_crypto::{CryptoError, Secret};

/// Ciphertext paired with the IV it was encrypted under.
///
/// The default value (both empty) means "not set", e.g. the symlink target of
/// a regular file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EncryptedData {
    ciphertext: Vec<u8>,
    iv: Vec<u8>,
}

impl EncryptedData {
    /// Wrap an existing ciphertext (e.g. a decoded record).
    pub fn from_parts(ciphertext: Vec<u8>, iv: Vec<u8>) -> Self {
        Self { ciphertext, iv }
    }

    /// Encrypt `plaintext` under the secret's encryption key with a fresh IV.
    pub fn encrypt(secret: &Secret, plaintext: &[u8]) -> Result<Self, CryptoError> {
        Self::encrypt_with_iv(secret, plaintext, &ivault_crypto::random_iv())
    }

    /// Encrypt with a caller-chosen IV.
    pub fn encrypt_with_iv(
        secret: &Secret,
        plaintext: &[u8],
        iv: &[u8],
    ) -> Result<Self, CryptoError> {
        let ciphertext = ivault_crypto::encrypt(secret.encryption_key(), iv, plaintext)?;
        Ok(Self {
            ciphertext,
            iv: iv.to_vec(),
        })
    }

    pub fn decrypt(&self, secret: &Secret) -> Result<Vec<u8>, CryptoError> {
        ivault_crypto::decrypt(secret.encryption_key(), &self.iv, &self.ciphertext)
    }

    pub fn decrypt_to_string(&self, secret: &Secret) -> Result<String, CryptoError> {
        Ok(String::from_utf8(self.decrypt(secret)?)?)
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty() && self.iv.is_empty()
    }
}

impl From<&EncryptedData> for proto::EncryptedData {
    fn from(data: &EncryptedData) -> Self {
        proto::EncryptedData {
            ciphertext: data.ciphertext.clone(),
            iv: data.iv.clone(),
        }
    }
}

impl From<proto::EncryptedData> for EncryptedData {
    fn from(data: proto::EncryptedData) -> Self {
        Self::from_parts(data.ciphertext, data.iv)
    }
}
