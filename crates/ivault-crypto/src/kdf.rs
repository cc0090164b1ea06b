//! Key derivation: Argon2id passphrase → tree secret

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::secret::Secret;
use crate::KEY_SIZE;

/// Argon2id parameters for KDF
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Derive a tree secret from a passphrase and salt using Argon2id.
///
/// The salt should be 16 random bytes stored next to the tree's snapshots;
/// it does not need to be secret.
pub fn derive_secret(
    passphrase: &SecretString,
    salt: &[u8; 16],
    params: &KdfParams,
) -> Result<Secret, CryptoError> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id failed: {e}")))?;

    let secret = Secret::from_bytes(key);
    key.zeroize();
    secret
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("correct horse battery staple");
        let salt = [1u8; 16];

        let s1 = derive_secret(&passphrase, &salt, &fast_params()).unwrap();
        let s2 = derive_secret(&passphrase, &salt, &fast_params()).unwrap();

        assert_eq!(s1.as_bytes(), s2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        let s1 = derive_secret(&passphrase, &[1u8; 16], &fast_params()).unwrap();
        let s2 = derive_secret(&passphrase, &[2u8; 16], &fast_params()).unwrap();

        assert_ne!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn test_kdf_rejects_bad_params() {
        let params = KdfParams {
            mem_cost_kib: 1,
            time_cost: 0,
            parallelism: 0,
        };
        let result = derive_secret(&SecretString::from("x"), &[0u8; 16], &params);
        assert!(matches!(result, Err(CryptoError::Kdf(_))));
    }
}
