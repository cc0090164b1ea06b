use serde::{Deserialize, Serialize};

use crate::error::{IvaultError, IvaultResult};

/// Rabin chunking parameters shared by every scan of a synchronized tree.
///
/// Changing any of these after the first snapshot breaks dedup continuity:
/// identical content would be cut at different boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingParams {
    /// Hard upper bound on a chunk's plaintext length
    pub max_chunksize: u32,
    /// No boundary is emitted before this many bytes
    pub min_chunksize: u32,
    /// Irreducible polynomial for the rolling fingerprint
    pub polynomial: u64,
    /// Degree of `polynomial`
    pub polynomial_degree: u32,
    /// Shift extracting the top byte of the fingerprint (degree - 8)
    pub polynomial_shift: u32,
    /// A boundary is cut when the low `avg_bits` bits of the fingerprint are zero
    pub avg_bits: u32,
}

impl ChunkingParams {
    pub const DEFAULT_POLYNOMIAL: u64 = 0x3DA3_358B_4DC1_73;

    /// Mask applied to the fingerprint when looking for a boundary.
    pub fn mask(&self) -> u64 {
        (1u64 << self.avg_bits) - 1
    }

    /// Check the parameters for internal consistency.
    pub fn validate(&self) -> IvaultResult<()> {
        if self.max_chunksize == 0 {
            return Err(IvaultError::InvalidParams("max_chunksize is zero".into()));
        }
        if self.min_chunksize > self.max_chunksize {
            return Err(IvaultError::InvalidParams(format!(
                "min_chunksize {} exceeds max_chunksize {}",
                self.min_chunksize, self.max_chunksize
            )));
        }
        if self.avg_bits >= 64 {
            return Err(IvaultError::InvalidParams(format!(
                "avg_bits {} must be below 64",
                self.avg_bits
            )));
        }
        if !(8..=56).contains(&self.polynomial_degree) {
            return Err(IvaultError::InvalidParams(format!(
                "polynomial_degree {} outside 8..=56",
                self.polynomial_degree
            )));
        }
        let actual = 63 - self.polynomial.leading_zeros() as i64;
        if self.polynomial == 0 || actual != self.polynomial_degree as i64 {
            return Err(IvaultError::InvalidParams(format!(
                "polynomial {:#x} does not have degree {}",
                self.polynomial, self.polynomial_degree
            )));
        }
        if self.polynomial_shift != self.polynomial_degree - 8 {
            return Err(IvaultError::InvalidParams(format!(
                "polynomial_shift {} must equal polynomial_degree - 8 ({})",
                self.polynomial_shift,
                self.polynomial_degree - 8
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            max_chunksize: 8 * 1024 * 1024, // 8 MiB
            min_chunksize: 1024 * 1024,     // 1 MiB
            polynomial: Self::DEFAULT_POLYNOMIAL,
            polynomial_degree: 53,
            polynomial_shift: 53 - 8,
            avg_bits: 20,
        }
    }
}
