//! ivault-chunks: content-defined chunking and BLAKE3 content hashing
//!
//! # Overview
//! - `hash`: BLAKE3 hashing (content identity)
//! - `rabin`: Rabin fingerprint chunker, fed one byte at a time
//! - `reader`: streams any `Read` through the chunker, one chunk buffer at a time

pub mod hash;
pub mod rabin;
pub mod reader;

pub use hash::{hash_bytes, Hash};
pub use rabin::{chunk_data, Chunk, RabinChunker};
pub use reader::ChunkReader;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("invalid chunking parameters: {0}")]
    InvalidParams(#[from] ivault_core::IvaultError),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunking interrupted")]
    Interrupted,
}
