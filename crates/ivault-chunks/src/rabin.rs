//! Rabin fingerprint content-defined chunking
//!
//! A 64-byte window slides over the stream one byte at a time. After each byte
//! the fingerprint of the window (a polynomial residue over GF(2)) is tested:
//! a boundary is cut once at least `min_chunksize` bytes have accumulated and
//! the low `avg_bits` bits of the fingerprint are all zero, or unconditionally
//! at `max_chunksize`. Boundaries depend only on nearby content, so an insert
//! near the start of a file leaves later boundaries where they were.

use ivault_core::ChunkingParams;

use crate::ChunkError;

/// Sliding window width in bytes.
pub const WINDOW_SIZE: usize = 64;

/// Position of one chunk inside an in-memory buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset within the source
    pub offset: u64,
    /// Chunk length in bytes
    pub length: usize,
}

/// Lookup tables derived from the polynomial.
#[derive(Clone)]
struct Tables {
    /// `out[b]` = fingerprint of `b` followed by WINDOW_SIZE-1 zero bytes;
    /// XOR-ing it removes `b` from the window.
    out: [u64; 256],
    /// `modulo[b]` reduces the 8 bits that overflow past the polynomial degree.
    modulo: [u64; 256],
}

fn deg(p: u64) -> i32 {
    63 - p.leading_zeros() as i32
}

fn poly_mod(mut x: u64, p: u64) -> u64 {
    let dp = deg(p);
    while deg(x) >= dp {
        x ^= p << (deg(x) - dp);
    }
    x
}

fn append_byte(hash: u64, b: u8, pol: u64) -> u64 {
    poly_mod((hash << 8) | b as u64, pol)
}

impl Tables {
    fn new(pol: u64) -> Self {
        let mut out = [0u64; 256];
        let mut modulo = [0u64; 256];
        let k = deg(pol);

        for b in 0..256usize {
            let mut hash = append_byte(0, b as u8, pol);
            for _ in 0..WINDOW_SIZE - 1 {
                hash = append_byte(hash, 0, pol);
            }
            out[b] = hash;

            let shifted = (b as u64) << k;
            modulo[b] = poly_mod(shifted, pol) | shifted;
        }

        Tables { out, modulo }
    }
}

/// Streaming Rabin chunker. Feed bytes with [`RabinChunker::push`].
#[derive(Clone)]
pub struct RabinChunker {
    tables: Tables,
    window: [u8; WINDOW_SIZE],
    wpos: usize,
    digest: u64,
    /// Bytes consumed since the last boundary
    count: u64,
    shift: u32,
    mask: u64,
    min_size: u64,
    max_size: u64,
}

impl std::fmt::Debug for RabinChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabinChunker")
            .field("digest", &format_args!("{:#x}", self.digest))
            .field("count", &self.count)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl RabinChunker {
    pub fn new(params: &ChunkingParams) -> Result<Self, ChunkError> {
        params.validate()?;

        let mut chunker = RabinChunker {
            tables: Tables::new(params.polynomial),
            window: [0; WINDOW_SIZE],
            wpos: 0,
            digest: 0,
            count: 0,
            shift: params.polynomial_shift,
            mask: params.mask(),
            min_size: params.min_chunksize as u64,
            max_size: params.max_chunksize as u64,
        };
        chunker.reset();
        Ok(chunker)
    }

    fn reset(&mut self) {
        self.window = [0; WINDOW_SIZE];
        self.wpos = 0;
        self.digest = 0;
        self.count = 0;
        self.slide(1);
    }

    fn slide(&mut self, b: u8) {
        let out = self.window[self.wpos];
        self.window[self.wpos] = b;
        self.digest ^= self.tables.out[out as usize];
        self.wpos = (self.wpos + 1) % WINDOW_SIZE;

        let index = (self.digest >> self.shift) as u8;
        self.digest = (self.digest << 8) | b as u64;
        self.digest ^= self.tables.modulo[index as usize];
    }

    /// Consume one byte. Returns `true` when a chunk ends with this byte; the
    /// chunker is then reset for the next chunk.
    pub fn push(&mut self, b: u8) -> bool {
        self.slide(b);
        self.count += 1;

        let cut = (self.count >= self.min_size && self.digest & self.mask == 0)
            || self.count >= self.max_size;
        if cut {
            self.reset();
        }
        cut
    }

    /// Bytes consumed since the last boundary.
    pub fn pending(&self) -> u64 {
        self.count
    }

    /// End of stream. Returns `true` if unflushed bytes remain (they form the
    /// final chunk) and resets the chunker.
    pub fn finish(&mut self) -> bool {
        let remaining = self.count != 0;
        self.reset();
        remaining
    }
}

/// Split `data` into content-defined chunks.
///
/// Returns an empty list for empty input.
pub fn chunk_data(data: &[u8], params: &ChunkingParams) -> Result<Vec<Chunk>, ChunkError> {
    let mut chunker = RabinChunker::new(params)?;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    for (i, &b) in data.iter().enumerate() {
        if chunker.push(b) {
            chunks.push(Chunk {
                offset: start as u64,
                length: i + 1 - start,
            });
            start = i + 1;
        }
    }

    if chunker.finish() {
        chunks.push(Chunk {
            offset: start as u64,
            length: data.len() - start,
        });
    }

    Ok(chunks)
}
