//! Streaming chunk reader
//!
//! Pulls bytes from any `Read` through a buffered reader and hands them to the
//! chunker one at a time. Only the chunk currently being accumulated is held
//! in memory; completed chunks are returned to the caller as owned buffers.

use std::io::{BufRead, BufReader, Read};

use ivault_core::ChunkingParams;
use tracing::trace;

use crate::rabin::RabinChunker;
use crate::ChunkError;

pub struct ChunkReader<R> {
    reader: BufReader<R>,
    chunker: RabinChunker,
    buffer: Vec<u8>,
    reserve: usize,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R, params: &ChunkingParams) -> Result<Self, ChunkError> {
        let chunker = RabinChunker::new(params)?;
        // Expected chunk length is min + 2^avg_bits; cap the up-front allocation
        let reserve = (params.min_chunksize as usize).min(1024 * 1024);
        Ok(ChunkReader {
            reader: BufReader::with_capacity(64 * 1024, reader),
            chunker,
            buffer: Vec::with_capacity(reserve),
            reserve,
            done: false,
        })
    }

    /// Read until the next boundary (or end of stream) and return that chunk.
    ///
    /// `interrupted` is polled before every byte; when it returns `true` the
    /// read stops with [`ChunkError::Interrupted`] and the partial buffer is
    /// discarded. Returns `Ok(None)` once the stream is exhausted.
    pub fn next_chunk_with<F>(&mut self, mut interrupted: F) -> Result<Option<Vec<u8>>, ChunkError>
    where
        F: FnMut() -> bool,
    {
        if self.done {
            return Ok(None);
        }

        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if available.is_empty() {
                self.done = true;
                if interrupted() {
                    return Err(ChunkError::Interrupted);
                }
                if self.chunker.finish() {
                    trace!(len = self.buffer.len(), "final chunk at end of stream");
                    return Ok(Some(std::mem::take(&mut self.buffer)));
                }
                return Ok(None);
            }

            let mut consumed = 0;
            let mut boundary = false;
            let mut stopped = false;
            for &b in available {
                if interrupted() {
                    stopped = true;
                    break;
                }
                self.buffer.push(b);
                consumed += 1;
                if self.chunker.push(b) {
                    boundary = true;
                    break;
                }
            }
            self.reader.consume(consumed);

            if stopped {
                self.done = true;
                trace!(discarded = self.buffer.len(), "chunking interrupted");
                self.buffer.clear();
                return Err(ChunkError::Interrupted);
            }
            if boundary {
                let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.reserve));
                trace!(len = chunk.len(), "chunk boundary");
                return Ok(Some(chunk));
            }
        }
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Vec<u8>, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk_with(|| false).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rabin::chunk_data;
    use std::cell::Cell;

    fn small_params() -> ChunkingParams {
        ChunkingParams {
            min_chunksize: 128,
            max_chunksize: 2048,
            avg_bits: 8,
            ..Default::default()
        }
    }

    fn make_data(size: usize) -> Vec<u8> {
        (0..size)
            .map(|i| (i.wrapping_mul(31) ^ (i >> 4) ^ (i >> 9)) as u8)
            .collect()
    }

    #[test]
    fn stream_matches_in_memory_chunking() {
        let data = make_data(100_000);
        let params = small_params();

        let streamed: Vec<Vec<u8>> = ChunkReader::new(data.as_slice(), &params)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let expected: Vec<Vec<u8>> = chunk_data(&data, &params)
            .unwrap()
            .iter()
            .map(|c| data[c.offset as usize..c.offset as usize + c.length].to_vec())
            .collect();

        assert!(expected.len() > 1);
        assert_eq!(streamed, expected);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut reader = ChunkReader::new(&[][..], &small_params()).unwrap();
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn interruption_stops_mid_chunk() {
        let data = make_data(10_000);
        let mut reader = ChunkReader::new(data.as_slice(), &small_params()).unwrap();

        let polls = Cell::new(0u32);
        let result = reader.next_chunk_with(|| {
            polls.set(polls.get() + 1);
            polls.get() > 50
        });

        assert!(matches!(result, Err(ChunkError::Interrupted)));
        assert!(reader.next().is_none(), "reader is finished after interruption");
    }

    #[test]
    fn interruption_at_end_of_stream() {
        let data = make_data(64);
        let mut reader = ChunkReader::new(data.as_slice(), &small_params()).unwrap();
        let mut bytes_seen = 0;
        let result = reader.next_chunk_with(|| {
            bytes_seen += 1;
            bytes_seen > 64
        });
        assert!(matches!(result, Err(ChunkError::Interrupted)));
    }
}
