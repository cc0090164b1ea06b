use ivault_chunks::{chunk_data, hash_bytes, ChunkReader};
use ivault_core::ChunkingParams;

fn make_data(size: usize) -> Vec<u8> {
    // Semi-realistic data: repeating pattern with some entropy
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn bench_params() -> ChunkingParams {
    ChunkingParams {
        min_chunksize: 16 * 1024,
        max_chunksize: 256 * 1024,
        avg_bits: 15,
        ..Default::default()
    }
}

#[divan::bench(args = [1024, 65536, 1048576, 10485760])]
fn rabin_chunk(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    let params = bench_params();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| chunk_data(divan::black_box(&data), &params).unwrap());
}

#[divan::bench(args = [65536, 1048576, 10485760])]
fn rabin_stream(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    let params = bench_params();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            ChunkReader::new(divan::black_box(data.as_slice()), &params)
                .unwrap()
                .map(|c| c.unwrap().len())
                .sum::<usize>()
        });
}

#[divan::bench(args = [1024, 65536, 1048576, 10485760])]
fn blake3_hash(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| hash_bytes(divan::black_box(&data)));
}

fn main() {
    divan::main();
}
