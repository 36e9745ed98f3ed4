use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use smbstream::transport::memory::MemoryShare;
use smbstream::{SmbClient, StreamingOptions};
use std::hint::black_box;

const FILE_SIZE: usize = 16 * 1024 * 1024;

fn setup() -> SmbClient {
    let share = MemoryShare::new("bench", "media");
    share.add_file("/movie.mkv", vec![0xABu8; FILE_SIZE]);
    SmbClient::with_connector(share)
}

/// Scrubbing: fixed-size range reads at scattered offsets
fn bench_range_reads(c: &mut Criterion) {
    let client = setup();
    let conn = client.connect("bench", "media", "", "").unwrap();
    let session = client.open_for_streaming(conn, "/movie.mkv").unwrap();

    let mut group = c.benchmark_group("range_read");
    for size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        let mut buf = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut offset = 0u64;
            b.iter(|| {
                let start = offset % (FILE_SIZE - size) as u64;
                let n = client
                    .read_range(session, &mut buf, start, start + size as u64)
                    .unwrap();
                offset = offset.wrapping_add(7_919 * 4096);
                black_box(n)
            });
        });
    }
    group.finish();
}

/// Sequential playback of a whole range in chunk-size steps
fn bench_exact_range(c: &mut Criterion) {
    let client = setup();
    let conn = client.connect("bench", "media", "", "").unwrap();
    let session = client.open_for_streaming(conn, "/movie.mkv").unwrap();

    let mut group = c.benchmark_group("exact_range");
    group.throughput(Throughput::Bytes(4 * 1024 * 1024));
    for chunk in [64 * 1024, 512 * 1024] {
        client
            .set_streaming_options(session, StreamingOptions::new(chunk, 4 * 1024 * 1024, true))
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, _| {
            b.iter(|| black_box(client.read_exact_range(session, 0, 4 * 1024 * 1024).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_range_reads, bench_exact_range);
criterion_main!(benches);
