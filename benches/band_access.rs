use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use rasterband::{Band, BandConfig, CompressedBand, CompressionMethod, Key, SliceSpec, Value};

const SIZE: (usize, usize) = (1024, 1024);

fn gradient() -> Array2<f32> {
    Array2::from_shape_fn(SIZE, |(r, c)| (r as f32 * 0.25).sin() + c as f32 * 0.01)
}

fn band(config: BandConfig) -> CompressedBand<f32> {
    CompressedBand::from_array(gradient().view(), config).unwrap()
}

// =============================================================================
// Benchmark: reads
// =============================================================================

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    let plain = band(BandConfig::default());
    let cached = band(BandConfig::default().with_chunk_cache(32));

    let window = Key::region(SliceSpec::range(100, 400), SliceSpec::range(200, 600));
    group.bench_function("window", |b| b.iter(|| plain.get(black_box(&window)).unwrap()));
    group.bench_function("window_cached", |b| {
        b.iter(|| cached.get(black_box(&window)).unwrap())
    });

    let strided = Key::region(SliceSpec::step(-4), SliceSpec::step(4));
    group.bench_function("strided", |b| b.iter(|| plain.get(black_box(&strided)).unwrap()));

    let cell = Key::cell(513, 771);
    group.bench_function("cell", |b| b.iter(|| plain.get(black_box(&cell)).unwrap()));
    group.bench_function("cell_cached", |b| b.iter(|| cached.get(black_box(&cell)).unwrap()));

    group.finish();
}

// =============================================================================
// Benchmark: writes
// =============================================================================

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    let key = Key::region(SliceSpec::range(250, 300), SliceSpec::range(250, 300));
    for (name, method) in [
        ("zstd", CompressionMethod::Zstd),
        ("deflate", CompressionMethod::Deflate),
        ("rle", CompressionMethod::Rle),
    ] {
        let mut target = band(BandConfig::default().with_compression(method));
        group.bench_function(name, |b| {
            b.iter(|| target.set(black_box(&key), Value::Scalar(1.5)).unwrap())
        });
    }

    let mut target = band(BandConfig::default());
    let mask = Key::Mask(Array2::from_shape_fn(SIZE, |(r, c)| (r + c) % 97 == 0));
    group.bench_function("mask", |b| {
        b.iter(|| target.set(black_box(&mask), Value::Scalar(0.0)).unwrap())
    });

    group.finish();
}

// =============================================================================
// Criterion harness
// =============================================================================

criterion_group!(benches, bench_read, bench_write);
criterion_main!(benches);
