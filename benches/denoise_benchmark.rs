#![cfg(not(target_arch = "wasm32"))]
//! Criterion benchmarks for the block filters.
//!
//! Run with: cargo bench --bench denoise_benchmark
//! Run with native: RUSTFLAGS="-C target-cpu=native" cargo bench --bench denoise_benchmark

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use zendenoise::{DenoiseStrength, FilterKernels, PixelBlock, PixelBlockMut};

/// Deterministic source block and a prediction within ±8 of it.
fn make_blocks() -> ([u8; 256], [u8; 256]) {
    let mut state = 0x1234_5678u32;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    let mut sig = [0u8; 256];
    let mut mc = [0u8; 256];
    for i in 0..256 {
        sig[i] = next() as u8;
        let offset = (next() % 17) as i32 - 8;
        mc[i] = (i32::from(sig[i]) + offset).clamp(0, 255) as u8;
    }
    (sig, mc)
}

fn bench_filters(c: &mut Criterion) {
    let (sig, mc) = make_blocks();
    let mut group = c.benchmark_group("denoise");
    group.throughput(Throughput::Bytes(256));

    for (name, kernels) in [
        ("scalar", FilterKernels::SCALAR),
        ("accelerated", FilterKernels::ACCELERATED),
    ] {
        group.bench_with_input(BenchmarkId::new("luma", name), &kernels, |b, kernels| {
            let mut out = [0u8; 256];
            b.iter(|| {
                let mut s = sig;
                (kernels.luma)(
                    &PixelBlock::new(&mc, 16, 16, 16).unwrap(),
                    &mut PixelBlockMut::new(&mut out, 16, 16, 16).unwrap(),
                    &mut PixelBlockMut::new(&mut s, 16, 16, 16).unwrap(),
                    black_box(4),
                    DenoiseStrength::Normal,
                );
                black_box(&s);
            })
        });

        group.bench_with_input(BenchmarkId::new("chroma", name), &kernels, |b, kernels| {
            let mut out = [0u8; 256];
            b.iter(|| {
                let mut s = sig;
                (kernels.chroma)(
                    &PixelBlock::new(&mc, 8, 8, 16).unwrap(),
                    &mut PixelBlockMut::new(&mut out, 8, 8, 16).unwrap(),
                    &mut PixelBlockMut::new(&mut s, 8, 8, 16).unwrap(),
                    black_box(4),
                    DenoiseStrength::Increased,
                );
                black_box(&s);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filters);
criterion_main!(benches);
