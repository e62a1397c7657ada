//! Benchmarks for image loading.
//!
//! Measures the staged loader and the directory decoders over synthetic images:
//! - Full load of PE32 and PE32+ images (headers, sections, all decoders)
//! - Base relocation block decoding
//! - RVA translation through the section table

extern crate pescope;

#[path = "../src/test/builder.rs"]
#[allow(dead_code)]
mod builder;

use criterion::{criterion_group, criterion_main, Criterion};
use pescope::{directories::relocations::parse_blocks, Image};
use std::hint::black_box;

/// Benchmark a full load of the 32-bit sample image.
fn bench_load_pe32(c: &mut Criterion) {
    let data = builder::sample(false).build();

    c.bench_function("load_pe32", |b| {
        b.iter(|| {
            let image = Image::from_mem(black_box(data.clone())).unwrap();
            black_box(image)
        });
    });
}

/// Benchmark a full load of the 64-bit sample image.
fn bench_load_pe32_plus(c: &mut Criterion) {
    let data = builder::sample(true).build();

    c.bench_function("load_pe32_plus", |b| {
        b.iter(|| {
            let image = Image::from_mem(black_box(data.clone())).unwrap();
            black_box(image)
        });
    });
}

/// Benchmark decoding a run of full relocation blocks.
fn bench_relocation_blocks(c: &mut Criterion) {
    // 64 pages, 256 HighLow entries each
    let mut data = Vec::new();
    for page in 0..64u32 {
        data.extend_from_slice(&(0x1000 * page).to_le_bytes());
        data.extend_from_slice(&(8u32 + 256 * 2).to_le_bytes());
        for entry in 0..256u16 {
            data.extend_from_slice(&((3u16 << 12) | (entry * 16)).to_le_bytes());
        }
    }

    c.bench_function("relocation_blocks", |b| {
        b.iter(|| {
            let blocks = parse_blocks(black_box(&data), 0).unwrap();
            black_box(blocks)
        });
    });
}

/// Benchmark RVA to file offset translation.
fn bench_rva_to_offset(c: &mut Criterion) {
    let image = Image::from_mem(builder::sample(true).build()).unwrap();
    let space = image.address_space();

    c.bench_function("rva_to_offset", |b| {
        b.iter(|| {
            let offset = space
                .rva_to_offset(black_box(0x2080), "benchmark")
                .unwrap();
            black_box(offset)
        });
    });
}

criterion_group!(
    benches,
    bench_load_pe32,
    bench_load_pe32_plus,
    bench_relocation_blocks,
    bench_rva_to_offset
);
criterion_main!(benches);
