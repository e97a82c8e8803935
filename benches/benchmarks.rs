//! Benchmarks for Gleaner core operations

use std::sync::LazyLock;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use regex::Regex;
use rustc_hash::FxHashMap;

static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Generate sample paragraphs for benchmarking
fn generate_paragraphs(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "Paragraph number {} discussing retrieval, embeddings, vector \
                 search, and passage segmentation. Item {}.",
                i, i
            )
        })
        .collect()
}

/// Benchmark cosine similarity (core of vector search)
fn bench_cosine_similarity(c: &mut Criterion) {
    for dims in [768usize, 1536] {
        let a: Vec<f32> = (0..dims).map(|i| (i as f32) / 1000.0).collect();
        let b: Vec<f32> = (0..dims).map(|i| ((dims - i) as f32) / 1000.0).collect();

        c.bench_function(&format!("cosine_similarity_{}d", dims), |bencher| {
            bencher.iter(|| {
                let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                black_box(dot / (norm_a * norm_b))
            });
        });
    }
}

/// Benchmark masked mean pooling over a hidden-state matrix
fn bench_mean_pooling(c: &mut Criterion) {
    let tokens = 512;
    let hidden = 384;
    let states: Vec<Vec<f32>> = (0..tokens)
        .map(|t| (0..hidden).map(|h| ((t + h) as f32) / 1000.0).collect())
        .collect();
    let mask: Vec<i64> = (0..tokens).map(|t| if t < 400 { 1 } else { 0 }).collect();

    c.bench_function("masked_mean_pool_512x384", |bencher| {
        bencher.iter(|| {
            let mut pooled = vec![0.0f32; hidden];
            let mut count = 0usize;
            for (row, m) in states.iter().zip(mask.iter()) {
                if *m == 0 {
                    continue;
                }
                for (acc, v) in pooled.iter_mut().zip(row.iter()) {
                    *acc += v;
                }
                count += 1;
            }
            for acc in pooled.iter_mut() {
                *acc /= count as f32;
            }
            black_box(pooled)
        });
    });
}

/// Benchmark L2 normalization
fn bench_l2_normalize(c: &mut Criterion) {
    let dims = 1536;
    let vec: Vec<f32> = (0..dims).map(|i| (i as f32) / 1000.0).collect();

    c.bench_function("l2_normalize_1536d", |bencher| {
        bencher.iter(|| {
            let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
            let normalized: Vec<f32> = vec.iter().map(|x| x / norm).collect();
            black_box(normalized)
        });
    });
}

/// Benchmark blank-line block splitting
fn bench_block_split(c: &mut Criterion) {
    let text = generate_paragraphs(200).join("\n\n");

    c.bench_function("block_split_200_paragraphs", |bencher| {
        bencher.iter(|| {
            let blocks: Vec<&str> = BLOCK_BREAK.split(black_box(&text)).collect();
            black_box(blocks)
        });
    });
}

/// Benchmark small-paragraph merging
fn bench_paragraph_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("paragraph_merge");

    for size in [100usize, 1000] {
        let paragraphs: Vec<String> = (0..size).map(|i| format!("short paragraph {}", i)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let min_len = 100;
                let max_merged_len = 2048;
                let mut merged: Vec<String> = Vec::new();
                let mut acc = String::new();

                for paragraph in &paragraphs {
                    if !acc.is_empty() && acc.len() + paragraph.len() + 2 > max_merged_len {
                        merged.push(std::mem::take(&mut acc));
                    }
                    if !acc.is_empty() {
                        acc.push_str("\n\n");
                    }
                    acc.push_str(paragraph);
                    if acc.len() >= min_len {
                        merged.push(std::mem::take(&mut acc));
                    }
                }
                if !acc.is_empty() {
                    merged.push(acc);
                }
                black_box(merged)
            });
        });
    }
    group.finish();
}

/// Benchmark grouping scored hits by document
fn bench_group_by_document(c: &mut Criterion) {
    let hits: Vec<(String, f32)> = (0..1000)
        .map(|i| (format!("doc-{}", i % 50), 1.0 - (i as f32) / 1000.0))
        .collect();

    c.bench_function("group_1000_hits_50_docs", |bencher| {
        bencher.iter(|| {
            let mut best: FxHashMap<&str, f32> = FxHashMap::default();
            for (id, score) in &hits {
                let entry = best.entry(id.as_str()).or_insert(*score);
                if *score > *entry {
                    *entry = *score;
                }
            }
            let mut groups: Vec<(&str, f32)> = best.into_iter().collect();
            groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            groups.truncate(3);
            black_box(groups)
        });
    });
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_mean_pooling,
    bench_l2_normalize,
    bench_block_split,
    bench_paragraph_merge,
    bench_group_by_document,
);

criterion_main!(benches);
