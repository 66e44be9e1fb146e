//! Throughput Benchmark for kvadmin
//!
//! This benchmark measures the tokenizer and the in-memory store under
//! the workloads the shell generates.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kvadmin::protocol::{tokenize, Key, KeyPart};
use kvadmin::storage::{list_by_prefix, KvStore, StorageEngine};
use serde_json::json;
use std::time::Duration;

fn key(parts: &[&str]) -> Key {
    parts.iter().copied().collect()
}

/// Benchmark line tokenization
fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    group.throughput(Throughput::Elements(1));

    group.bench_function("plain", |b| {
        b.iter(|| tokenize(black_box("get users ada profile")));
    });

    group.bench_function("quoted_and_json", |b| {
        let line = r#"add users "Ada Lovelace" {"admin":true,"tags":["a","b"]}"#;
        b.iter(|| tokenize(black_box(line)));
    });

    group.finish();
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = StorageEngine::new();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0i64;
        b.iter(|| {
            let key: Key = vec![KeyPart::text("bench"), KeyPart::integer(i)].into_iter().collect();
            tokio_test::block_on(engine.set(key, json!("small_value"))).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_object", |b| {
        let mut i = 0i64;
        let value = json!({"name": "x".repeat(256), "tags": [1, 2, 3]});
        b.iter(|| {
            let key: Key = vec![KeyPart::text("bench"), KeyPart::integer(i)].into_iter().collect();
            tokio_test::block_on(engine.set(key, value.clone())).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark prefix scans
fn bench_scan(c: &mut Criterion) {
    let engine = StorageEngine::new();

    // Pre-populate two prefixes
    tokio_test::block_on(async {
        for i in 0..10_000 {
            let id = i.to_string();
            engine.set(key(&["users", &id]), json!(i)).await.unwrap();
            engine.set(key(&["orders", &id]), json!(i)).await.unwrap();
        }
    });

    let mut group = c.benchmark_group("scan");
    group.measurement_time(Duration::from_secs(5));

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("list_prefix_10k", |b| {
        b.iter(|| {
            let entries = tokio_test::block_on(list_by_prefix(&engine, key(&["users"])).collect()).unwrap();
            black_box(entries.len())
        });
    });

    group.throughput(Throughput::Elements(1));
    group.bench_function("get_hit", |b| {
        let k = key(&["orders", "5000"]);
        b.iter(|| tokio_test::block_on(engine.get(black_box(&k))).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_set, bench_scan);
criterion_main!(benches);
