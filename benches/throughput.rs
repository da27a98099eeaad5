//! Throughput Benchmark for EmberKV
//!
//! Measures the storage engine, the RESP parser and the full command path
//! under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use emberkv::commands::CommandHandler;
use emberkv::protocol::{RespParser, RespValue};
use emberkv::storage::{Entry, StorageEngine};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set_string(key, Bytes::from("small_value"));
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(64 * 1024)); // 64KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set_string(key, value.clone());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set_string(key, value);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get_string(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get_string(key.as_bytes()));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark list push/pop on one hot key
fn bench_lists(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());
    let key = Bytes::from("queue");

    let mut group = c.benchmark_group("list");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush_lpop", |b| {
        b.iter(|| {
            engine
                .rpush(key.clone(), vec![Bytes::from("job")])
                .unwrap();
            black_box(engine.lpop(&key).unwrap());
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set_string(key.clone(), Bytes::from("value"));
                            engine.get_string(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

/// Benchmark reads that hit expired keys
fn bench_expiry(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_expired", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set_entry(key.clone(), Entry::string("v").with_ttl(Duration::ZERO));
            black_box(engine.get_string(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark RESP parsing and full command dispatch
fn bench_protocol(c: &mut Criterion) {
    let parser = RespParser::new();
    let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
    let request = RespValue::command(["SET", "user:1000", "some moderately sized value"]).serialize();

    let mut group = c.benchmark_group("protocol");
    group.throughput(Throughput::Bytes(request.len() as u64));

    group.bench_function("parse_set", |b| {
        b.iter(|| black_box(parser.parse(black_box(&request)).unwrap()));
    });

    group.bench_function("parse_and_dispatch_set", |b| {
        b.iter(|| {
            let (command, _) = parser.parse(&request).unwrap().unwrap();
            black_box(handler.dispatch(command));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_lists,
    bench_concurrent,
    bench_expiry,
    bench_protocol,
);

criterion_main!(benches);
