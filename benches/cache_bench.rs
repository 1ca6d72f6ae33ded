use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pktcache::{CacheConfig, CacheRegistry, HeapAllocator, Packet};
use std::{sync::Arc, thread};

fn manual(name: &str, size: usize) -> CacheConfig {
    CacheConfig::new(name, size).with_trim_interval(None)
}

fn benchmark_hit_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("CacheHit");
    let registry = CacheRegistry::new();

    for size in [256usize, 1536, 9216].iter() {
        let cache = registry.create(manual("bench-hit", *size)).unwrap();
        cache.prewarm(1).unwrap();

        group.bench_with_input(BenchmarkId::new("acquire_release", size), size, |b, _| {
            b.iter(|| {
                let packet = cache.acquire().unwrap();
                black_box(packet.capacity());
                packet.release()
            });
        });
    }

    group.finish();
}

fn benchmark_miss_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("CacheMiss");
    let registry = CacheRegistry::new();

    for size in [256usize, 1536, 9216].iter() {
        let cache = registry.create(manual("bench-miss", *size)).unwrap();

        group.bench_with_input(BenchmarkId::new("acquire_free", size), size, |b, _| {
            b.iter(|| {
                // detached packets bypass the free list, so every acquire misses
                let mut packet = cache.acquire().unwrap();
                packet.detach();
                black_box(packet.release())
            });
        });
    }

    group.finish();
}

fn benchmark_vec_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("VecBaseline");

    for size in [256usize, 1536, 9216].iter() {
        group.bench_with_input(BenchmarkId::new("alloc_free", size), size, |b, &size| {
            b.iter(|| {
                let buffer = vec![0u8; size];
                black_box(buffer.len())
            });
        });
    }

    group.finish();
}

fn benchmark_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("Burst");
    let allocator = Arc::new(HeapAllocator::new());
    let registry = CacheRegistry::with_allocator(allocator);
    let cache = registry.create(manual("bench-burst", 1536)).unwrap();

    for burst in [8usize, 64, 256].iter() {
        group.throughput(Throughput::Elements(*burst as u64));
        group.bench_with_input(BenchmarkId::new("acquire_burst", burst), burst, |b, &burst| {
            b.iter(|| {
                let packets: Vec<Packet> = (0..burst).map(|_| cache.acquire().unwrap()).collect();
                black_box(packets.len())
            });
        });
    }

    group.finish();
}

fn benchmark_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("Contended");
    let registry = CacheRegistry::new();
    let cache = Arc::new(registry.create(manual("bench-contended", 1536)).unwrap());

    for threads in [2usize, 4].iter() {
        group.bench_with_input(BenchmarkId::new("threads", threads), threads, |b, &threads| {
            b.iter(|| {
                let workers: Vec<_> = (0..threads)
                    .map(|_| {
                        let cache = Arc::clone(&cache);
                        thread::spawn(move || {
                            for _ in 0..1000 {
                                let packet = cache.acquire().unwrap();
                                black_box(packet.release());
                            }
                        })
                    })
                    .collect();
                for worker in workers {
                    worker.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_hit_path,
    benchmark_miss_path,
    benchmark_vec_baseline,
    benchmark_burst,
    benchmark_contended
);
criterion_main!(benches);
