//! Pool allocator against the system allocator
//!
//! Small blocks should come from buckets far cheaper than from `malloc`;
//! large blocks only add a size check on top of it.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nebula_stl::allocator::{PoolAllocator, PoolConfig};
use std::alloc::Layout;
use std::hint::black_box;

/// Benchmark single allocation/deallocation cycle
fn bench_single_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_allocation");

    group.bench_function("pool_32b", |b| {
        let pool = PoolAllocator::with_config(PoolConfig::production()).unwrap();

        b.iter(|| unsafe {
            let ptr = pool.allocate(32);
            pool.deallocate(ptr, 32);
            black_box(ptr);
        });
    });

    // System allocator (baseline)
    group.bench_function("system_32b", |b| {
        let layout = Layout::from_size_align(32, 8).unwrap();

        b.iter(|| unsafe {
            let ptr = std::alloc::alloc(layout);
            std::alloc::dealloc(ptr, layout);
            black_box(ptr);
        });
    });

    group.finish();
}

/// Benchmark holding many blocks live, then releasing them
fn bench_batch_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_allocations");
    group.throughput(Throughput::Elements(1000));

    for size in [8usize, 24, 64, 128] {
        group.bench_with_input(BenchmarkId::new("pool", size), &size, |b, &size| {
            let pool = PoolAllocator::with_config(PoolConfig::performance()).unwrap();
            let mut ptrs = Vec::with_capacity(1000);

            b.iter(|| unsafe {
                for _ in 0..1000 {
                    ptrs.push(pool.allocate(size));
                }
                for ptr in ptrs.drain(..).rev() {
                    pool.deallocate(ptr, size);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("system", size), &size, |b, &size| {
            let layout = Layout::from_size_align(size, 8).unwrap();
            let mut ptrs = Vec::with_capacity(1000);

            b.iter(|| unsafe {
                for _ in 0..1000 {
                    ptrs.push(std::alloc::alloc(layout));
                }
                for ptr in ptrs.drain(..).rev() {
                    std::alloc::dealloc(ptr, layout);
                }
            });
        });
    }

    group.finish();
}

/// Benchmark growing a block through several size classes
fn bench_reallocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("reallocation");

    group.bench_function("pool_8_to_256", |b| {
        let pool = PoolAllocator::with_config(PoolConfig::production()).unwrap();

        b.iter(|| unsafe {
            let mut ptr = pool.allocate(8);
            let mut size = 8;
            while size < 256 {
                ptr = pool.reallocate(ptr, size, size * 2);
                size *= 2;
            }
            pool.deallocate(black_box(ptr), size);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_allocation,
    bench_batch_allocations,
    bench_reallocation
);

criterion_main!(benches);
