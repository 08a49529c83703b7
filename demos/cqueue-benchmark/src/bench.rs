mod channel;
mod ffi;
mod spsc;

use std::hint::black_box;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use cqueue::VariableCell;
use criterion::{Criterion, criterion_group, criterion_main};

/// Moves the given number of values from a producer thread to a consumer
/// thread and returns the time the consumer spent receiving them.
type BenchFn = fn(usize) -> Duration;

fn transfer(c: &mut Criterion) {
    macro_rules! benches {
        ($($name:ident),* $(,)?) => ([$((stringify!($name), self::$name::bench as BenchFn),)*]);
    }

    let mut g = c.benchmark_group("transfer");
    for (name, f) in benches![channel, ffi, spsc] {
        g.bench_function(name, |b| b.iter_custom(|iters| f(iters as usize)));
    }
    g.finish();

    let mut g = c.benchmark_group("transfer_queue_size");
    let sizes: [(usize, BenchFn); 4] = [
        (4, spsc::transfer::<4>),
        (64, spsc::transfer::<64>),
        (1024, spsc::transfer::<1024>),
        (16 << 10, spsc::transfer::<{ 16 << 10 }>),
    ];
    for (size, f) in sizes {
        let id = format!("spsc_{size:05}");
        g.bench_function(&id, |b| b.iter_custom(|iters| f(iters as usize)));
    }
    g.finish();
}

fn roundtrip(c: &mut Criterion) {
    let mut queue = cqueue::BoundedQueue::<i32>::new();
    let (mut tx, mut rx) = queue.split();
    c.bench_function("roundtrip_spsc", |b| {
        b.iter(|| {
            tx.enqueue(black_box(fastrand::i32(..))).unwrap();
            black_box(rx.dequeue())
        })
    });
}

fn variable_store(c: &mut Criterion) {
    let mut g = c.benchmark_group("variable_store");

    let cell = VariableCell::<i32>::new();
    g.bench_function("variable_cell", |b| {
        b.iter(|| {
            cell.set(black_box(fastrand::i32(1..=100)));
            black_box(cell.get())
        })
    });

    let atomic = AtomicI32::new(0);
    g.bench_function("atomic_i32", |b| {
        b.iter(|| {
            atomic.store(black_box(fastrand::i32(1..=100)), Ordering::Relaxed);
            black_box(atomic.load(Ordering::Relaxed))
        })
    });

    let store = cqueue::ffi::variable_store_new();
    g.bench_function("ffi_variable_store", |b| {
        b.iter(|| unsafe {
            cqueue::ffi::variable_store_set(store, black_box(fastrand::i32(1..=100)));
            black_box(cqueue::ffi::variable_store_get(store))
        })
    });
    unsafe { cqueue::ffi::variable_store_free(store) };

    g.finish();
}

criterion_group!(
    name = cqueue_benchmark;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = transfer, roundtrip, variable_store
);
criterion_main!(cqueue_benchmark);
