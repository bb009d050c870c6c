//! Raw transport benchmarks: bucket ring and pipe flush throughput.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::hint::black_box;

// Layer 2: Third-party crate imports
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

// Layer 3: Internal module imports
use weft_rt::event::EventBucket;
use weft_rt::mailbox::{BucketRing, Mailbox};
use weft_rt::pipe::Pipe;
use weft_rt::util::{ActorId, CoreId};

#[derive(Clone, Copy)]
struct Sample {
    #[allow(dead_code)]
    value: u64,
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_ring");
    let batch: u64 = 1024;
    group.throughput(Throughput::Elements(batch));
    group.bench_function("enqueue_drain_1k_single_bucket", |b| {
        let ring = BucketRing::with_capacity(4096);
        let event = [EventBucket::zeroed()];
        let mut out = Vec::with_capacity(4096);
        b.iter(|| {
            for _ in 0..batch {
                unsafe { ring.try_enqueue(black_box(&event)).unwrap() };
            }
            let n = unsafe { ring.drain_into(&mut out) };
            assert_eq!(n as u64, batch);
        });
    });
    group.finish();
}

fn bench_pipe_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipe");
    let batch: u64 = 1024;
    group.throughput(Throughput::Elements(batch));
    group.bench_function("allocate_flush_1k", |b| {
        let mailbox = Mailbox::new(1, 4096);
        let dest = ActorId::new(CoreId::new(1), 10_000);
        let source = ActorId::new(CoreId::new(0), 10_000);
        let mut scratch = Vec::with_capacity(4096);
        b.iter(|| {
            let mut pipe = Pipe::new(CoreId::new(1));
            for value in 0..batch {
                pipe.allocate(Sample { value }, dest, source);
            }
            let report = unsafe { pipe.flush(&mailbox, 0) };
            assert!(!report.retry);
            unsafe { mailbox.drain(&mut scratch, |region| void_region(region)) };
        });
    });
    group.finish();
}

fn void_region(region: &mut [EventBucket]) {
    black_box(region.len());
}

criterion_group!(benches, bench_ring, bench_pipe_flush);
criterion_main!(benches);
