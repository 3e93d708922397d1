use chirp_perf::make_test_request;
use chirp_sync::LockFreeQueue;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::thread;

fn bench_push_pop(c: &mut Criterion) {
    let queue = LockFreeQueue::new();
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push+pop (uncontended)", |b| {
        b.iter(|| {
            queue.push(black_box(7u64));
            black_box(queue.pop());
        });
    });

    group.bench_function("pop (empty)", |b| {
        b.iter(|| black_box(queue.pop()));
    });

    group.bench_function("push+pop request", |b| {
        b.iter(|| {
            queue.push(make_test_request(1));
            black_box(queue.pop());
        });
    });
}

fn bench_contended(c: &mut Criterion) {
    const ITEMS: u64 = 10_000;
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(ITEMS));

    for threads in [2usize, 4] {
        group.bench_function(format!("mpmc {threads}x{threads}"), |b| {
            b.iter(|| {
                let queue = LockFreeQueue::new();
                let per_producer = ITEMS / threads as u64;
                thread::scope(|s| {
                    let queue = &queue;
                    for _ in 0..threads {
                        s.spawn(move || {
                            for i in 0..per_producer {
                                queue.push(i);
                            }
                        });
                        s.spawn(move || {
                            let mut got = 0;
                            while got < per_producer {
                                if queue.pop().is_some() {
                                    got += 1;
                                } else {
                                    std::hint::spin_loop();
                                }
                            }
                        });
                    }
                });
            });
        });
    }
}

criterion_group!(benches, bench_push_pop, bench_contended);
criterion_main!(benches);
