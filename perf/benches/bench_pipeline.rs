use chirp_feed::Feed;
use chirp_perf::generate_request_corpus;
use chirp_server::{Mode, Server};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::io;
use std::num::NonZeroUsize;

const REQUESTS: usize = 2_000;

fn bench_full_run(c: &mut Criterion) {
    let corpus = generate_request_corpus(REQUESTS);

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(REQUESTS as u64));

    let mut modes = vec![Mode::Sequential];
    for n in [1usize, 4] {
        modes.push(Mode::Concurrent {
            consumers: NonZeroUsize::new(n).expect("non-zero"),
        });
    }

    for mode in modes {
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| {
                let server = Server::new(Feed::new(32).expect("valid reader cap"), mode);
                let summary = server
                    .run(black_box(corpus.as_bytes()), io::sink())
                    .expect("server run");
                black_box(summary);
            });
        });
    }
}

criterion_group!(benches, bench_full_run);
criterion_main!(benches);
