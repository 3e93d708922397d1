use std::hint::black_box;
use std::io;
use std::num::NonZeroUsize;
use std::time::Instant;

use chirp_feed::Feed;
use chirp_perf::*;
use chirp_server::{Mode, Server};
use chirp_sync::{AdmissionPolicy, LockFreeQueue, RawBoundedRwLock};

const SAMPLER: Sampler = Sampler {
    batches: 2_000,
    batch_size: 256,
    warmup_batches: 50,
};
const PIPELINE_REQUESTS: usize = 50_000;

fn main() {
    let mut results: Vec<BenchResult> = Vec::new();

    section_header("Primitives (single thread)");
    print_table_header();
    section_queue(&mut results);
    section_lock(&mut results);

    section_header("Pipeline (full run, sink output)");
    let throughput = section_pipeline();

    let report = serde_json::json!({
        "results": results,
        "pipeline_requests": PIPELINE_REQUESTS,
        "pipeline_req_per_sec": throughput,
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("\n{text}"),
        Err(err) => eprintln!("failed to encode report: {err}"),
    }
}

fn record(results: &mut Vec<BenchResult>, r: Option<BenchResult>) {
    if let Some(r) = r {
        print_result_row(&r);
        results.push(r);
    }
}

fn section_queue(results: &mut Vec<BenchResult>) {
    let queue = LockFreeQueue::new();
    record(
        results,
        SAMPLER.run("queue push+pop", || {
            queue.push(black_box(1u64));
            black_box(queue.pop());
        }),
    );
    record(
        results,
        SAMPLER.run("queue pop (empty)", || {
            black_box(queue.pop());
        }),
    );
}

fn section_lock(results: &mut Vec<BenchResult>) {
    for policy in [AdmissionPolicy::Strict, AdmissionPolicy::Legacy] {
        let Ok(lock) = RawBoundedRwLock::with_policy(32, policy) else {
            continue;
        };
        let policy = lock.policy();
        record(
            results,
            SAMPLER.run(format!("rwlock read ({policy:?})"), || {
                drop(black_box(lock.read()));
            }),
        );
        record(
            results,
            SAMPLER.run(format!("rwlock write ({policy:?})"), || {
                drop(black_box(lock.write()));
            }),
        );
    }
}

fn section_pipeline() -> Vec<(String, f64)> {
    let corpus = generate_request_corpus(PIPELINE_REQUESTS);
    let mut modes = vec![Mode::Sequential];
    for n in [1usize, 2, 4, 8] {
        if let Some(consumers) = NonZeroUsize::new(n) {
            modes.push(Mode::Concurrent { consumers });
        }
    }

    let mut out = Vec::new();
    for mode in modes {
        let Ok(feed) = Feed::new(32) else { continue };
        let server = Server::new(feed, mode);
        let start = Instant::now();
        match server.run(corpus.as_bytes(), io::sink()) {
            Ok(summary) => {
                let secs = start.elapsed().as_secs_f64();
                let rate = summary.requests as f64 / secs;
                println!(
                    "  {:<32} {:>10} req  {:>10} req/s",
                    summary.mode.to_string(),
                    format_count(summary.requests),
                    format_count(rate as u64),
                );
                out.push((mode.to_string(), rate));
            }
            Err(err) => eprintln!("  {mode}: {err}"),
        }
    }
    out
}
