use chirp_events::Request;
use std::time::Instant;

// ─── Statistics ─────────────────────────────────────────────────────────────

/// Per-operation latency summary, in nanoseconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Stats {
    pub count: usize,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
    pub mean: f64,
}

impl Stats {
    /// Summarizes `samples`, or returns `None` when there are none.
    pub fn from_samples(mut samples: Vec<u64>) -> Option<Self> {
        samples.sort_unstable();
        let (&min, &max) = (samples.first()?, samples.last()?);
        let total: u128 = samples.iter().map(|&ns| u128::from(ns)).sum();
        // Nearest rank: the smallest sample with at least `q` of the set at or below it.
        let rank = |q: f64| {
            let idx = (q * samples.len() as f64).ceil() as usize;
            samples[idx.clamp(1, samples.len()) - 1]
        };
        Some(Self {
            count: samples.len(),
            min,
            p50: rank(0.50),
            p90: rank(0.90),
            p99: rank(0.99),
            max,
            mean: total as f64 / samples.len() as f64,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub stats: Stats,
}

// ─── Measurement Harness ────────────────────────────────────────────────────

/// Timing plan for a single-threaded microbenchmark. Each sample is the
/// mean cost of one op over a batch, which hides `Instant` overhead for
/// operations far cheaper than a clock read.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    pub batches: usize,
    pub batch_size: usize,
    /// Untimed batches run first.
    pub warmup_batches: usize,
}

impl Sampler {
    pub fn run<F: FnMut()>(&self, name: impl Into<String>, mut op: F) -> Option<BenchResult> {
        let batch = self.batch_size.max(1);
        let mut timed_batch = || {
            let start = Instant::now();
            (0..batch).for_each(|_| op());
            let per_op = start.elapsed().as_nanos() / batch as u128;
            u64::try_from(per_op).unwrap_or(u64::MAX).max(1)
        };

        for _ in 0..self.warmup_batches {
            timed_batch();
        }
        let samples: Vec<u64> = (0..self.batches).map(|_| timed_batch()).collect();
        Some(BenchResult {
            name: name.into(),
            stats: Stats::from_samples(samples)?,
        })
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub fn make_test_request(id: i64) -> Request {
    Request::add(id, "benchmark post body", id as f64)
}

/// Newline-delimited request stream: `count` records cycling through
/// ADD / CONTAINS / REMOVE, terminated by the sentinel.
pub fn generate_request_corpus(count: usize) -> String {
    let mut corpus = String::with_capacity(count * 64);
    for i in 0..count {
        let cmd = match i % 4 {
            0 | 1 => "ADD",
            2 => "CONTAINS",
            _ => "REMOVE",
        };
        corpus.push_str(&format!(
            "{{\"command\":\"{cmd}\",\"id\":{i},\"body\":\"post {i}\",\"timestamp\":{}}}\n",
            i / 2
        ));
    }
    corpus.push_str("{\"command\":\"DONE\"}\n");
    corpus
}

pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}

pub fn print_result_row(r: &BenchResult) {
    let s = &r.stats;
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8}  ns/op",
        r.name, s.min, s.p50, s.p90, s.p99, s.max,
    );
}

pub fn print_table_header() {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "max",
    );
    println!("  {}", "─".repeat(80));
}

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(80));
    println!("  {title}");
    println!("{}\n", "─".repeat(80));
}
