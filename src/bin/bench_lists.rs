//! # List Round-Trip Benchmark
//!
//! Purpose: Provide a repeatable benchmark driver for the list client
//! against a live server so baseline throughput and latency can be compared
//! over time.
//!
//! ## Design Principles
//! 1. **Deterministic Workload**: Use a fixed PRNG seed for stable
//!    comparisons.
//! 2. **Allocation Control**: Pre-build values to keep setup costs off the
//!    hot path.
//! 3. **One Stage Per Verb**: Push, index reads, scans, and drain are timed
//!    separately so regressions point at a command, not the run.

use std::env;
use std::hint::black_box;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use redlist::ListClient;
use tracing_subscriber::EnvFilter;

const BENCH_KEY: &[u8] = b"redlist:bench";
const DEFAULT_ADDR: &str = "127.0.0.1:6379";
const DEFAULT_OP_COUNT: usize = 1 << 14;
const DEFAULT_VALUE_SIZE: usize = 128;
const DEFAULT_BATCH: usize = 64;

struct BenchConfig {
    addr: String,
    requested_ops: usize,
    op_count: usize,
    op_mask: usize,
    value_size: usize,
    batch: usize,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let requested_ops = parse_usize(args.next(), DEFAULT_OP_COUNT);
        let value_size = parse_usize(args.next(), DEFAULT_VALUE_SIZE);
        let batch = parse_usize(args.next(), DEFAULT_BATCH).max(1);

        let op_count = normalize_power_of_two(requested_ops);
        let op_mask = op_count - 1;

        BenchConfig {
            addr,
            requested_ops,
            op_count,
            op_mask,
            value_size,
            batch,
        }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn normalize_power_of_two(value: usize) -> usize {
    let value = value.max(1);
    if value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two()
    }
}

/// Tiny deterministic PRNG used to avoid external dependencies.
///
/// XorShift is fast enough for benchmarks and keeps the workload reproducible.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    #[inline]
    fn next_index(&mut self, mask: usize) -> usize {
        (self.next_u64() as usize) & mask
    }
}

fn write_u64_le(value: u64, buffer: &mut [u8]) {
    let bytes = value.to_le_bytes();
    let copy_len = buffer.len().min(bytes.len());
    buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
}

fn build_values(count: usize, size: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        let mut value = vec![0u8; size.max(1)];
        write_u64_le(seed ^ (i as u64), &mut value);
        values.push(value);
    }
    values
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let micros_per_op = (secs * 1e6) / (ops as f64);
    println!(
        "{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {micros_per_op:.1} us/op)"
    );
}

fn main() {
    if let Err(err) = run() {
        eprintln!("bench_lists failed: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = BenchConfig::from_args();
    let client = ListClient::connect(config.addr.clone())
        .with_context(|| format!("connecting to {}", config.addr))?;

    // A trim span that selects nothing clears the key, so every run starts
    // from an empty list.
    client.ltrim(BENCH_KEY, 1, 0)?;

    println!(
        "ops: requested={}, actual={}, value_size={}, batch={}, addr={}",
        config.requested_ops, config.op_count, config.value_size, config.batch, config.addr
    );

    let values = build_values(config.batch, config.value_size, 0x5A5A_5A5A_5A5A_5A5A);

    let start = Instant::now();
    let mut pushed = 0;
    while pushed < config.op_count {
        let take = config.batch.min(config.op_count - pushed);
        client.rpush(BENCH_KEY, &values[..take])?;
        pushed += take;
    }
    report("RPUSH", config.op_count, start.elapsed());

    let length = client.llen(BENCH_KEY)?;
    ensure!(
        length == config.op_count as i64,
        "expected {} elements after push, server reports {length}",
        config.op_count
    );

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let index = rng.next_index(config.op_mask);
        let value = client.lindex(BENCH_KEY, index as i64)?;
        black_box(value);
    }
    report("LINDEX", config.op_count, start.elapsed());

    let scans = (config.op_count / config.batch).max(1);
    let mut rng = XorShift64::new(0x0FED_CBA9_8765_4321);
    let start = Instant::now();
    for _ in 0..scans {
        let from = rng.next_index(config.op_mask) as i64;
        let to = from + config.batch as i64 - 1;
        let window = client.lrange(BENCH_KEY, from, to)?;
        black_box(window);
    }
    report("LRANGE", scans, start.elapsed());

    let start = Instant::now();
    for _ in 0..config.op_count {
        let value = client.lpop(BENCH_KEY)?;
        black_box(value);
    }
    report("LPOP", config.op_count, start.elapsed());

    let remaining = client.llen(BENCH_KEY)?;
    ensure!(
        remaining == 0,
        "list should be drained, {remaining} element(s) left"
    );

    Ok(())
}
