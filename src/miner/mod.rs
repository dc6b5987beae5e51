use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use num_bigint::BigUint;

use crate::pow::matrix::MatrixContext;
use crate::pow::{PowVariant, State};

/// How often the single-threaded loop reports its hash rate
const PROGRESS_INTERVAL: u128 = 1000;

/// Number of distinct nonces, 2^64
const NONCE_SPACE: u128 = 1 << 64;

/// Mining configuration
pub struct MinerConfig {
    /// Number of mining threads
    pub threads: usize,
    /// PoW revision to search under
    pub variant: PowVariant,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            variant: PowVariant::Original,
        }
    }
}

/// Result of a mining attempt
#[derive(Debug, PartialEq, Eq)]
pub enum MineResult {
    Found { nonce: u64, work: BigUint },
    Cancelled,
}

/// Search nonces from the state's current nonce until one meets the target.
///
/// Runs single-threaded. Stops when `stop` is set or after every nonce in
/// `[start, start + count)` has been tried.
fn search_range<M: MatrixContext>(
    state: &mut State<M>,
    variant: PowVariant,
    count: u128,
    stop: &AtomicBool,
    report: bool,
) -> MineResult {
    let start = Instant::now();
    let mut hashes: u128 = 0;

    while hashes < count {
        if stop.load(Ordering::Relaxed) {
            return MineResult::Cancelled;
        }

        let work = state.calculate_work(variant);
        hashes += 1;
        if state.meets_target(&work) {
            return MineResult::Found { nonce: state.nonce(), work };
        }

        state.increment_nonce();

        if report && hashes % PROGRESS_INTERVAL == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            tracing::debug!(
                "  Mining: {} hashes, {:.1} H/s, {:.0}s elapsed",
                hashes,
                hashes as f64 / elapsed,
                elapsed,
            );
        }
    }

    MineResult::Cancelled
}

/// Mine on one thread, starting from the state's nonce.
pub fn mine_single<M: MatrixContext>(
    mut state: State<M>,
    variant: PowVariant,
    stop: Arc<AtomicBool>,
) -> MineResult {
    let start = Instant::now();
    tracing::info!(
        "⛏️  Mining {} (difficulty: {}) from nonce {}...",
        variant,
        state.difficulty(),
        state.nonce(),
    );

    let result = search_range(&mut state, variant, NONCE_SPACE, &stop, true);
    log_result(&result, start);
    result
}

/// Split the whole nonce space into `threads` contiguous ranges from `start`.
///
/// Returns `(first nonce, count)` pairs. Ranges wrap at 2^64 and the last
/// one takes the remainder, so together they cover every nonce exactly once.
fn nonce_ranges(start: u64, threads: usize) -> Vec<(u64, u128)> {
    let threads = threads.max(1) as u128;
    let size = NONCE_SPACE / threads;
    (0..threads)
        .map(|i| {
            let first = start.wrapping_add((i * size) as u64);
            let count = if i + 1 == threads { NONCE_SPACE - i * size } else { size };
            (first, count)
        })
        .collect()
}

/// Mine across `config.threads` threads, each owning a slice of the nonce space.
///
/// Slices start at the state's nonce. Every thread gets its own clone of
/// the state; they share only the read-only lookup table and the stop flag.
pub fn mine<M: MatrixContext + Clone + Send + 'static>(
    state: State<M>,
    config: &MinerConfig,
    stop: Arc<AtomicBool>,
) -> MineResult {
    if config.threads <= 1 {
        return mine_single(state, config.variant, stop);
    }

    let threads = config.threads;
    let variant = config.variant;
    tracing::info!(
        "⛏️  Mining {} (difficulty: {}, {} threads)...",
        variant,
        state.difficulty(),
        threads,
    );

    let (tx, rx) = mpsc::channel();
    let start = Instant::now();

    let handles: Vec<_> = nonce_ranges(state.nonce(), threads)
        .into_iter()
        .map(|(first, count)| {
            let mut thread_state = state.clone();
            thread_state.set_nonce(first);
            let stop = stop.clone();
            let tx = tx.clone();

            std::thread::spawn(move || {
                let result = search_range(&mut thread_state, variant, count, &stop, false);
                if let MineResult::Found { .. } = result {
                    let _ = tx.send(result);
                    stop.store(true, Ordering::Relaxed);
                }
            })
        })
        .collect();

    drop(tx);

    let result = rx.recv().unwrap_or(MineResult::Cancelled);
    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        let _ = handle.join();
    }

    log_result(&result, start);
    result
}

fn log_result(result: &MineResult, start: Instant) {
    match result {
        MineResult::Found { nonce, work } => tracing::info!(
            "⛏️  Found nonce={} work={:x} ({} bits) time={:.2}s",
            nonce,
            work,
            work.bits(),
            start.elapsed().as_secs_f64(),
        ),
        MineResult::Cancelled => tracing::info!("Mining stopped."),
    }
}
