//! The pop-mutate-evaluate-reinsert loop.

use derive_more::Display;
use libafl_bolts::rands::Rand;
use tracing::{debug, info};

use crate::{
    bitmaps::Output,
    config::{N_COV_POINTS, N_WARMUP_INPUTS},
    corpus::{Corpus, epoch_millis},
    mutation::all_mutators,
    queue::Queue,
    testbench::{Dut, Testbench},
};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The all-zeros seed run raised an assertion probe; nothing derived
    /// from it could be trusted.
    #[error("seed sequence raised DUT assertions")]
    InvalidSeed,
}

/// End-of-run statistics.
#[derive(Debug, Clone, Copy, Display)]
#[display(
    "coverage {achieved_coverage}/{max_coverage} after {trials} trials and {total_ticks} ticks"
)]
pub struct FuzzReport {
    pub max_coverage: usize,
    pub achieved_coverage: usize,
    pub total_ticks: u64,
    pub trials: u64,
}

/// Runs one queue as a single coverage-bearing trial.
///
/// Resets are issued first (meta reset, then functional reset), every input
/// is applied for exactly one cycle with one output sampled after it, and
/// the queue gets its retired inputs and the sampled outputs back, leaving
/// `|inputs| == |outputs|`.
pub fn run_queue<D: Dut>(tb: &mut Testbench<D>, q: &mut Queue, reset: bool) {
    tb.init();
    if reset {
        tb.meta_reset();
        tb.reset();
        assert_eq!(tb.output_count(), 0);
    }
    tb.push_inputs(q.pop_inputs());
    while tb.has_input() {
        tb.apply_next_input();
        tb.tick(1);
        tb.read_output();
    }
    tb.finish();
    q.push_outputs(tb.pop_outputs());
    q.push_inputs(tb.pop_retired_inputs());
}

/// Fuzzes until the corpus is exhausted and returns the final statistics.
///
/// Every popped queue is mutated by the whole family exactly once; children
/// that toggle unseen coverage are re-inserted, everything else is dropped.
pub fn fuzz<D: Dut, R: Rand>(
    tb: &mut Testbench<D>,
    rand: &mut R,
) -> Result<FuzzReport, DriverError> {
    let mut corpus = Corpus::new();
    let mut trials: u64 = 0;

    let mut warmup = Queue::new();
    warmup.generate_random(N_WARMUP_INPUTS, rand);
    run_queue(tb, &mut warmup, true);
    debug!(
        inputs = warmup.len(),
        coverage = warmup.coverage_popcount(),
        "warm-up finished"
    );

    let mut seed = Queue::new();
    seed.seed();
    info!(cycles = seed.len(), "running all-zeros seed");
    run_queue(tb, &mut seed, true);
    info!(coverage = seed.coverage_popcount(), "seed evaluated");
    debug!("seed inputs:\n{}", seed.render_inputs());
    debug!("seed outputs:\n{}", seed.render_outputs());
    if seed.accumulated_output().is_some_and(Output::failed) {
        return Err(DriverError::InvalidSeed);
    }

    info!(timestamp_ms = epoch_millis(), "fuzzing start");
    corpus.push(seed);

    while let Some(q) = corpus.pop() {
        for mut mutator in all_mutators(q.len()) {
            debug!(mutator = mutator.name(), "running mutator");
            while !mutator.is_done() {
                #[cfg(feature = "write_coverage")]
                if let Err(err) = corpus.dump_current_cov(tb) {
                    tracing::warn!(%err, "coverage dump failed");
                }
                let mut child = mutator.apply_next(&q, rand);
                run_queue(tb, &mut child, true);
                trials += 1;
                if corpus.is_interesting(&child) {
                    corpus.push(child);
                }
            }
        }
    }

    let report = FuzzReport {
        max_coverage: N_COV_POINTS,
        achieved_coverage: corpus.coverage_popcount(),
        total_ticks: tb.tick_count(),
        trials,
    };
    info!(timestamp_ms = epoch_millis(), "fuzzing finished");
    info!("{report}");
    corpus.print_accumulated();
    Ok(report)
}
