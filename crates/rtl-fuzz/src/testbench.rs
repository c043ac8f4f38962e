//! The cycle-accurate seam between the fuzzing loop and the simulated design.

use std::{
    collections::VecDeque,
    mem,
    time::{Duration, Instant},
};

use derive_new::new as New;
use tracing::warn;

use crate::{
    bitmaps::{Input, Output},
    config::{
        N_ASSERTS_W, N_COV_POINTS_W, N_FUZZ_INPUTS_W, N_META_RESET_TICKS, N_RESET_TICKS,
    },
};

/// Pin-level view of a simulated design.
///
/// `eval` settles the combinational logic for the current pin values; state
/// updates happen on the clock edges the testbench drives around it. Both
/// resets are active high. Implementations with a waveform writer hook
/// `trace_dump`; the default is a no-op.
pub trait Dut {
    fn set_clock(&mut self, high: bool);
    /// Functional reset.
    fn set_reset(&mut self, active: bool);
    /// Coverage-counter reset, independent of the functional one.
    fn set_meta_reset(&mut self, active: bool);
    fn set_fuzz_inputs(&mut self, words: &[u32; N_FUZZ_INPUTS_W]);
    fn eval(&mut self);
    fn read_coverage(&self, words: &mut [u32; N_COV_POINTS_W]);
    fn read_asserts(&self, words: &mut [u32; N_ASSERTS_W]);
    fn trace_dump(&mut self, _time: u64) {}
}

/// Drives a [`Dut`] one clock cycle at a time and shuttles inputs and
/// outputs between it and the fuzzing loop.
///
/// Scheduled inputs are applied FIFO; each applied input moves to the
/// retired list so its owning queue can reclaim it after the run.
#[derive(Debug, New)]
pub struct Testbench<D> {
    dut: D,
    #[new(default)]
    scheduled_inputs: VecDeque<Input>,
    #[new(default)]
    retired_inputs: VecDeque<Input>,
    #[new(default)]
    outputs: VecDeque<Output>,
    #[new(default)]
    tick_count: u64,
    #[new(value = "Instant::now()")]
    start_time: Instant,
}

impl<D: Dut> Testbench<D> {
    /// One deasserted settling cycle, then `N_RESET_TICKS` cycles in reset.
    pub fn reset(&mut self) {
        let zero = Input::zeroed();
        self.dut.set_reset(false);
        self.dut.set_meta_reset(false);
        self.dut.set_fuzz_inputs(zero.words());
        self.tick(1);
        self.dut.set_reset(true);
        self.tick(N_RESET_TICKS);
        self.dut.set_reset(false);
    }

    /// Clears the design's coverage counters. The functional reset is held
    /// asserted while the meta reset pulses.
    pub fn meta_reset(&mut self) {
        let zero = Input::zeroed();
        self.dut.set_meta_reset(false);
        self.dut.set_reset(true);
        self.dut.set_fuzz_inputs(zero.words());
        self.tick(1);
        self.dut.set_meta_reset(true);
        self.tick(N_META_RESET_TICKS);
        self.dut.set_meta_reset(false);
    }

    pub fn push_input(&mut self, input: Input) {
        self.scheduled_inputs.push_back(input);
    }

    pub fn push_inputs(&mut self, inputs: impl IntoIterator<Item = Input>) {
        for input in inputs {
            self.push_input(input);
        }
        assert!(!self.scheduled_inputs.is_empty());
    }

    pub fn has_input(&self) -> bool {
        !self.scheduled_inputs.is_empty()
    }

    /// Drives the next scheduled input onto the fuzz pins and retires it.
    pub fn apply_next_input(&mut self) {
        let Some(input) = self.scheduled_inputs.pop_front() else {
            warn!("out of scheduled inputs");
            return;
        };
        self.dut.set_fuzz_inputs(input.words());
        self.retired_inputs.push_back(input);
    }

    /// Advances `n` clock cycles: falling edge, rising edge, settle, with a
    /// trace timestamp around each evaluation.
    pub fn tick(&mut self, n: usize) {
        for _ in 0..n {
            self.tick_count += 1;
            self.dut.set_clock(false);
            self.dut.eval();
            self.dut.trace_dump(5 * self.tick_count - 1);
            self.dut.set_clock(true);
            self.dut.eval();
            self.dut.trace_dump(5 * self.tick_count);
            self.dut.set_clock(false);
            self.dut.eval();
            self.dut.trace_dump(5 * self.tick_count + 1);
        }
    }

    /// Samples the coverage and assertion pins into a new output.
    pub fn read_output(&mut self) {
        let mut output = Output::zeroed();
        self.dut.read_coverage(&mut output.coverage);
        self.dut.read_asserts(&mut output.asserts);
        output.mask();
        if output.failed() {
            warn!("DUT raised assertion probe(s)");
        }
        self.outputs.push_back(output);
    }

    pub fn pop_outputs(&mut self) -> VecDeque<Output> {
        mem::take(&mut self.outputs)
    }

    pub fn pop_retired_inputs(&mut self) -> VecDeque<Input> {
        mem::take(&mut self.retired_inputs)
    }

    /// Prepares for a fresh run by discarding stale outputs.
    pub fn init(&mut self) {
        self.outputs.clear();
    }

    /// Ends a run by discarding whatever inputs were never applied.
    pub fn finish(&mut self) {
        self.scheduled_inputs.clear();
    }

    pub fn next_input(&self) -> Option<&Input> {
        self.scheduled_inputs.front()
    }

    pub fn last_output(&self) -> Option<&Output> {
        self.outputs.back()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Asserts the tail-mask invariant over all sampled outputs.
    pub fn check_outputs(&self) {
        for output in &self.outputs {
            assert!(output.is_masked());
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Time since the testbench was constructed.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
