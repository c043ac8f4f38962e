//! Scripted stand-in for a simulated design, used by the crate's tests.

use std::fmt;

use crate::{
    config::{N_ASSERTS_W, N_COV_POINTS_W, N_FUZZ_INPUTS_W},
    testbench::Dut,
};

type CoverWords = [u32; N_COV_POINTS_W];
type AssertWords = [u32; N_ASSERTS_W];
type PinFn = Box<dyn FnMut(&[u32; N_FUZZ_INPUTS_W], u64) -> (CoverWords, AssertWords)>;

/// A [`Dut`] whose cover and assert pins are computed from the current fuzz
/// inputs and cycle number on every rising clock edge outside reset.
///
/// The meta reset clears the pin latches and the cycle counter, mirroring a
/// design whose coverage counters are wiped independently of its state.
pub(crate) struct StubDut {
    pub(crate) fuzz_inputs: [u32; N_FUZZ_INPUTS_W],
    clock: bool,
    last_clock: bool,
    reset: bool,
    meta_reset: bool,
    cycle: u64,
    pins: PinFn,
    coverage: CoverWords,
    asserts: AssertWords,
}

impl StubDut {
    pub(crate) fn from_pins(
        pins: impl FnMut(&[u32; N_FUZZ_INPUTS_W], u64) -> (CoverWords, AssertWords) + 'static,
    ) -> Self {
        Self {
            fuzz_inputs: [0; N_FUZZ_INPUTS_W],
            clock: false,
            last_clock: false,
            reset: false,
            meta_reset: false,
            cycle: 0,
            pins: Box::new(pins),
            coverage: [0; N_COV_POINTS_W],
            asserts: [0; N_ASSERTS_W],
        }
    }

    /// Pins stuck at fixed values regardless of inputs.
    pub(crate) fn constant(coverage: CoverWords, asserts: AssertWords) -> Self {
        let mut dut = Self::from_pins(move |_, _| (coverage, asserts));
        dut.coverage = coverage;
        dut.asserts = asserts;
        dut
    }
}

impl Dut for StubDut {
    fn set_clock(&mut self, high: bool) {
        self.clock = high;
    }

    fn set_reset(&mut self, active: bool) {
        self.reset = active;
    }

    fn set_meta_reset(&mut self, active: bool) {
        self.meta_reset = active;
    }

    fn set_fuzz_inputs(&mut self, words: &[u32; N_FUZZ_INPUTS_W]) {
        self.fuzz_inputs = *words;
    }

    fn eval(&mut self) {
        let rising = self.clock && !self.last_clock;
        self.last_clock = self.clock;
        if !rising {
            return;
        }
        if self.meta_reset {
            self.cycle = 0;
            self.coverage = [0; N_COV_POINTS_W];
            self.asserts = [0; N_ASSERTS_W];
        } else if !self.reset {
            self.cycle += 1;
            let (coverage, asserts) = (self.pins)(&self.fuzz_inputs, self.cycle);
            self.coverage = coverage;
            self.asserts = asserts;
        }
    }

    fn read_coverage(&self, words: &mut CoverWords) {
        *words = self.coverage;
    }

    fn read_asserts(&self, words: &mut AssertWords) {
        *words = self.asserts;
    }
}

impl fmt::Debug for StubDut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubDut")
            .field("cycle", &self.cycle)
            .field("reset", &self.reset)
            .field("meta_reset", &self.meta_reset)
            .finish_non_exhaustive()
    }
}
