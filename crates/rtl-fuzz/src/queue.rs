//! One test case: a FIFO of per-cycle inputs and the per-cycle outputs the
//! design produced for them.

use std::{collections::VecDeque, mem};

use itertools::Itertools;
use libafl_bolts::rands::Rand;

use crate::{
    bitmaps::{Input, Output},
    config::N_ZEROS_SEED,
};

/// Coverage aggregates of a running sequence.
///
/// `initial` is the first sampled output; `toggled` collects, sticky over the
/// sequence, the coverage bits that have differed from it and every raised
/// assertion bit.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Accumulator {
    initial: Output,
    toggled: Output,
}

/// An ordered input sequence paired with the outputs observed when it ran.
///
/// The i-th output is the design state sampled on the cycle the i-th input
/// was applied. Inputs leave by move for the duration of a simulator run and
/// come back once they are retired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    inputs: VecDeque<Input>,
    outputs: VecDeque<Output>,
    acc: Option<Accumulator>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the all-zeros seed sequence.
    pub fn seed(&mut self) {
        for _ in 0..N_ZEROS_SEED {
            self.inputs.push_back(Input::zeroed());
        }
    }

    /// Pushes `n` uniformly random inputs.
    pub fn generate_random<R: Rand>(&mut self, n: usize, rand: &mut R) {
        for _ in 0..n {
            self.inputs.push_back(Input::random(rand));
        }
    }

    pub fn push_input(&mut self, input: Input) {
        assert!(input.is_masked(), "input tail bits must be masked");
        self.inputs.push_back(input);
    }

    pub fn push_inputs(&mut self, inputs: impl IntoIterator<Item = Input>) {
        for input in inputs {
            self.push_input(input);
        }
    }

    /// Transfers all pending inputs out, e.g. to schedule them on a testbench.
    pub fn pop_inputs(&mut self) -> VecDeque<Input> {
        assert!(!self.inputs.is_empty(), "no pending inputs to pop");
        mem::take(&mut self.inputs)
    }

    pub fn push_output(&mut self, output: Output) {
        assert!(output.is_masked(), "output tail bits must be masked");
        self.accumulate_output(&output);
        self.outputs.push_back(output);
    }

    pub fn push_outputs(&mut self, outputs: impl IntoIterator<Item = Output>) {
        for output in outputs {
            self.push_output(output);
        }
    }

    fn accumulate_output(&mut self, output: &Output) {
        match &mut self.acc {
            None => {
                self.acc = Some(Accumulator {
                    initial: output.clone(),
                    toggled: Output::zeroed(),
                });
            }
            Some(acc) => {
                acc.toggled.accumulate_toggles(&acc.initial, output);
                debug_assert!(acc.toggled.is_masked());
            }
        }
    }

    /// First output sampled for this sequence, if it has run.
    pub fn initial_output(&self) -> Option<&Output> {
        self.acc.as_ref().map(|acc| &acc.initial)
    }

    /// Coverage toggles and sticky assertions over the whole sequence.
    pub fn accumulated_output(&self) -> Option<&Output> {
        self.acc.as_ref().map(|acc| &acc.toggled)
    }

    pub fn coverage_popcount(&self) -> usize {
        self.accumulated_output().map_or(0, Output::coverage_popcount)
    }

    /// Number of inputs in the sequence.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> impl ExactSizeIterator<Item = &Input> {
        self.inputs.iter()
    }

    pub fn outputs(&self) -> impl ExactSizeIterator<Item = &Output> {
        self.outputs.iter()
    }

    pub fn render_inputs(&self) -> String {
        self.inputs.iter().map(ToString::to_string).join("\n")
    }

    pub fn render_outputs(&self) -> String {
        self.outputs.iter().map(ToString::to_string).join("\n")
    }

    /// Input and output bit strings with differences against `other` highlighted.
    pub fn diff(&self, other: &Self) -> String {
        assert_eq!(self.inputs.len(), other.inputs.len());
        assert_eq!(self.outputs.len(), other.outputs.len());
        let inputs = self
            .inputs
            .iter()
            .zip(&other.inputs)
            .map(|(ours, theirs)| ours.diff(theirs))
            .join("\n");
        let outputs = self
            .outputs
            .iter()
            .zip(&other.outputs)
            .map(|(ours, theirs)| ours.diff(theirs))
            .join("\n");
        format!("INPUT DIFF\n{inputs}\nOUTPUT DIFF\n{outputs}")
    }
}
