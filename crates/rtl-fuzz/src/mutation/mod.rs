//! AFL-style mutations over a queue's input sequence.
//!
//! A mutator is a scheduling discipline paired with a permutation kernel.
//! Each application flattens the sequence into one contiguous buffer (the
//! little-endian byte image of the input words, `len * BYTES_PER_INPUT`
//! bytes), permutes it at the scheduled index, and rebuilds a fresh queue
//! with every input re-masked. Index and byte conventions follow AFL, so a
//! given (seed, schedule) pair reproduces bit-exactly.

mod afl;
mod kernel;

pub use kernel::Kernel;

use libafl_bolts::rands::Rand;

use crate::{
    bitmaps::Input,
    config::BYTES_PER_INPUT,
    queue::Queue,
};

/// How a mutator walks its index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Visits every index `0..max` once, in order.
    Deterministic,
    /// Draws a single random index, then reports done.
    Random,
}

#[derive(Debug)]
pub struct Mutator {
    schedule: Schedule,
    kernel: Kernel,
    max: usize,
    idx: Option<usize>,
    done: bool,
    name: &'static str,
}

impl Mutator {
    pub fn new(schedule: Schedule, kernel: Kernel, qsize: usize, name: &'static str) -> Self {
        let max = kernel.max_index(qsize * BYTES_PER_INPUT);
        Self { schedule, kernel, max, idx: None, done: max == 0, name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Index of the most recent application.
    pub fn idx(&self) -> Option<usize> {
        self.idx
    }

    fn advance<R: Rand>(&mut self, rand: &mut R) -> usize {
        assert!(!self.done, "mutator {} already exhausted", self.name);
        let idx = match self.schedule {
            Schedule::Deterministic => {
                let idx = self.idx.map_or(0, |previous| previous + 1);
                if idx + 1 == self.max {
                    self.done = true;
                }
                idx
            }
            Schedule::Random => {
                self.done = true;
                rand.below_or_zero(self.max)
            }
        };
        self.idx = Some(idx);
        idx
    }

    /// Advances the schedule and returns a mutated child of `in_q`.
    ///
    /// The child carries the permuted input sequence only; it has not run yet
    /// and owns no outputs.
    pub fn apply_next<R: Rand>(&mut self, in_q: &Queue, rand: &mut R) -> Queue {
        assert!(!in_q.is_empty(), "cannot mutate an empty queue");
        let idx = self.advance(rand);
        let mut buf = flatten_inputs(in_q);
        self.kernel.permute(&mut buf, idx, self.max, rand);
        rebuild_queue(&buf)
    }
}

fn flatten_inputs(q: &Queue) -> Vec<u8> {
    let mut buf = vec![0u8; q.len() * BYTES_PER_INPUT];
    for (chunk, input) in buf.chunks_exact_mut(BYTES_PER_INPUT).zip(q.inputs()) {
        input.write_le_bytes(chunk);
    }
    buf
}

fn rebuild_queue(buf: &[u8]) -> Queue {
    let mut child = Queue::new();
    for chunk in buf.chunks_exact(BYTES_PER_INPUT) {
        child.push_input(Input::from_le_bytes(chunk));
    }
    child
}

/// The nine deterministic mutators: every flip plus every arithmetic kernel.
pub fn det_mutators(qsize: usize) -> Vec<Mutator> {
    use Schedule::Deterministic;
    vec![
        Mutator::new(Deterministic, Kernel::BitFlip1, qsize, "det bitflip 1/1"),
        Mutator::new(Deterministic, Kernel::BitFlip2, qsize, "det bitflip 2/1"),
        Mutator::new(Deterministic, Kernel::BitFlip4, qsize, "det bitflip 4/1"),
        Mutator::new(Deterministic, Kernel::ByteFlip1, qsize, "det bitflip 8/8"),
        Mutator::new(Deterministic, Kernel::ByteFlip2, qsize, "det bitflip 16/8"),
        Mutator::new(Deterministic, Kernel::ByteFlip4, qsize, "det bitflip 32/8"),
        Mutator::new(Deterministic, Kernel::Arith8, qsize, "det arith 8/8"),
        Mutator::new(Deterministic, Kernel::Arith16, qsize, "det arith 16/8"),
        Mutator::new(Deterministic, Kernel::Arith32, qsize, "det arith 32/8"),
    ]
}

/// The eleven random mutators. The flip family is represented by the single
/// bit flip only; the block kernels are random-only.
pub fn rand_mutators(qsize: usize) -> Vec<Mutator> {
    use Schedule::Random;
    vec![
        Mutator::new(Random, Kernel::BitFlip1, qsize, "rand bitflip 1/1"),
        Mutator::new(Random, Kernel::Arith8, qsize, "rand arith 8/8"),
        Mutator::new(Random, Kernel::Arith16, qsize, "rand arith 16/8"),
        Mutator::new(Random, Kernel::Arith32, qsize, "rand arith 32/8"),
        Mutator::new(Random, Kernel::Interesting8, qsize, "rand interest 8"),
        Mutator::new(Random, Kernel::Interesting16, qsize, "rand interest 16"),
        Mutator::new(Random, Kernel::Interesting32, qsize, "rand interest 32"),
        Mutator::new(Random, Kernel::RandomByte, qsize, "rand random 8"),
        Mutator::new(Random, Kernel::DeleteBytes, qsize, "delete"),
        Mutator::new(Random, Kernel::CloneBytes, qsize, "clone"),
        Mutator::new(Random, Kernel::OverwriteBytes, qsize, "overwrite"),
    ]
}

/// The full family, deterministic mutators first.
pub fn all_mutators(qsize: usize) -> Vec<Mutator> {
    let mut mutators = det_mutators(qsize);
    mutators.extend(rand_mutators(qsize));
    mutators
}
