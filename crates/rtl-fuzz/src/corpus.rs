//! The evolving work-list of accepted input sequences.
//!
//! FIFO discipline: every popped queue gets one full pass of the mutator
//! family, breadth-first, and is then dropped. `global_output` is the
//! sticky union of the accumulated coverage of every accepted queue.

use std::{
    collections::VecDeque,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{debug, info};

use crate::{bitmaps::Output, queue::Queue};

#[derive(Debug, Default)]
pub struct Corpus {
    queues: VecDeque<Queue>,
    global_output: Option<Output>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `q`, merging its accumulated output into the global union.
    pub fn push(&mut self, q: Queue) {
        if let Some(acc) = q.accumulated_output() {
            match &mut self.global_output {
                Some(global) => global.merge_or(acc),
                None => self.global_output = Some(acc.clone()),
            }
        }
        self.queues.push_back(q);
    }

    pub fn pop(&mut self) -> Option<Queue> {
        self.queues.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// True iff `q` toggled at least one coverage bit the corpus has not seen.
    ///
    /// Unconditionally true while no queue has been accepted yet. Logs the
    /// discovery with the projected total so runs can be plotted over
    /// wall-clock time.
    pub fn is_interesting(&self, q: &Queue) -> bool {
        let Some(global) = &self.global_output else {
            return true;
        };
        let Some(candidate) = q.accumulated_output() else {
            return false;
        };
        let new_bits = global.novel_coverage(candidate);
        if new_bits == 0 {
            return false;
        }
        info!(
            new_bits,
            timestamp_ms = epoch_millis(),
            projected_total = self.coverage_popcount() + new_bits,
            "toggled new coverage point(s)"
        );
        debug!("coverage increase:\n{}", global.increase(candidate));
        true
    }

    pub fn coverage_popcount(&self) -> usize {
        self.global_output.as_ref().map_or(0, Output::coverage_popcount)
    }

    pub fn global_output(&self) -> Option<&Output> {
        self.global_output.as_ref()
    }

    /// Logs the accumulated global coverage bitmap.
    pub fn print_accumulated(&self) {
        match &self.global_output {
            Some(global) => info!("accumulated coverage:\n{global}"),
            None => info!("accumulated coverage: none"),
        }
    }

    /// Writes the global coverage bitmap to
    /// `{COV_DUMP_DIR}/{tick_count}.json`.
    #[cfg(feature = "write_coverage")]
    pub fn dump_current_cov<D: crate::testbench::Dut>(
        &self,
        tb: &crate::testbench::Testbench<D>,
    ) -> std::io::Result<()> {
        use crate::config::COV_DUMP_DIR;

        let Some(global) = &self.global_output else {
            return Ok(());
        };
        std::fs::create_dir_all(COV_DUMP_DIR)?;
        let path =
            std::path::Path::new(COV_DUMP_DIR).join(format!("{}.json", tb.tick_count()));
        global.dump_json(&path, tb.elapsed().as_millis(), tb.tick_count())
    }
}

pub(crate) fn epoch_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |since| since.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmaps::{Input, Output};

    fn queue_with_coverage(word0: u32) -> Queue {
        let mut q = Queue::new();
        q.push_input(Input::zeroed());
        q.push_input(Input::zeroed());
        // First sample fixes the initial state, second toggles `word0`.
        let mut first = Output::zeroed();
        first.coverage[0] = 0;
        let mut second = Output::zeroed();
        second.coverage[0] = word0;
        q.push_output(first);
        q.push_output(second);
        q
    }

    #[test]
    fn first_queue_is_always_interesting() {
        let corpus = Corpus::new();
        assert!(corpus.is_interesting(&queue_with_coverage(0)));
    }

    #[test]
    fn novel_bits_make_a_queue_interesting() {
        let mut corpus = Corpus::new();
        corpus.push(queue_with_coverage(0b010));
        assert_eq!(corpus.global_output().unwrap().coverage[0], 0b010);

        let candidate = queue_with_coverage(0b110);
        assert!(corpus.is_interesting(&candidate));
        corpus.push(candidate);
        assert_eq!(corpus.global_output().unwrap().coverage[0], 0b110);

        // Fully-covered candidates are no longer interesting.
        assert!(!corpus.is_interesting(&queue_with_coverage(0b100)));
    }

    #[test]
    fn global_coverage_grows_monotonically() {
        let mut corpus = Corpus::new();
        let mut seen = 0u32;
        for word in [0b1u32, 0b10, 0b1, 0b1000, 0b11] {
            corpus.push(queue_with_coverage(word));
            let global = corpus.global_output().unwrap().coverage[0];
            assert_eq!(global & seen, seen, "global coverage lost bits");
            seen = global;
        }
        assert_eq!(seen, 0b1011);
        assert_eq!(corpus.coverage_popcount(), 3);
    }

    #[test]
    fn pop_is_fifo() {
        let mut corpus = Corpus::new();
        corpus.push(queue_with_coverage(0b1));
        corpus.push(queue_with_coverage(0b10));
        assert_eq!(corpus.len(), 2);
        let first = corpus.pop().unwrap();
        assert_eq!(first.accumulated_output().unwrap().coverage[0], 0b1);
        assert_eq!(corpus.len(), 1);
        assert!(corpus.pop().is_some());
        assert!(corpus.pop().is_none());
        assert!(corpus.is_empty());
    }

    #[test]
    fn queue_without_outputs_is_not_interesting_once_seeded() {
        let mut corpus = Corpus::new();
        corpus.push(queue_with_coverage(0b1));
        let mut unrun = Queue::new();
        unrun.push_input(Input::zeroed());
        assert!(!corpus.is_interesting(&unrun));
    }
}
