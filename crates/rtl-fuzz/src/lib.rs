#![warn(missing_debug_implementations, rust_2018_idioms)]

//! Coverage-guided fuzzing core for cycle-accurate RTL simulations.
//!
//! A [`Corpus`] of input sequences ([`Queue`]s) is evolved AFL-style: each
//! popped queue is mutated by the whole [`mutation`] family, every child is
//! replayed against the design behind a [`Testbench`], and children whose
//! coverage pins toggled previously-unseen bits are kept.

pub mod bitmaps;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod fields;
pub mod mutation;
pub mod queue;
pub mod testbench;

#[cfg(test)]
pub(crate) mod testing;

pub use bitmaps::{Input, Output};
pub use corpus::Corpus;
pub use driver::{DriverError, FuzzReport, fuzz, run_queue};
pub use queue::Queue;
pub use testbench::{Dut, Testbench};
