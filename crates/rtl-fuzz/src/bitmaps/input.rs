use std::fmt;

use libafl_bolts::rands::Rand;

use super::{ANSI_CHANGED, bit, render_bits, render_marked};
use crate::config::{BYTES_PER_INPUT, FUZZ_INPUT_MASK, N_FUZZ_INPUTS, N_FUZZ_INPUTS_W};

/// One cycle's worth of fuzz-input pin values.
///
/// Stored as little-endian `u32` words; the unused high bits of the last word
/// are always zero. Mutators work on the raw byte image and re-mask on
/// rebuild, so the invariant only has to be enforced at construction sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub(crate) words: [u32; N_FUZZ_INPUTS_W],
}

impl Input {
    pub fn zeroed() -> Self {
        Self { words: [0; N_FUZZ_INPUTS_W] }
    }

    /// Builds an input from raw pin words, masking the tail.
    pub fn from_words(words: [u32; N_FUZZ_INPUTS_W]) -> Self {
        let mut input = Self { words };
        input.mask();
        input
    }

    /// A uniformly random input, tail bits masked off.
    pub fn random<R: Rand>(rand: &mut R) -> Self {
        let mut words = [0u32; N_FUZZ_INPUTS_W];
        for word in &mut words {
            *word = rand.next() as u32;
        }
        let mut input = Self { words };
        input.mask();
        input
    }

    /// Clears the pad bits of the last word.
    pub fn mask(&mut self) {
        self.words[N_FUZZ_INPUTS_W - 1] &= FUZZ_INPUT_MASK;
    }

    pub fn is_masked(&self) -> bool {
        self.words[N_FUZZ_INPUTS_W - 1] & !FUZZ_INPUT_MASK == 0
    }

    pub fn words(&self) -> &[u32; N_FUZZ_INPUTS_W] {
        &self.words
    }

    /// Serializes into `out` as the little-endian byte image of the words.
    pub(crate) fn write_le_bytes(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), BYTES_PER_INPUT);
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Rebuilds an input from a mutated byte image, re-masking the tail.
    pub(crate) fn from_le_bytes(bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), BYTES_PER_INPUT);
        let mut words = [0u32; N_FUZZ_INPUTS_W];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let mut input = Self { words };
        input.mask();
        input
    }

    /// Bit string with the positions differing from `other` highlighted.
    pub fn diff(&self, other: &Self) -> String {
        render_marked(&self.words, N_FUZZ_INPUTS, ANSI_CHANGED, |i| {
            bit(&self.words, i) != bit(&other.words, i)
        })
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_bits(&self.words, N_FUZZ_INPUTS))
    }
}
