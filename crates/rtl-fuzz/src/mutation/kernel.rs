use libafl_bolts::rands::Rand;

use super::afl::{ARITH_MAX, INTERESTING_8, INTERESTING_16, INTERESTING_32, flip_bit};

/// One permutation of the flat input buffer at a given index.
///
/// Multi-byte arithmetic works on the buffer's little-endian host bytes; the
/// big-endian cases read and write the word at byte offset `idx`. The `max`
/// formulas keep every touched byte in bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    BitFlip1,
    BitFlip2,
    BitFlip4,
    ByteFlip1,
    ByteFlip2,
    ByteFlip4,
    Arith8,
    Arith16,
    Arith32,
    Interesting8,
    Interesting16,
    Interesting32,
    RandomByte,
    DeleteBytes,
    CloneBytes,
    OverwriteBytes,
}

impl Kernel {
    /// Upper bound on the index a scheduler may hand to [`Kernel::permute`]
    /// for a buffer of `len_bytes` bytes.
    pub(crate) fn max_index(self, len_bytes: usize) -> usize {
        let bits = len_bytes * 8;
        match self {
            Self::BitFlip1 => bits.saturating_sub(1),
            Self::BitFlip2 => bits.saturating_sub(2),
            Self::BitFlip4 => bits.saturating_sub(5),
            Self::ByteFlip1 | Self::Arith8 | Self::DeleteBytes | Self::CloneBytes => {
                len_bytes.saturating_sub(1)
            }
            Self::ByteFlip2 | Self::Arith16 => len_bytes.saturating_sub(2),
            Self::ByteFlip4
            | Self::Arith32
            | Self::Interesting8
            | Self::Interesting16
            | Self::Interesting32
            | Self::RandomByte
            | Self::OverwriteBytes => len_bytes.saturating_sub(5),
        }
    }

    pub(crate) fn permute<R: Rand>(
        self,
        buf: &mut [u8],
        idx: usize,
        max: usize,
        rand: &mut R,
    ) {
        match self {
            Self::BitFlip1 => flip_bit(buf, idx),
            Self::BitFlip2 => {
                flip_bit(buf, idx);
                flip_bit(buf, idx + 1);
            }
            Self::BitFlip4 => {
                for bit in idx..idx + 4 {
                    flip_bit(buf, bit);
                }
            }
            Self::ByteFlip1 => buf[idx] ^= 0xFF,
            Self::ByteFlip2 => {
                buf[idx] ^= 0xFF;
                buf[idx + 1] ^= 0xFF;
            }
            Self::ByteFlip4 => {
                for byte in &mut buf[idx..idx + 4] {
                    *byte ^= 0xFF;
                }
            }
            Self::Arith8 => {
                let delta = rand.below_or_zero(ARITH_MAX) as u8;
                buf[idx] = if rand.below_or_zero(2) == 1 {
                    buf[idx].wrapping_add(delta)
                } else {
                    buf[idx].wrapping_sub(delta)
                };
            }
            Self::Arith16 => {
                let delta = rand.below_or_zero(ARITH_MAX) as u16;
                let bytes = delta.to_le_bytes();
                match rand.below_or_zero(4) {
                    // Byte-wise little-endian add/sub, no carry between bytes.
                    0 => {
                        buf[idx] = buf[idx].wrapping_add(bytes[0]);
                        buf[idx + 1] = buf[idx + 1].wrapping_add(bytes[1]);
                    }
                    1 => {
                        buf[idx] = buf[idx].wrapping_sub(bytes[0]);
                        buf[idx + 1] = buf[idx + 1].wrapping_sub(bytes[1]);
                    }
                    2 => {
                        let word = u16::from_be_bytes([buf[idx], buf[idx + 1]])
                            .wrapping_add(delta);
                        buf[idx..idx + 2].copy_from_slice(&word.to_be_bytes());
                    }
                    _ => {
                        let word = u16::from_be_bytes([buf[idx], buf[idx + 1]])
                            .wrapping_sub(delta);
                        buf[idx..idx + 2].copy_from_slice(&word.to_be_bytes());
                    }
                }
            }
            Self::Arith32 => {
                let delta = rand.below_or_zero(ARITH_MAX) as u32;
                let bytes = delta.to_le_bytes();
                match rand.below_or_zero(4) {
                    0 => {
                        for (byte, delta_byte) in
                            buf[idx..idx + 4].iter_mut().zip(bytes)
                        {
                            *byte = byte.wrapping_add(delta_byte);
                        }
                    }
                    1 => {
                        for (byte, delta_byte) in
                            buf[idx..idx + 4].iter_mut().zip(bytes)
                        {
                            *byte = byte.wrapping_sub(delta_byte);
                        }
                    }
                    2 => {
                        let word = u32::from_be_bytes([
                            buf[idx],
                            buf[idx + 1],
                            buf[idx + 2],
                            buf[idx + 3],
                        ])
                        .wrapping_add(delta);
                        buf[idx..idx + 4].copy_from_slice(&word.to_be_bytes());
                    }
                    _ => {
                        let word = u32::from_be_bytes([
                            buf[idx],
                            buf[idx + 1],
                            buf[idx + 2],
                            buf[idx + 3],
                        ])
                        .wrapping_sub(delta);
                        buf[idx..idx + 4].copy_from_slice(&word.to_be_bytes());
                    }
                }
            }
            // The last table entry stays out of reach of the draw.
            Self::Interesting8 => {
                buf[idx] =
                    INTERESTING_8[rand.below_or_zero(INTERESTING_8.len() - 1)] as u8;
            }
            Self::Interesting16 => {
                let value =
                    INTERESTING_16[rand.below_or_zero(INTERESTING_16.len() - 1)] as u16;
                buf[idx..idx + 2].copy_from_slice(&value.to_le_bytes());
            }
            Self::Interesting32 => {
                let value =
                    INTERESTING_32[rand.below_or_zero(INTERESTING_32.len() - 1)] as u32;
                buf[idx..idx + 4].copy_from_slice(&value.to_le_bytes());
            }
            Self::RandomByte => buf[idx] = rand.below_or_zero(255) as u8,
            Self::DeleteBytes => {
                if max < 2 {
                    return;
                }
                let n_bytes = rand.below_or_zero(max);
                for i in 0..n_bytes {
                    buf[(idx + i) % (max - 1)] = 0x00;
                }
            }
            Self::CloneBytes => {
                let n_bytes = rand.below_or_zero(max / 2);
                let src = rand.below_or_zero(max - n_bytes);
                let dst = rand.below_or_zero(max - n_bytes);
                buf.copy_within(src..src + n_bytes, dst);
            }
            Self::OverwriteBytes => {
                if max < 2 {
                    return;
                }
                let n_bytes = rand.below_or_zero(max);
                for i in 0..n_bytes {
                    buf[(idx + i) % (max - 1)] = rand.below_or_zero(255) as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use libafl_bolts::rands::StdRand;

    use super::*;

    const LEN: usize = 48;

    fn buffer() -> Vec<u8> {
        (0..LEN as u8).collect()
    }

    #[test]
    fn bit_flips_are_involutions() {
        for kernel in [Kernel::BitFlip1, Kernel::BitFlip2, Kernel::BitFlip4] {
            let mut rand = StdRand::with_seed(1);
            let mut buf = buffer();
            let idx = 17;
            kernel.permute(&mut buf, idx, kernel.max_index(LEN), &mut rand);
            assert_ne!(buf, buffer());
            kernel.permute(&mut buf, idx, kernel.max_index(LEN), &mut rand);
            assert_eq!(buf, buffer());
        }
    }

    #[test]
    fn byte_flips_are_involutions() {
        for kernel in [Kernel::ByteFlip1, Kernel::ByteFlip2, Kernel::ByteFlip4] {
            let mut rand = StdRand::with_seed(1);
            let mut buf = buffer();
            let idx = 9;
            kernel.permute(&mut buf, idx, kernel.max_index(LEN), &mut rand);
            assert_ne!(buf, buffer());
            kernel.permute(&mut buf, idx, kernel.max_index(LEN), &mut rand);
            assert_eq!(buf, buffer());
        }
    }

    #[test]
    fn single_bit_flip_sets_the_msb_of_byte_zero() {
        let mut rand = StdRand::with_seed(1);
        let mut buf = vec![0u8; LEN];
        Kernel::BitFlip1.permute(&mut buf, 0, LEN * 8 - 1, &mut rand);
        assert_eq!(buf[0], 0x80);
        assert!(buf[1..].iter().all(|byte| *byte == 0));

        let mut buf = vec![0u8; LEN];
        Kernel::BitFlip1.permute(&mut buf, 1, LEN * 8 - 1, &mut rand);
        assert_eq!(buf[0], 0x40);
    }

    #[test]
    fn arith8_shifts_one_byte_by_less_than_the_bound() {
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            let idx = 5;
            Kernel::Arith8.permute(&mut buf, idx, LEN - 1, &mut rand);
            let delta = buf[idx].wrapping_sub(buffer()[idx]) as i8;
            assert!((delta as i32).abs() < ARITH_MAX as i32);
            buf[idx] = buffer()[idx];
            assert_eq!(buf, buffer());
        }
    }

    #[test]
    fn arith16_touches_only_its_window() {
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            let idx = 11;
            Kernel::Arith16.permute(&mut buf, idx, LEN - 2, &mut rand);
            assert_eq!(&buf[..idx], &buffer()[..idx]);
            assert_eq!(&buf[idx + 2..], &buffer()[idx + 2..]);
        }
    }

    #[test]
    fn arith32_touches_only_its_window() {
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            let idx = 30;
            Kernel::Arith32.permute(&mut buf, idx, LEN - 5, &mut rand);
            assert_eq!(&buf[..idx], &buffer()[..idx]);
            assert_eq!(&buf[idx + 4..], &buffer()[idx + 4..]);
        }
    }

    #[test]
    fn interesting_bytes_come_from_the_table() {
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            Kernel::Interesting8.permute(&mut buf, 3, LEN - 5, &mut rand);
            assert!(
                INTERESTING_8[..INTERESTING_8.len() - 1]
                    .iter()
                    .any(|value| *value as u8 == buf[3])
            );
        }
    }

    #[test]
    fn interesting_words_are_written_little_endian() {
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            let idx = 7;
            Kernel::Interesting16.permute(&mut buf, idx, LEN - 5, &mut rand);
            let written = u16::from_le_bytes([buf[idx], buf[idx + 1]]);
            assert!(
                INTERESTING_16[..INTERESTING_16.len() - 1]
                    .iter()
                    .any(|value| *value as u16 == written)
            );
        }
    }

    #[test]
    fn delete_only_zeroes_and_never_touches_the_buffer_tail() {
        let max = LEN - 1;
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            Kernel::DeleteBytes.permute(&mut buf, max - 1, max, &mut rand);
            for (i, (byte, original)) in buf.iter().zip(buffer()).enumerate() {
                assert!(*byte == original || *byte == 0);
                if i >= max - 1 {
                    assert_eq!(*byte, original, "byte past the wrap modulus changed");
                }
            }
        }
    }

    #[test]
    fn overwrite_stays_below_the_wrap_modulus() {
        let max = LEN - 5;
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            Kernel::OverwriteBytes.permute(&mut buf, max - 1, max, &mut rand);
            for (i, (byte, original)) in buf.iter().zip(buffer()).enumerate() {
                if i >= max - 1 {
                    assert_eq!(*byte, original, "byte past the wrap modulus changed");
                }
            }
        }
    }

    #[test]
    fn clone_copies_existing_buffer_content() {
        for seed in 0..64 {
            let mut rand = StdRand::with_seed(seed);
            let mut buf = buffer();
            Kernel::CloneBytes.permute(&mut buf, 0, LEN - 1, &mut rand);
            for byte in &buf {
                assert!((*byte as usize) < LEN);
            }
        }
    }
}
