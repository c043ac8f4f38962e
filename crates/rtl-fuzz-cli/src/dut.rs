//! A small software design to fuzz when no Verilated model is linked in.
//!
//! `DemoSoc` decodes each cycle's fuzz inputs as a tiny instruction word
//! driving an accumulator, an LFSR and a FIFO depth counter. Coverage pins
//! are sticky event latches cleared only by the meta reset; assertion pins
//! latch protocol violations (FIFO over/underflow, reserved opcodes).

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::ensure;
use rtl_fuzz::{
    config::{N_ASSERTS_W, N_COV_POINTS, N_COV_POINTS_W, N_FUZZ_INPUTS_W},
    fields::{field_value, field_value_u32, field_value_u64},
    testbench::Dut,
};

const FIFO_CAPACITY: u32 = 15;

// Coverage latch layout.
const COV_OPCODE: usize = 0; // 16 bits, one-hot executed opcode
const COV_FIFO_DEPTH: usize = 16; // 16 bits, one-hot depth
const COV_REG_HASH: usize = 32; // 32 buckets over (pc, acc)
const COV_LFSR: usize = 64; // 32 buckets over the LFSR taps
const COV_SBOX: usize = 96; // 8 buckets over looked-up SRAM bytes
const COV_ACC_ZERO: usize = 104;
const COV_B_GT_A: usize = 105;
const COV_IMM_SATURATED: usize = 106;

// Assertion probe layout.
const ASSERT_FIFO_OVERFLOW: usize = 0;
const ASSERT_FIFO_UNDERFLOW: usize = 1;
const ASSERT_RESERVED_OPCODE: usize = 2;

pub struct DemoSoc {
    clock: bool,
    last_clock: bool,
    reset: bool,
    meta_reset: bool,
    fuzz_inputs: [u32; N_FUZZ_INPUTS_W],

    pc: u32,
    acc: u32,
    lfsr: u32,
    fifo_depth: u32,

    lfsr_seed: u32,
    sram: Vec<u8>,

    coverage: [u32; N_COV_POINTS_W],
    asserts: [u32; N_ASSERTS_W],
    trace: Option<BufWriter<File>>,
}

impl DemoSoc {
    pub fn new(rom: Vec<u8>, sram: Vec<u8>, trace_file: Option<&Path>) -> anyhow::Result<Self> {
        ensure!(!rom.is_empty(), "boot-ROM image is empty");
        ensure!(!sram.is_empty(), "SRAM image is empty");
        let trace = trace_file.map(File::create).transpose()?.map(BufWriter::new);
        // The boot ROM only parameterizes the LFSR; the SRAM acts as the
        // substitution table.
        let lfsr_seed = rom
            .iter()
            .fold(0xACE1_u32, |hash, byte| hash.rotate_left(5) ^ u32::from(*byte));
        Ok(Self {
            clock: false,
            last_clock: false,
            reset: false,
            meta_reset: false,
            fuzz_inputs: [0; N_FUZZ_INPUTS_W],
            pc: 0,
            acc: 0,
            lfsr: lfsr_seed,
            fifo_depth: 0,
            lfsr_seed,
            sram,
            coverage: [0; N_COV_POINTS_W],
            asserts: [0; N_ASSERTS_W],
            trace,
        })
    }

    fn set_cov(&mut self, bit: usize) {
        debug_assert!(bit < N_COV_POINTS);
        self.coverage[bit / 32] |= 1 << (bit % 32);
    }

    fn set_assert(&mut self, bit: usize) {
        self.asserts[bit / 32] |= 1 << (bit % 32);
    }

    fn step(&mut self) {
        let opcode = field_value(&self.fuzz_inputs, 0, 4);
        let a = field_value(&self.fuzz_inputs, 4, 8);
        let b = field_value(&self.fuzz_inputs, 12, 8);
        let imm = field_value(&self.fuzz_inputs, 20, 20);

        self.pc = self.pc.wrapping_add(1);
        let feedback =
            ((self.lfsr >> 31) ^ (self.lfsr >> 21) ^ (self.lfsr >> 1) ^ self.lfsr) & 1;
        self.lfsr = (self.lfsr << 1) | feedback;

        let mut sbox_byte = None;
        match opcode {
            0x0 => {}
            0x1 => self.acc = self.acc.wrapping_add(a),
            0x2 => self.acc = self.acc.wrapping_sub(b),
            0x3 => {
                let byte = self.sram[(a ^ b) as usize % self.sram.len()];
                self.acc ^= u32::from(byte);
                sbox_byte = Some(byte);
            }
            0x4 => {
                if self.fifo_depth == FIFO_CAPACITY {
                    self.set_assert(ASSERT_FIFO_OVERFLOW);
                } else {
                    self.fifo_depth += 1;
                }
            }
            0x5 => {
                if self.fifo_depth == 0 {
                    self.set_assert(ASSERT_FIFO_UNDERFLOW);
                } else {
                    self.fifo_depth -= 1;
                }
            }
            0x6 => self.acc = self.acc.rotate_left(b % 32),
            0x7 => self.acc ^= self.lfsr,
            0x8 => self.acc = self.acc.wrapping_mul(0x9E37_79B9) ^ imm,
            0x9 => self.pc = imm,
            0xF => self.set_assert(ASSERT_RESERVED_OPCODE),
            _ => {}
        }

        // Event latches.
        self.set_cov(COV_OPCODE + opcode as usize);
        self.set_cov(COV_FIFO_DEPTH + self.fifo_depth as usize);
        let reg_hash =
            field_value_u64((u64::from(self.pc) << 32) | u64::from(self.acc), 13, 20);
        self.set_cov(COV_REG_HASH + (reg_hash % 32) as usize);
        self.set_cov(COV_LFSR + field_value_u32(self.lfsr, 7, 5) as usize);
        if let Some(byte) = sbox_byte {
            self.set_cov(COV_SBOX + usize::from(byte >> 5));
        }
        if self.acc == 0 {
            self.set_cov(COV_ACC_ZERO);
        }
        if b > a {
            self.set_cov(COV_B_GT_A);
        }
        if imm == 0xF_FFFF {
            self.set_cov(COV_IMM_SATURATED);
        }
    }
}

impl Dut for DemoSoc {
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
            self.coverage = [0; N_COV_POINTS_W];
            self.asserts = [0; N_ASSERTS_W];
        }
        if self.reset {
            self.pc = 0;
            self.acc = 0;
            self.lfsr = self.lfsr_seed;
            self.fifo_depth = 0;
            return;
        }
        self.step();
    }

    fn read_coverage(&self, words: &mut [u32; N_COV_POINTS_W]) {
        *words = self.coverage;
    }

    fn read_asserts(&self, words: &mut [u32; N_ASSERTS_W]) {
        *words = self.asserts;
    }

    fn trace_dump(&mut self, time: u64) {
        if let Some(writer) = &mut self.trace {
            let _ = writeln!(
                writer,
                "#{time} pc={:08x} acc={:08x} lfsr={:08x} fifo={}",
                self.pc, self.acc, self.lfsr, self.fifo_depth
            );
        }
    }
}

impl std::fmt::Debug for DemoSoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoSoc")
            .field("pc", &self.pc)
            .field("acc", &self.acc)
            .field("lfsr", &self.lfsr)
            .field("fifo_depth", &self.fifo_depth)
            .finish_non_exhaustive()
    }
}
