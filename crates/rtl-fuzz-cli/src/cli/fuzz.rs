use std::path::PathBuf;

use anyhow::Context;
use libafl_bolts::{current_nanos, rands::StdRand};
use rtl_fuzz::{Testbench, driver};
use tracing::info;

use super::GlobalOptions;
use crate::{dut::DemoSoc, elf_env};

/// Fuzzes the built-in design until the corpus is exhausted.
#[derive(Debug, clap::Parser)]
pub struct FuzzCommand {
    /// Text trace of the design state, one line per evaluation.
    #[clap(long)]
    trace_file: Option<PathBuf>,
}

impl FuzzCommand {
    pub fn run(self, global_options: GlobalOptions) -> anyhow::Result<()> {
        let rom = elf_env::rom_image().context("Loading boot-ROM image")?;
        let sram = elf_env::sram_image().context("Loading SRAM image")?;

        let random_seed = global_options.random_seed.unwrap_or_else(current_nanos);
        info!(random_seed, "PRNG stream seeded");
        let mut rand = StdRand::with_seed(random_seed);

        let dut = DemoSoc::new(rom, sram, self.trace_file.as_deref())
            .context("Constructing the design")?;
        let mut tb = Testbench::new(dut);

        let report = driver::fuzz(&mut tb, &mut rand).context("Fuzzing run")?;
        info!(%report, "run complete");
        Ok(())
    }
}
