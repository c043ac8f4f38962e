//! Locations of the memory images the simulated design loads at start-up.
//!
//! Both variables are required; a missing one aborts the run with a
//! diagnostic instead of fuzzing an empty machine.

use std::{env, fs, path::PathBuf};

use anyhow::{Context, bail};

const SRAM_ELF_VAR: &str = "SIMSRAMELF";
const ROM_ELF_VAR: &str = "SIMROMELF";

pub fn sram_image() -> anyhow::Result<Vec<u8>> {
    read_image(required_path(SRAM_ELF_VAR)?)
}

pub fn rom_image() -> anyhow::Result<Vec<u8>> {
    read_image(required_path(ROM_ELF_VAR)?)
}

fn required_path(var: &str) -> anyhow::Result<PathBuf> {
    match env::var_os(var) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => bail!("{var} required"),
    }
}

fn read_image(path: PathBuf) -> anyhow::Result<Vec<u8>> {
    let image =
        fs::read(&path).with_context(|| format!("Reading {}", path.display()))?;
    if image.is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(image)
}
