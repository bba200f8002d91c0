//! MBC-200 model configuration and ROM loading.

use std::fs;
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::error::Mbc200Error;

/// Master processor boot ROM (2732 EPROM).
pub const MAIN_ROM_FILE: &str = "d2732a.bin";
pub const MAIN_ROM_SIZE: usize = 4096;
pub const MAIN_ROM_SHA1: &str = "baa3a20a5b01745a390ef16628dc18f8d682d63b";

/// Slave processor ROM (2764 EPROM).
pub const SUB_ROM_FILE: &str = "m5l2764.bin";
pub const SUB_ROM_SIZE: usize = 8192;
pub const SUB_ROM_SHA1: &str = "8563172f9e7f84330378a8d179f4138be5fda099";

/// Key-click tone frequency. The real value is not documented.
pub const DEFAULT_BEEPER_FREQUENCY: u32 = 1000;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Sanyo MBC-200 family members. They share the board and differ in the
/// number of floppy drives fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mbc200Model {
    Mbc200,
    /// Export model, one drive.
    Mbc1200,
    Mbc1250,
}

impl Mbc200Model {
    #[must_use]
    pub const fn drive_count(self) -> usize {
        match self {
            Self::Mbc1200 => 1,
            Self::Mbc200 | Self::Mbc1250 => 2,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mbc200 => "MBC-200",
            Self::Mbc1200 => "MBC-1200",
            Self::Mbc1250 => "MBC-1250",
        }
    }
}

/// Configuration for creating an MBC-200 instance.
pub struct Mbc200Config {
    pub model: Mbc200Model,
    /// Master boot ROM. Must be 4,096 bytes.
    pub main_rom: Vec<u8>,
    /// Slave ROM. Must be 8,192 bytes.
    pub sub_rom: Vec<u8>,
    /// Key-click tone frequency in Hz.
    pub beeper_frequency: u32,
    /// Audio output sample rate in Hz.
    pub sample_rate: u32,
}

impl Mbc200Config {
    #[must_use]
    pub fn new(model: Mbc200Model, main_rom: Vec<u8>, sub_rom: Vec<u8>) -> Self {
        Self {
            model,
            main_rom,
            sub_rom,
            beeper_frequency: DEFAULT_BEEPER_FREQUENCY,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Load both ROMs from a directory holding the standard dump files.
    ///
    /// Sizes must match. A hash that differs from the known dump is logged
    /// and accepted, so patched ROMs still load.
    pub fn from_rom_dir(model: Mbc200Model, dir: &Path) -> Result<Self, Mbc200Error> {
        let main_rom = load_rom(dir, MAIN_ROM_FILE, MAIN_ROM_SIZE, MAIN_ROM_SHA1)?;
        let sub_rom = load_rom(dir, SUB_ROM_FILE, SUB_ROM_SIZE, SUB_ROM_SHA1)?;
        log::debug!("{}: ROMs loaded from {}", model.name(), dir.display());
        Ok(Self::new(model, main_rom, sub_rom))
    }
}

fn load_rom(
    dir: &Path,
    name: &'static str,
    size: usize,
    sha1: &str,
) -> Result<Vec<u8>, Mbc200Error> {
    let path = dir.join(name);
    let data = fs::read(&path).map_err(|source| Mbc200Error::Io {
        path: path.clone(),
        source,
    })?;
    check_rom_size(name, &data, size)?;
    let digest = sha1_hex(&data);
    if digest != sha1 {
        log::warn!("{name}: SHA-1 {digest} does not match the known dump {sha1}");
    }
    Ok(data)
}

pub(crate) fn check_rom_size(
    name: &'static str,
    data: &[u8],
    expected: usize,
) -> Result<(), Mbc200Error> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(Mbc200Error::RomSize {
            name,
            expected,
            actual: data.len(),
        })
    }
}

/// Lowercase hex SHA-1 of a ROM image.
#[must_use]
pub fn sha1_hex(data: &[u8]) -> String {
    format!("{:x}", Sha1::digest(data))
}
