//! Sanyo MBC-200 emulator.
//!
//! A dual-Z80 business computer from 1982. The master processor runs the
//! disk operating system out of 64K of RAM and owns the floppy controller,
//! keyboard and serial port; the slave processor owns the HD46505 CRTC and
//! 32K of bitmap video RAM and takes display commands from the master one
//! byte at a time through a latch. The system ticks at 8 MHz (master
//! crystal); both CPUs run at 4 MHz and the CRTC at 2 MHz, all derived by
//! integer division.
//!
//! The Z80 core is supplied by the host through [`emu_core::Cpu`].

mod beeper;
mod bus;
#[cfg(feature = "capture")]
pub mod capture;
mod comm;
mod config;
mod error;
pub mod input;
mod keyboard;
mod mbc200;
mod memory;
pub mod video;

pub use beeper::BeeperState;
pub use bus::{MainBus, Mbc200Bus, SubBus, select_floppy};
pub use comm::CommLatch;
pub use config::{
    DEFAULT_BEEPER_FREQUENCY, DEFAULT_SAMPLE_RATE, MAIN_ROM_FILE, MAIN_ROM_SHA1, MAIN_ROM_SIZE,
    Mbc200Config, Mbc200Model, SUB_ROM_FILE, SUB_ROM_SHA1, SUB_ROM_SIZE, sha1_hex,
};
pub use error::Mbc200Error;
pub use fujitsu_mb8876::{DiskImage, Geometry, ImageError};
pub use input::{InputEvent, InputQueue};
pub use keyboard::{KeyboardLatch, translate};
pub use mbc200::{MASTER_CLOCK_HZ, Mbc200};
pub use memory::{BOOT_SIZE, MainMemory, SubMemory, VRAM_SIZE};
pub use video::{Display, PALETTE, SCREEN_HEIGHT, SCREEN_WIDTH, render_row};
