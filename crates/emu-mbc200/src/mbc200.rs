//! Top-level MBC-200 system.
//!
//! The master crystal runs at 8 MHz. All component timing derives from it:
//! - master and slave Z80: every 2 crystal ticks (4 MHz), master first
//! - HD46505 character clock: every 4 crystal ticks (2 MHz)
//!
//! Both processors advance one T-state at a time on the same timeline, so
//! a comm latch write by the master is visible to any later slave read
//! without further synchronisation.
//!
//! # Frame loop
//!
//! `run_frame()` runs 160,000 crystal ticks (8 MHz / 50 Hz). The CRTC's
//! own frame length depends on how the slave programs it; rows are drawn
//! as the CRTC publishes them.

#![allow(clippy::cast_possible_truncation)]

use std::fs;
use std::path::Path;

use emu_core::{Cpu, MasterClock, Observable, Tickable, Value, parse_address};
use fujitsu_mb8876::DiskImage;

use crate::bus::Mbc200Bus;
use crate::config::{
    MAIN_ROM_FILE, MAIN_ROM_SIZE, Mbc200Config, Mbc200Model, SUB_ROM_FILE, SUB_ROM_SIZE,
    check_rom_size,
};
use crate::error::Mbc200Error;
use crate::input::InputQueue;
use crate::memory::VRAM_SIZE;
use crate::video::{Display, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Master crystal frequency.
pub const MASTER_CLOCK_HZ: u64 = 8_000_000;

/// Crystal ticks per CPU T-state (4 MHz).
const CPU_DIVIDER: u64 = 2;

/// Crystal ticks per CRTC character clock (2 MHz).
const CRTC_DIVIDER: u64 = 4;

const FRAMES_PER_SECOND: u64 = 50;

/// Sanyo MBC-200 system, generic over the Z80 core.
pub struct Mbc200<C: Cpu> {
    model: Mbc200Model,
    main_cpu: C,
    sub_cpu: C,
    bus: Mbc200Bus,
    display: Display,
    clock: MasterClock,
    /// Master crystal tick counter.
    master_clock: u64,
    frame_count: u64,
    input_queue: InputQueue,
}

impl<C: Cpu> Mbc200<C> {
    /// Build the machine and perform a power-on reset.
    pub fn new(config: &Mbc200Config, main_cpu: C, sub_cpu: C) -> Result<Self, Mbc200Error> {
        check_rom_size(MAIN_ROM_FILE, &config.main_rom, MAIN_ROM_SIZE)?;
        check_rom_size(SUB_ROM_FILE, &config.sub_rom, SUB_ROM_SIZE)?;

        let clock = MasterClock::new(MASTER_CLOCK_HZ);
        let bus = Mbc200Bus::new(config, clock.divided(CPU_DIVIDER) as u32);

        let mut machine = Self {
            model: config.model,
            main_cpu,
            sub_cpu,
            bus,
            display: Display::new(),
            clock,
            master_clock: 0,
            frame_count: 0,
            input_queue: InputQueue::new(),
        };
        machine.reset();
        Ok(machine)
    }

    /// Reset both processors and the board. The boot ROM is copied back
    /// over main RAM; the comm and keyboard latches keep their contents.
    pub fn reset(&mut self) {
        log::debug!("{} reset", self.model.name());
        self.bus.reset();
        self.main_cpu.reset();
        self.sub_cpu.reset();
    }

    /// Run one frame: deliver queued input, then 160,000 crystal ticks.
    ///
    /// Returns the number of crystal ticks executed.
    pub fn run_frame(&mut self) -> u64 {
        self.input_queue
            .process(self.frame_count, &mut self.bus.keyboard);
        self.frame_count += 1;

        let ticks = self.clock.ticks_per_frame(FRAMES_PER_SECOND);
        self.tick_n(ticks);
        ticks.get()
    }

    #[must_use]
    pub fn model(&self) -> Mbc200Model {
        self.model
    }

    /// Framebuffer (ARGB32, 640x400).
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        self.display.framebuffer()
    }

    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        SCREEN_WIDTH
    }

    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        SCREEN_HEIGHT
    }

    /// Take the audio buffer (drains it).
    pub fn take_audio_buffer(&mut self) -> Vec<f32> {
        self.bus.beeper.take_buffer()
    }

    #[must_use]
    pub fn main_cpu(&self) -> &C {
        &self.main_cpu
    }

    pub fn main_cpu_mut(&mut self) -> &mut C {
        &mut self.main_cpu
    }

    #[must_use]
    pub fn sub_cpu(&self) -> &C {
        &self.sub_cpu
    }

    pub fn sub_cpu_mut(&mut self) -> &mut C {
        &mut self.sub_cpu
    }

    #[must_use]
    pub fn bus(&self) -> &Mbc200Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Mbc200Bus {
        &mut self.bus
    }

    /// Crystal ticks since power-on.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Timed input queue for scripted typing.
    pub fn input_queue(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }

    /// A key arrives from the keyboard now.
    pub fn key_press(&mut self, code: u8) {
        self.bus.keyboard.put(code);
    }

    /// Insert a disk, returning the one it replaces.
    pub fn insert_disk(
        &mut self,
        unit: usize,
        image: DiskImage,
    ) -> Result<Option<DiskImage>, Mbc200Error> {
        let drive = self
            .bus
            .fdc
            .drive_mut(unit)
            .ok_or(Mbc200Error::NoSuchDrive { unit })?;
        log::debug!("disk inserted in drive {unit}");
        Ok(drive.insert_disk(image))
    }

    /// Load a raw image file into a drive. The geometry comes from the
    /// file size.
    pub fn insert_disk_file(
        &mut self,
        unit: usize,
        path: &Path,
    ) -> Result<Option<DiskImage>, Mbc200Error> {
        let data = fs::read(path).map_err(|source| Mbc200Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = DiskImage::from_bytes(data)?;
        log::debug!("loaded {} for drive {unit}", path.display());
        self.insert_disk(unit, image)
    }

    /// Eject the disk from a drive, handing it back (with any writes).
    pub fn eject_disk(&mut self, unit: usize) -> Option<DiskImage> {
        let image = self.bus.fdc.drive_mut(unit)?.eject_disk();
        if image.is_some() {
            log::debug!("disk ejected from drive {unit}");
        }
        image
    }

    fn query_cpu(cpu: &C, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(Value::U16(cpu.pc() as u16)),
            "halted" => Some(cpu.is_halted().into()),
            _ => None,
        }
    }
}

impl<C: Cpu> Tickable for Mbc200<C> {
    fn tick(&mut self) {
        self.master_clock += 1;

        if self.master_clock.is_multiple_of(CPU_DIVIDER) {
            self.main_cpu.tick(&mut self.bus.main());
            self.sub_cpu.tick(&mut self.bus.sub());
            self.bus.beeper.sample();
        }

        if self.master_clock.is_multiple_of(CRTC_DIVIDER) {
            self.bus.crtc.tick();
            if let Some(row) = self.bus.crtc.take_row() {
                self.display.draw(row, self.bus.sub_memory.vram());
            }
        }
    }
}

impl<C: Cpu> Observable for Mbc200<C> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("main.") {
            Self::query_cpu(&self.main_cpu, rest)
        } else if let Some(rest) = path.strip_prefix("sub.") {
            Self::query_cpu(&self.sub_cpu, rest)
        } else if let Some(rest) = path.strip_prefix("ppi_m.") {
            self.bus.ppi_m.query(rest)
        } else if let Some(rest) = path.strip_prefix("ppi_1.") {
            self.bus.ppi_1.query(rest)
        } else if let Some(rest) = path.strip_prefix("ppi_2.") {
            self.bus.ppi_2.query(rest)
        } else if let Some(rest) = path.strip_prefix("crtc.") {
            self.bus.crtc.query(rest)
        } else if let Some(rest) = path.strip_prefix("fdc.") {
            self.bus.fdc.query(rest)
        } else if let Some(rest) = path.strip_prefix("uart2.") {
            self.bus.uart2.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.main.") {
            parse_address(rest).map(|a| Value::U8(self.bus.main_memory.read(a)))
        } else if let Some(rest) = path.strip_prefix("memory.sub.") {
            parse_address(rest).map(|a| Value::U8(self.bus.sub_memory.read(a)))
        } else if let Some(rest) = path.strip_prefix("vram.") {
            parse_address(rest).map(|a| {
                Value::U8(self.bus.sub_memory.vram()[a as usize & (VRAM_SIZE - 1)])
            })
        } else {
            match path {
                "master_clock" => Some(self.master_clock.into()),
                "frame_count" => Some(self.frame_count.into()),
                "comm_latch" => Some(self.bus.comm.peek().into()),
                "keyboard.pending" => Some(self.bus.keyboard.pending().into()),
                "beeper.tone" => Some(self.bus.beeper.tone_enabled().into()),
                "beeper.speaker" => Some(self.bus.beeper.speaker().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "main.pc",
            "main.halted",
            "sub.pc",
            "sub.halted",
            "ppi_m.<ppi_paths>",
            "ppi_1.<ppi_paths>",
            "ppi_2.<ppi_paths>",
            "crtc.<crtc_paths>",
            "fdc.<fdc_paths>",
            "uart2.<usart_paths>",
            "memory.main.<address>",
            "memory.sub.<address>",
            "vram.<offset>",
            "master_clock",
            "frame_count",
            "comm_latch",
            "keyboard.pending",
            "beeper.tone",
            "beeper.speaker",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::Bus;
    use fujitsu_mb8876::{FloppyDrive, Geometry, ImageError};

    /// Counts ticks and resets; never touches the bus.
    #[derive(Default)]
    struct IdleCpu {
        ticks: u64,
        resets: u32,
    }

    impl Cpu for IdleCpu {
        type Registers = ();

        fn tick<B: Bus>(&mut self, _bus: &mut B) {
            self.ticks += 1;
        }

        fn pc(&self) -> u32 {
            0x1234
        }

        fn registers(&self) {}

        fn is_halted(&self) -> bool {
            false
        }

        fn interrupt(&mut self) -> bool {
            false
        }

        fn nmi(&mut self) {}

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn config(model: Mbc200Model) -> Mbc200Config {
        let main_rom = (0..MAIN_ROM_SIZE).map(|i| i as u8).collect();
        Mbc200Config::new(model, main_rom, vec![0xC3; SUB_ROM_SIZE])
    }

    fn make(model: Mbc200Model) -> Mbc200<IdleCpu> {
        Mbc200::new(&config(model), IdleCpu::default(), IdleCpu::default()).expect("valid ROMs")
    }

    #[test]
    fn rejects_wrong_rom_size() {
        let mut cfg = config(Mbc200Model::Mbc200);
        cfg.sub_rom.truncate(4096);
        let err = Mbc200::new(&cfg, IdleCpu::default(), IdleCpu::default())
            .err()
            .expect("short sub ROM");
        assert!(matches!(
            err,
            Mbc200Error::RomSize {
                expected: 8192,
                actual: 4096,
                ..
            }
        ));
    }

    #[test]
    fn new_performs_reset() {
        let machine = make(Mbc200Model::Mbc200);
        assert_eq!(machine.main_cpu().resets, 1);
        assert_eq!(machine.sub_cpu().resets, 1);
        assert_eq!(machine.query("memory.main.0x0005"), Some(Value::U8(5)));
    }

    #[test]
    fn cpus_run_at_half_the_crystal() {
        let mut machine = make(Mbc200Model::Mbc200);
        machine.tick();
        assert_eq!(machine.master_clock(), 1);
        assert_eq!(machine.main_cpu().ticks, 0);
        machine.tick();
        assert_eq!(machine.main_cpu().ticks, 1);
        assert_eq!(machine.sub_cpu().ticks, 1);
    }

    #[test]
    fn run_frame_is_160000_ticks() {
        let mut machine = make(Mbc200Model::Mbc200);
        assert_eq!(machine.run_frame(), 160_000);
        assert_eq!(machine.frame_count(), 1);
        assert_eq!(machine.main_cpu().ticks, 80_000);
        assert_eq!(machine.sub_cpu().ticks, 80_000);
        let samples = machine.take_audio_buffer().len();
        assert!((950..=960).contains(&samples), "~960 samples per frame, got {samples}");
    }

    #[test]
    fn framebuffer_size() {
        let machine = make(Mbc200Model::Mbc200);
        assert_eq!(machine.framebuffer_width(), 640);
        assert_eq!(machine.framebuffer_height(), 400);
        assert_eq!(machine.framebuffer().len(), 640 * 400);
    }

    #[test]
    fn reset_restores_boot_image_and_keeps_latches() {
        let mut machine = make(Mbc200Model::Mbc200);
        machine.bus_mut().main_memory.write(0x0000, 0xAA);
        machine.bus_mut().comm.write(0x33);
        machine.key_press(b'k');

        machine.reset();
        assert_eq!(machine.query("memory.main.0"), Some(Value::U8(0)));
        assert_eq!(machine.query("comm_latch"), Some(Value::U8(0x33)));
        assert_eq!(machine.query("keyboard.pending"), Some(Value::U8(b'k')));
    }

    #[test]
    fn queued_input_reaches_latch_at_frame_start() {
        let mut machine = make(Mbc200Model::Mbc200);
        machine.input_queue().enqueue_key(b'z', 1);
        machine.run_frame();
        assert_eq!(machine.bus().keyboard.pending(), 0);
        machine.run_frame();
        assert_eq!(machine.bus().keyboard.pending(), b'z');
    }

    #[test]
    fn disk_slots_follow_model() {
        let mut machine = make(Mbc200Model::Mbc1200);
        let disk = DiskImage::blank(Geometry::MBC200).expect("valid geometry");
        assert!(matches!(
            machine.insert_disk(1, disk.clone()),
            Err(Mbc200Error::NoSuchDrive { unit: 1 })
        ));
        assert!(machine.insert_disk(0, disk).expect("drive 0").is_none());
        assert!(machine.eject_disk(0).is_some());
        assert!(machine.eject_disk(0).is_none());
        assert!(machine.eject_disk(1).is_none());
    }

    #[test]
    fn disk_files_are_sized_on_load() {
        let dir = std::env::temp_dir().join(format!("mbc200-disks-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let mut machine = make(Mbc200Model::Mbc200);

        let good = dir.join("system.img");
        fs::write(&good, vec![0xE5; Geometry::MBC200.image_size()]).expect("write image");
        assert!(machine.insert_disk_file(0, &good).expect("loads").is_none());
        assert_eq!(
            machine.bus().fdc.drive(0).and_then(FloppyDrive::disk).map(DiskImage::geometry),
            Some(Geometry::MBC200)
        );

        let odd = dir.join("odd.img");
        fs::write(&odd, vec![0; 1000]).expect("write image");
        let err = machine.insert_disk_file(1, &odd).err().expect("unknown size");
        assert!(
            matches!(err, Mbc200Error::Disk(ImageError::UnknownSize(1000))),
            "got {err}"
        );

        let err = machine
            .insert_disk_file(1, &dir.join("missing.img"))
            .err()
            .expect("no such file");
        assert!(matches!(err, Mbc200Error::Io { .. }), "got {err}");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn observable_routing() {
        let mut machine = make(Mbc200Model::Mbc200);
        assert_eq!(machine.query("main.pc"), Some(Value::U16(0x1234)));
        assert_eq!(machine.query("sub.halted"), Some(Value::Bool(false)));
        assert_eq!(machine.query("ppi_m.control"), Some(Value::U8(0x9B)));
        assert_eq!(machine.query("crtc.r0"), Some(Value::U8(0)));
        assert!(machine.query("fdc.status").is_some());
        assert!(machine.query("uart2.mode").is_some());
        assert_eq!(machine.query("memory.sub.0x0000"), Some(Value::U8(0xC3)));

        machine.bus_mut().sub_memory.write(0x8010, 0x5A);
        assert_eq!(machine.query("vram.0x10"), Some(Value::U8(0x5A)));
        assert_eq!(machine.query("vram.0x8010"), Some(Value::U8(0x5A)), "offset wraps");
        assert_eq!(machine.query("nonsense"), None);
    }
}
