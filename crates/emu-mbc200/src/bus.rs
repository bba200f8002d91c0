//! MBC-200 buses: memory and I/O routing for both processors.
//!
//! All devices live in one [`Mbc200Bus`]. Each processor gets a borrowed
//! view of it ([`MainBus`] for the master, [`SubBus`] for the slave) that
//! decodes that processor's address and port maps.
//!
//! # Master I/O (port & 0xFF)
//!
//! | Port  | Device                                  |
//! |-------|-----------------------------------------|
//! | E0-E1 | keyboard latch (data, status), read only |
//! | E4-E7 | MB8876 FDC                              |
//! | E8-EB | ppi_m                                   |
//! | EC-ED | uart2 (data, control/status)            |
//!
//! # Slave I/O (port & 0xFF)
//!
//! | Port  | Device                                  |
//! |-------|-----------------------------------------|
//! | 70-73 | ppi_1                                   |
//! | B0    | CRTC status / address                   |
//! | B1    | CRTC register                           |
//! | D0-D3 | ppi_2                                   |
//!
//! # PPI wiring
//!
//! - ppi_m port A out: comm latch write.
//! - ppi_m port B out: floppy and key-click select.
//! - ppi_1 port C out: speaker level (PC4).
//! - ppi_2 port A in: comm latch read, acknowledged on ppi_m PC6.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Bus, ReadResult};
use fujitsu_mb8876::Mb8876;
use intel_8251::Usart8251;
use intel_8255::{PortHandler, Ppi8255};
use motorola_6845::{Crtc6845, Variant};

use crate::beeper::BeeperState;
use crate::comm::CommLatch;
use crate::config::Mbc200Config;
use crate::keyboard::KeyboardLatch;
use crate::memory::{MainMemory, SubMemory};

/// Every device on the board.
pub struct Mbc200Bus {
    pub main_memory: MainMemory,
    pub sub_memory: SubMemory,
    pub keyboard: KeyboardLatch,
    pub comm: CommLatch,
    pub ppi_m: Ppi8255,
    pub ppi_1: Ppi8255,
    pub ppi_2: Ppi8255,
    pub crtc: Crtc6845,
    pub uart2: Usart8251,
    pub fdc: Mb8876,
    pub beeper: BeeperState,
}

impl Mbc200Bus {
    #[must_use]
    pub fn new(config: &Mbc200Config, cpu_frequency: u32) -> Self {
        Self {
            main_memory: MainMemory::new(&config.main_rom),
            sub_memory: SubMemory::new(&config.sub_rom),
            keyboard: KeyboardLatch::new(),
            comm: CommLatch::new(),
            ppi_m: Ppi8255::new(),
            ppi_1: Ppi8255::new(),
            ppi_2: Ppi8255::new(),
            crtc: Crtc6845::new(Variant::Hd46505Sp),
            uart2: Usart8251::new(),
            fdc: Mb8876::new(config.model.drive_count()),
            beeper: BeeperState::new(cpu_frequency, config.beeper_frequency, config.sample_rate),
        }
    }

    /// Board reset: boot overlay and chip resets. The comm and keyboard
    /// latches are not on the reset line and keep their contents.
    pub fn reset(&mut self) {
        self.main_memory.apply_boot_overlay();
        self.ppi_m.reset();
        self.ppi_1.reset();
        self.ppi_2.reset();
        self.crtc.reset();
        self.uart2.reset();
        self.fdc.reset();
    }

    /// View for the master processor.
    pub fn main(&mut self) -> MainBus<'_> {
        MainBus(self)
    }

    /// View for the slave processor.
    pub fn sub(&mut self) -> SubBus<'_> {
        SubBus(self)
    }

    fn master_ports(&mut self) -> (&mut Ppi8255, MasterPorts<'_>) {
        (
            &mut self.ppi_m,
            MasterPorts {
                comm: &mut self.comm,
                fdc: &mut self.fdc,
                beeper: &mut self.beeper,
            },
        )
    }
}

/// Drive the floppy select lines and key-click gate from a ppi_m port B
/// byte.
///
/// Bit 0 picks the unit; the unit's motor turns on and bit 7 selects its
/// side. A unit the model doesn't have leaves the FDC with no drive.
/// Bit 1 gates the key-click tone either way.
pub fn select_floppy(fdc: &mut Mb8876, beeper: &mut BeeperState, value: u8) {
    let unit = usize::from(value & 0x01);
    if let Some(drive) = fdc.drive_mut(unit) {
        drive.set_motor(true);
        drive.set_side(value >> 7);
        fdc.select(Some(unit));
    } else {
        fdc.select(None);
    }
    beeper.set_tone(value & 0x02 != 0);
}

/// ppi_m's pins.
struct MasterPorts<'a> {
    comm: &'a mut CommLatch,
    fdc: &'a mut Mb8876,
    beeper: &'a mut BeeperState,
}

impl PortHandler for MasterPorts<'_> {
    fn write_a(&mut self, value: u8) {
        self.comm.write(value);
    }

    fn clear_a(&mut self) {
        self.comm.clear();
    }

    fn write_b(&mut self, value: u8) {
        select_floppy(self.fdc, self.beeper, value);
    }
}

/// ppi_1's pins: PC4 is the speaker.
struct SpeakerPort<'a>(&'a mut BeeperState);

impl PortHandler for SpeakerPort<'_> {
    fn write_c(&mut self, value: u8) {
        self.0.set_speaker(value & 0x10 != 0);
    }
}

/// ppi_2's pins. Port A reads the comm latch and acknowledges on ppi_m.
struct SlavePorts<'a> {
    ppi_m: &'a mut Ppi8255,
    master: MasterPorts<'a>,
}

impl PortHandler for SlavePorts<'_> {
    fn read_a(&mut self) -> u8 {
        let value = self.master.comm.take();
        self.ppi_m.set_port_c_line(6, false, &mut self.master);
        value
    }
}

/// Master processor's view: 64K RAM and the master I/O map.
pub struct MainBus<'a>(pub &'a mut Mbc200Bus);

impl Bus for MainBus<'_> {
    fn read(&mut self, address: u32) -> ReadResult {
        ReadResult::new(self.0.main_memory.read(address as u16))
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        self.0.main_memory.write(address as u16, value);
        0
    }

    fn io_read(&mut self, port: u32) -> ReadResult {
        let port = port as u8;
        let bus = &mut *self.0;
        let data = match port {
            0xE0..=0xE1 => bus.keyboard.read(port & 1),
            0xE4..=0xE7 => bus.fdc.read(port & 3),
            0xE8..=0xEB => {
                let (ppi, mut ports) = bus.master_ports();
                ppi.read(port & 3, &mut ports)
            }
            0xEC..=0xED => bus.uart2.read(port & 1),
            _ => {
                log::trace!("main: unmapped I/O read {port:#04X}");
                0xFF
            }
        };
        ReadResult::new(data)
    }

    fn io_write(&mut self, port: u32, value: u8) -> u8 {
        let port = port as u8;
        let bus = &mut *self.0;
        match port {
            0xE0..=0xE1 => {}
            0xE4..=0xE7 => bus.fdc.write(port & 3, value),
            0xE8..=0xEB => {
                let (ppi, mut ports) = bus.master_ports();
                ppi.write(port & 3, value, &mut ports);
            }
            0xEC..=0xED => bus.uart2.write(port & 1, value),
            _ => log::trace!("main: unmapped I/O write {port:#04X} = {value:#04X}"),
        }
        0
    }
}

/// Slave processor's view: ROM, RAM, video RAM and the slave I/O map.
pub struct SubBus<'a>(pub &'a mut Mbc200Bus);

impl Bus for SubBus<'_> {
    fn read(&mut self, address: u32) -> ReadResult {
        ReadResult::new(self.0.sub_memory.read(address as u16))
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        self.0.sub_memory.write(address as u16, value);
        0
    }

    fn io_read(&mut self, port: u32) -> ReadResult {
        let port = port as u8;
        let bus = &mut *self.0;
        let data = match port {
            0x70..=0x73 => bus.ppi_1.read(port & 3, &mut SpeakerPort(&mut bus.beeper)),
            0xB0 | 0xB1 => bus.crtc.read(port & 1),
            0xD0..=0xD3 => {
                let mut ports = SlavePorts {
                    ppi_m: &mut bus.ppi_m,
                    master: MasterPorts {
                        comm: &mut bus.comm,
                        fdc: &mut bus.fdc,
                        beeper: &mut bus.beeper,
                    },
                };
                bus.ppi_2.read(port & 3, &mut ports)
            }
            _ => {
                log::trace!("sub: unmapped I/O read {port:#04X}");
                0xFF
            }
        };
        ReadResult::new(data)
    }

    fn io_write(&mut self, port: u32, value: u8) -> u8 {
        let port = port as u8;
        let bus = &mut *self.0;
        match port {
            0x70..=0x73 => bus.ppi_1.write(port & 3, value, &mut SpeakerPort(&mut bus.beeper)),
            0xB0 | 0xB1 => bus.crtc.write(port & 1, value),
            0xD0..=0xD3 => {
                let mut ports = SlavePorts {
                    ppi_m: &mut bus.ppi_m,
                    master: MasterPorts {
                        comm: &mut bus.comm,
                        fdc: &mut bus.fdc,
                        beeper: &mut bus.beeper,
                    },
                };
                bus.ppi_2.write(port & 3, value, &mut ports);
            }
            _ => log::trace!("sub: unmapped I/O write {port:#04X} = {value:#04X}"),
        }
        0
    }
}
