//! Main and sub processor memory.
//!
//! The master processor sees 64K of RAM and nothing else. Its boot ROM is
//! never mapped: at reset the ROM image is copied over the first 4K of RAM
//! and the processor runs the copy, which software may then patch.
//!
//! The slave processor sees:
//!
//! | Range       | Contents                                   |
//! |-------------|--------------------------------------------|
//! | 0000-2FFF   | ROM (8K image, remainder reads 0xFF)       |
//! | 3000-7FFF   | RAM                                        |
//! | 8000-FFFF   | video RAM (32K), also read by the renderer |

/// Size of the region the boot overlay writes.
pub const BOOT_SIZE: usize = 0x1000;

const SUB_ROM_END: u16 = 0x3000;
const SUB_RAM_END: u16 = 0x8000;

/// Video RAM size. Renderer addresses wrap at this size.
pub const VRAM_SIZE: usize = 0x8000;

/// Master processor RAM.
pub struct MainMemory {
    ram: Vec<u8>,
    boot_rom: Vec<u8>,
}

impl MainMemory {
    /// RAM at power-on: the boot region reads 0xFF, the rest zero.
    #[must_use]
    pub fn new(boot_rom: &[u8]) -> Self {
        let mut ram = vec![0; 0x1_0000];
        ram[..BOOT_SIZE].fill(0xFF);
        Self {
            ram,
            boot_rom: boot_rom.to_vec(),
        }
    }

    /// Copy the boot ROM image over the start of RAM.
    ///
    /// Runs at every reset. The region stays ordinary RAM afterwards.
    pub fn apply_boot_overlay(&mut self) {
        let len = self.boot_rom.len().min(BOOT_SIZE);
        self.ram[..len].copy_from_slice(&self.boot_rom[..len]);
    }

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }
}

/// Slave processor ROM, RAM and video RAM.
pub struct SubMemory {
    rom: Vec<u8>,
    ram: Vec<u8>,
    vram: Vec<u8>,
}

impl SubMemory {
    /// Place the ROM image at the bottom of the 12K ROM window.
    #[must_use]
    pub fn new(rom_image: &[u8]) -> Self {
        let mut rom = vec![0xFF; SUB_ROM_END as usize];
        let len = rom_image.len().min(rom.len());
        rom[..len].copy_from_slice(&rom_image[..len]);
        Self {
            rom,
            ram: vec![0; (SUB_RAM_END - SUB_ROM_END) as usize],
            vram: vec![0; VRAM_SIZE],
        }
    }

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0..SUB_ROM_END => self.rom[addr as usize],
            SUB_ROM_END..SUB_RAM_END => self.ram[(addr - SUB_ROM_END) as usize],
            _ => self.vram[(addr - SUB_RAM_END) as usize],
        }
    }

    /// Write a byte. ROM ignores writes.
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0..SUB_ROM_END => {}
            SUB_ROM_END..SUB_RAM_END => self.ram[(addr - SUB_ROM_END) as usize] = value,
            _ => self.vram[(addr - SUB_RAM_END) as usize] = value,
        }
    }

    /// Video RAM as the renderer sees it (offset 0 = CPU address 0x8000).
    #[must_use]
    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    pub fn vram_mut(&mut self) -> &mut [u8] {
        &mut self.vram
    }
}
