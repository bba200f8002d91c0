//! Motorola 6845 CRT Controller and the Hitachi HD46505SP second source.
//!
//! The CRTC generates raster timing and video memory addresses. It never
//! touches memory itself: at the start of each displayed scanline it
//! publishes a [`RasterRow`] describing which character row and which line
//! within the character cell is being drawn, and the machine turns that
//! into pixels.
//!
//! # Register interface
//!
//! - Offset 0 write: address register (selects R0-R17).
//! - Offset 0 read: status (neither variant implements status bits; reads 0).
//! - Offset 1: selected register.
//!
//! | Reg | Name                   | Reg | Name                  |
//! |-----|------------------------|-----|-----------------------|
//! | R0  | horizontal total       | R9  | max raster address    |
//! | R1  | horizontal displayed   | R10 | cursor start          |
//! | R2  | hsync position         | R11 | cursor end            |
//! | R3  | sync widths            | R12 | start address (high)  |
//! | R4  | vertical total         | R13 | start address (low)   |
//! | R5  | vertical total adjust  | R14 | cursor (high)         |
//! | R6  | vertical displayed     | R15 | cursor (low)          |
//! | R7  | vsync position         | R16 | light pen (high)      |
//! | R8  | interlace and skew     | R17 | light pen (low)       |
//!
//! # Timing
//!
//! Ticked once per character clock. A scanline is R0 + 1 characters, a
//! character row is R9 + 1 scanlines, a frame is R4 + 1 rows plus R5
//! adjust scanlines. Interlace is not modelled.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Observable, Tickable, Value};

/// Writable bits per register.
const WRITE_MASK_MC6845: [u8; 18] = [
    0xFF, 0xFF, 0xFF, 0x0F, 0x7F, 0x1F, 0x7F, 0x7F, 0x03, 0x1F, 0x7F, 0x1F, 0x3F, 0xFF, 0x3F,
    0xFF, 0x00, 0x00,
];

/// The HD46505SP adds a programmable vsync width (R3 high nibble) and skew
/// bits in R8.
const WRITE_MASK_HD46505SP: [u8; 18] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x1F, 0x7F, 0x7F, 0xF3, 0x1F, 0x7F, 0x1F, 0x3F, 0xFF, 0x3F,
    0xFF, 0x00, 0x00,
];

/// Query paths for the register file.
const REGISTER_PATHS: [&str; 18] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13", "r14",
    "r15", "r16", "r17",
];

/// Chip variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Motorola MC6845.
    Mc6845,
    /// Hitachi HD46505SP (HD6845S).
    Hd46505Sp,
}

/// One displayed scanline, as handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterRow {
    /// Displayed scanline number, 0 at the top of the frame.
    pub y: u16,
    /// 14-bit memory address of the first character on the row.
    pub ma: u16,
    /// Raster address: scanline within the character cell (0..=R9).
    pub ra: u8,
    /// Characters displayed per row (R1).
    pub x_count: u8,
}

/// 6845 CRT controller.
pub struct Crtc6845 {
    variant: Variant,
    /// Address register (selected register).
    address: u8,
    regs: [u8; 18],
    /// Horizontal character counter.
    column: u8,
    /// Raster counter within the character row.
    raster: u8,
    /// Character row counter.
    row: u8,
    /// True while counting R5 adjust scanlines.
    in_adjust: bool,
    adjust_line: u8,
    /// Memory address of the current character row.
    row_start: u16,
    /// Remaining vsync scanlines.
    vsync_remaining: u8,
    /// Next displayed scanline number.
    display_y: u16,
    pending_row: Option<RasterRow>,
    frame_complete: bool,
    frame_count: u64,
}

impl Crtc6845 {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            address: 0,
            regs: [0; 18],
            column: 0,
            raster: 0,
            row: 0,
            in_adjust: false,
            adjust_line: 0,
            row_start: 0,
            vsync_remaining: 0,
            display_y: 0,
            pending_row: None,
            frame_complete: false,
            frame_count: 0,
        }
    }

    /// Reset the counters. Registers keep their values (the chip has no
    /// register reset).
    pub fn reset(&mut self) {
        self.column = 0;
        self.start_frame();
        self.frame_complete = false;
        self.vsync_remaining = 0;
    }

    /// Read a register (offset 0 = status, 1 = selected register).
    #[must_use]
    pub fn read(&self, offset: u8) -> u8 {
        if offset & 1 == 0 {
            return 0;
        }
        let readable = match self.variant {
            Variant::Mc6845 => 14..=17,
            Variant::Hd46505Sp => 12..=17,
        };
        if readable.contains(&self.address) {
            self.regs[self.address as usize]
        } else {
            0
        }
    }

    /// Write a register (offset 0 = address, 1 = selected register).
    pub fn write(&mut self, offset: u8, value: u8) {
        if offset & 1 == 0 {
            self.address = value & 0x1F;
            return;
        }
        let Some(&mask) = self.write_mask().get(self.address as usize) else {
            return;
        };
        self.regs[self.address as usize] = value & mask;
        log::trace!("6845 R{} = {:#04X}", self.address, value & mask);
    }

    /// Take the row published at the start of the current scanline.
    pub fn take_row(&mut self) -> Option<RasterRow> {
        self.pending_row.take()
    }

    /// Frame complete flag, auto-clears on read.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    /// True while the vertical sync output is active.
    #[must_use]
    pub fn vsync(&self) -> bool {
        self.vsync_remaining > 0
    }

    /// True while the display enable output is active.
    #[must_use]
    pub fn display_enable(&self) -> bool {
        !self.in_adjust && self.row < self.regs[6] && self.column < self.regs[1]
    }

    /// Display start address (R12:R13).
    #[must_use]
    pub fn start_address(&self) -> u16 {
        (u16::from(self.regs[12]) << 8) | u16::from(self.regs[13])
    }

    /// Cursor address (R14:R15).
    #[must_use]
    pub fn cursor_address(&self) -> u16 {
        (u16::from(self.regs[14]) << 8) | u16::from(self.regs[15])
    }

    /// Raw register value, bypassing the readability rules.
    #[must_use]
    pub fn register(&self, index: usize) -> u8 {
        self.regs.get(index).copied().unwrap_or(0)
    }

    /// Completed frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn write_mask(&self) -> &'static [u8; 18] {
        match self.variant {
            Variant::Mc6845 => &WRITE_MASK_MC6845,
            Variant::Hd46505Sp => &WRITE_MASK_HD46505SP,
        }
    }

    fn vsync_width(&self) -> u8 {
        match self.variant {
            Variant::Mc6845 => 16,
            Variant::Hd46505Sp => match self.regs[3] >> 4 {
                0 => 16,
                n => n,
            },
        }
    }

    fn start_frame(&mut self) {
        self.raster = 0;
        self.row = 0;
        self.in_adjust = false;
        self.adjust_line = 0;
        self.row_start = self.start_address() & 0x3FFF;
        self.display_y = 0;
    }

    fn begin_scanline(&mut self) {
        let x_count = self.regs[1];
        if !self.in_adjust && self.row < self.regs[6] && x_count > 0 {
            self.pending_row = Some(RasterRow {
                y: self.display_y,
                ma: self.row_start,
                ra: self.raster,
                x_count,
            });
            self.display_y = self.display_y.wrapping_add(1);
        }
    }

    fn end_scanline(&mut self) {
        self.vsync_remaining = self.vsync_remaining.saturating_sub(1);

        if self.in_adjust {
            self.adjust_line += 1;
            if self.adjust_line >= self.regs[5] {
                self.end_frame();
            }
        } else if self.raster >= self.regs[9] {
            self.raster = 0;
            self.row_start = self.row_start.wrapping_add(u16::from(self.regs[1])) & 0x3FFF;
            if self.row >= self.regs[4] {
                if self.regs[5] == 0 {
                    self.end_frame();
                } else {
                    self.in_adjust = true;
                    self.adjust_line = 0;
                }
            } else {
                self.row += 1;
            }
        } else {
            self.raster += 1;
        }

        if !self.in_adjust && self.raster == 0 && self.row == self.regs[7] {
            self.vsync_remaining = self.vsync_width();
        }
    }

    fn end_frame(&mut self) {
        self.start_frame();
        self.frame_complete = true;
        self.frame_count += 1;
    }
}

impl Tickable for Crtc6845 {
    fn tick(&mut self) {
        if self.column == 0 {
            self.begin_scanline();
        }
        if self.column >= self.regs[0] {
            self.column = 0;
            self.end_scanline();
        } else {
            self.column += 1;
        }
    }
}

impl Observable for Crtc6845 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(index) = REGISTER_PATHS.iter().position(|&p| p == path) {
            return Some(self.regs[index].into());
        }
        match path {
            "address" => Some(self.address.into()),
            "column" => Some(self.column.into()),
            "raster" => Some(self.raster.into()),
            "row" => Some(self.row.into()),
            "vsync" => Some(self.vsync().into()),
            "frame_count" => Some(self.frame_count.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "r0..r17",
            "address",
            "column",
            "raster",
            "row",
            "vsync",
            "frame_count",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::Ticks;

    fn program(crtc: &mut Crtc6845, regs: &[(u8, u8)]) {
        for &(reg, value) in regs {
            crtc.write(0, reg);
            crtc.write(1, value);
        }
    }

    /// 4 characters displayed of 6, 2 scanlines per row, 3 rows of 4, no
    /// adjust: 6 * 2 * 4 = 48 character clocks per frame.
    fn small_crtc() -> Crtc6845 {
        let mut crtc = Crtc6845::new(Variant::Hd46505Sp);
        program(
            &mut crtc,
            &[(0, 5), (1, 4), (4, 3), (6, 3), (7, 3), (9, 1), (12, 0x00), (13, 0x10)],
        );
        crtc.reset();
        crtc
    }

    fn collect_frame(crtc: &mut Crtc6845) -> Vec<RasterRow> {
        let mut rows = Vec::new();
        loop {
            crtc.tick();
            if let Some(row) = crtc.take_row() {
                rows.push(row);
            }
            if crtc.take_frame_complete() {
                return rows;
            }
        }
    }

    #[test]
    fn publishes_displayed_rows_with_addresses() {
        let mut crtc = small_crtc();
        let rows = collect_frame(&mut crtc);
        assert_eq!(rows.len(), 6, "R6 * (R9 + 1) rows");
        assert_eq!(rows[0], RasterRow { y: 0, ma: 0x10, ra: 0, x_count: 4 });
        assert_eq!(rows[1], RasterRow { y: 1, ma: 0x10, ra: 1, x_count: 4 });
        assert_eq!(rows[2].ma, 0x14);
        assert_eq!(rows[4].ma, 0x18);
        assert_eq!(rows[5], RasterRow { y: 5, ma: 0x18, ra: 1, x_count: 4 });
    }

    #[test]
    fn frame_length_in_character_clocks() {
        let mut crtc = small_crtc();
        let mut ticks = 0;
        loop {
            crtc.tick();
            ticks += 1;
            if crtc.take_frame_complete() {
                break;
            }
        }
        assert_eq!(ticks, 48);

        // Second frame starts again at the top with the same address
        let rows = collect_frame(&mut crtc);
        assert_eq!(rows[0].y, 0);
        assert_eq!(rows[0].ma, 0x10);
    }

    #[test]
    fn vertical_adjust_lengthens_frame() {
        let mut crtc = small_crtc();
        program(&mut crtc, &[(5, 3)]);
        crtc.reset();
        let mut ticks = 0u64;
        loop {
            crtc.tick();
            ticks += 1;
            if crtc.take_frame_complete() {
                break;
            }
        }
        assert_eq!(ticks, 48 + 3 * 6);
    }

    #[test]
    fn vsync_on_row_r7() {
        let mut crtc = small_crtc();
        program(&mut crtc, &[(3, 0x20)]); // vsync 2 lines
        crtc.reset();
        // Row 3 starts after 3 rows * 2 scanlines * 6 clocks
        crtc.tick_n(Ticks::new(3 * 2 * 6 - 1));
        assert!(!crtc.vsync());
        crtc.tick();
        assert!(crtc.vsync());
        crtc.tick_n(Ticks::new(2 * 6));
        assert!(!crtc.vsync());
    }

    #[test]
    fn display_enable_window() {
        let mut crtc = small_crtc();
        assert!(crtc.display_enable());
        crtc.tick_n(Ticks::new(4));
        assert!(!crtc.display_enable(), "column 4 is past R1");
    }

    #[test]
    fn register_readability_by_variant() {
        let mut hd = Crtc6845::new(Variant::Hd46505Sp);
        let mut mc = Crtc6845::new(Variant::Mc6845);
        for crtc in [&mut hd, &mut mc] {
            program(crtc, &[(1, 80), (12, 0x12), (14, 0x05)]);
        }

        hd.write(0, 12);
        mc.write(0, 12);
        assert_eq!(hd.read(1), 0x12);
        assert_eq!(mc.read(1), 0x00, "MC6845 R12 is write-only");

        hd.write(0, 14);
        mc.write(0, 14);
        assert_eq!(hd.read(1), 0x05);
        assert_eq!(mc.read(1), 0x05);

        hd.write(0, 1);
        assert_eq!(hd.read(1), 0, "R1 is write-only");
        assert_eq!(hd.read(0), 0, "no status bits");
    }

    #[test]
    fn write_masks_apply() {
        let mut crtc = Crtc6845::new(Variant::Mc6845);
        program(&mut crtc, &[(3, 0xFF), (12, 0xFF), (16, 0x12)]);
        assert_eq!(crtc.register(3), 0x0F);
        assert_eq!(crtc.register(12), 0x3F);
        assert_eq!(crtc.register(16), 0x00, "light pen is read-only");

        // Address register beyond R17 selects nothing
        crtc.write(0, 0x1F);
        crtc.write(1, 0xAA);
        assert_eq!(crtc.read(1), 0);
    }

    #[test]
    fn observable_registers() {
        let crtc = small_crtc();
        assert_eq!(crtc.query("r1"), Some(Value::U8(4)));
        assert_eq!(crtc.query("r13"), Some(Value::U8(0x10)));
        assert_eq!(crtc.query("r18"), None);
    }
}
