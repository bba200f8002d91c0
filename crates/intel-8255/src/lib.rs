//! Intel 8255 Programmable Peripheral Interface (PPI).
//!
//! Three 8-bit ports (A, B, C) and a write-only control register, at
//! offsets 0-3. The ports are split into two groups:
//!
//! - **Group A**: port A and port C upper (PC4-PC7). Modes 0, 1 and 2.
//! - **Group B**: port B and port C lower (PC0-PC3). Modes 0 and 1.
//!
//! # Control word
//!
//! | Bit | Mode set (bit 7 = 1)            | Bit set/reset (bit 7 = 0) |
//! |-----|---------------------------------|---------------------------|
//! | 6-5 | group A mode (0, 1, 2)          | -                         |
//! | 4   | port A direction (1 = input)    | -                         |
//! | 3   | port C upper direction          | bit number (3-1)          |
//! | 2   | group B mode (0, 1)             |                           |
//! | 1   | port B direction                |                           |
//! | 0   | port C lower direction          | new bit value             |
//!
//! # Handshake lines (modes 1 and 2)
//!
//! | Pin | Group A output | Group A input | Group B         |
//! |-----|----------------|---------------|-----------------|
//! | PC7 | /OBF A         | I/O           | -               |
//! | PC6 | /ACK A         | I/O           | -               |
//! | PC5 | I/O            | IBF A         | -               |
//! | PC4 | I/O            | /STB A        | -               |
//! | PC3 | INTR A         | INTR A        | -               |
//! | PC2 | -              | -             | /STB B or /ACK B |
//! | PC1 | -              | -             | IBF B or /OBF B |
//! | PC0 | -              | -             | INTR B          |
//!
//! Mode 2 puts /OBF, /ACK, IBF, /STB and INTR on PC3-PC7 at once.
//!
//! # Wiring
//!
//! The chip has no idea what its pins are connected to. Every register
//! access takes a [`PortHandler`] that supplies input pins and receives
//! output pins, so a machine composes its wiring at the call site.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Observable, Value};

/// Power-on control word: mode 0, every port an input.
const RESET_CONTROL: u8 = 0x9B;

/// Devices wired to the PPI's ports.
///
/// Unconnected inputs read 0xFF (TTL inputs float high); unconnected
/// outputs are dropped.
pub trait PortHandler {
    /// Sample the port A input pins.
    fn read_a(&mut self) -> u8 {
        0xFF
    }

    /// Sample the port B input pins.
    fn read_b(&mut self) -> u8 {
        0xFF
    }

    /// Sample the port C input pins.
    fn read_c(&mut self) -> u8 {
        0xFF
    }

    /// Port A output pins changed.
    fn write_a(&mut self, _value: u8) {}

    /// Port B output pins changed.
    fn write_b(&mut self, _value: u8) {}

    /// Port C output pins changed. Pins configured as inputs read high.
    fn write_c(&mut self, _value: u8) {}

    /// A mode set cleared the port A output latch. Defaults to a write of 0.
    fn clear_a(&mut self) {
        self.write_a(0);
    }
}

/// Nothing connected.
impl PortHandler for () {}

/// Which port C bits come from where under the current mode.
#[derive(Debug, Clone, Copy, Default)]
struct PortCLayout {
    /// Mode 0 outputs, driven from the port C latch.
    latch: u8,
    /// Inputs, sampled from the outside.
    input: u8,
    /// Handshake status outputs (INTR, IBF, /OBF).
    status: u8,
}

/// Intel 8255 PPI.
pub struct Ppi8255 {
    control: u8,
    /// Output latches for ports A, B, C.
    output: [u8; 3],
    /// Input latches for strobed input on ports A and B.
    input: [u8; 2],
    /// Levels driven onto port C from outside by `set_port_c_line`.
    external_c: u8,
    /// /OBF pin level per port (true = high = buffer empty).
    obf: [bool; 2],
    /// IBF per port (true = input buffer full).
    ibf: [bool; 2],
    /// INTR per port.
    intr: [bool; 2],
    /// INTE 1 (port A output side, PC6).
    inte_a_out: bool,
    /// INTE 2 (port A input side, PC4).
    inte_a_in: bool,
    /// INTE B (PC2).
    inte_b: bool,
}

impl Ppi8255 {
    #[must_use]
    pub fn new() -> Self {
        let mut ppi = Self {
            control: RESET_CONTROL,
            output: [0; 3],
            input: [0xFF; 2],
            external_c: 0xFF,
            obf: [true; 2],
            ibf: [false; 2],
            intr: [false; 2],
            inte_a_out: false,
            inte_a_in: false,
            inte_b: false,
        };
        ppi.reset();
        ppi
    }

    /// Return to the power-on state: mode 0, all ports input, latches clear.
    pub fn reset(&mut self) {
        self.control = RESET_CONTROL;
        self.clear_latches();
        self.external_c = 0xFF;
    }

    /// Read a register (offset 0-3; higher bits ignored).
    pub fn read(&mut self, offset: u8, ports: &mut impl PortHandler) -> u8 {
        match offset & 3 {
            0 => self.read_port_a(ports),
            1 => self.read_port_b(ports),
            2 => self.read_port_c(ports),
            // Control register is write-only
            _ => 0xFF,
        }
    }

    /// Write a register (offset 0-3; higher bits ignored).
    pub fn write(&mut self, offset: u8, value: u8, ports: &mut impl PortHandler) {
        match offset & 3 {
            0 => self.write_port_a(value, ports),
            1 => self.write_port_b(value, ports),
            2 => {
                self.output[2] = value;
                self.emit_port_c(ports);
            }
            _ => self.write_control(value, ports),
        }
    }

    /// Drive a port C pin from outside.
    ///
    /// Handshake inputs act while held low, matching how peripherals pulse
    /// them: /ACK A (PC6) releases /OBF A, /STB A (PC4) latches port A,
    /// PC2 is /STB B or /ACK B depending on port B's direction. In mode 0
    /// the level is simply what an input bit reads.
    pub fn set_port_c_line(&mut self, bit: u8, level: bool, ports: &mut impl PortHandler) {
        let mask = 1u8 << (bit & 7);
        if level {
            self.external_c |= mask;
        } else {
            self.external_c &= !mask;
        }

        if level {
            return;
        }

        let mode_a = self.group_a_mode();
        match bit & 7 {
            6 if (mode_a == 1 && !self.port_a_input()) || mode_a == 2 => {
                self.obf[0] = true;
                self.intr[0] = self.inte_a_out;
            }
            4 if (mode_a == 1 && self.port_a_input()) || mode_a == 2 => {
                self.input[0] = ports.read_a();
                self.ibf[0] = true;
                self.intr[0] = self.inte_a_in;
            }
            2 if self.group_b_mode() == 1 => {
                if self.port_b_input() {
                    self.input[1] = ports.read_b();
                    self.ibf[1] = true;
                } else {
                    self.obf[1] = true;
                }
                self.intr[1] = self.inte_b;
            }
            _ => return,
        }
        self.emit_port_c(ports);
    }

    /// Current control word.
    #[must_use]
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Group A mode (0, 1 or 2).
    #[must_use]
    pub fn group_a_mode(&self) -> u8 {
        match (self.control >> 5) & 3 {
            0 => 0,
            1 => 1,
            _ => 2,
        }
    }

    /// Group B mode (0 or 1).
    #[must_use]
    pub fn group_b_mode(&self) -> u8 {
        (self.control >> 2) & 1
    }

    /// Port A output latch.
    #[must_use]
    pub fn port_a_latch(&self) -> u8 {
        self.output[0]
    }

    /// Port B output latch.
    #[must_use]
    pub fn port_b_latch(&self) -> u8 {
        self.output[1]
    }

    /// Port C as seen on the output pins (inputs float high).
    #[must_use]
    pub fn port_c_output(&self) -> u8 {
        let layout = self.port_c_layout();
        (self.status_bits() & layout.status)
            | (self.output[2] & layout.latch)
            | !(layout.status | layout.latch)
    }

    /// /OBF A pin level (true = high = buffer empty).
    #[must_use]
    pub fn obf_a(&self) -> bool {
        self.obf[0]
    }

    /// IBF A (true = input buffer full).
    #[must_use]
    pub fn ibf_a(&self) -> bool {
        self.ibf[0]
    }

    /// INTR A output.
    #[must_use]
    pub fn intr_a(&self) -> bool {
        self.intr[0]
    }

    /// INTR B output.
    #[must_use]
    pub fn intr_b(&self) -> bool {
        self.intr[1]
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn port_a_input(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn port_c_upper_input(&self) -> bool {
        self.control & 0x08 != 0
    }

    fn port_b_input(&self) -> bool {
        self.control & 0x02 != 0
    }

    fn port_c_lower_input(&self) -> bool {
        self.control & 0x01 != 0
    }

    fn clear_latches(&mut self) {
        self.output = [0; 3];
        self.input = [0xFF; 2];
        self.obf = [true; 2];
        self.ibf = [false; 2];
        self.intr = [false; 2];
        self.inte_a_out = false;
        self.inte_a_in = false;
        self.inte_b = false;
    }

    fn read_port_a(&mut self, ports: &mut impl PortHandler) -> u8 {
        match self.group_a_mode() {
            0 if self.port_a_input() => ports.read_a(),
            0 => self.output[0],
            1 if !self.port_a_input() => self.output[0],
            _ => {
                // Strobed input (mode 1 input, mode 2): reading empties the buffer
                self.ibf[0] = false;
                self.intr[0] = false;
                self.emit_port_c(ports);
                self.input[0]
            }
        }
    }

    fn read_port_b(&mut self, ports: &mut impl PortHandler) -> u8 {
        match (self.group_b_mode(), self.port_b_input()) {
            (0, true) => ports.read_b(),
            (_, false) => self.output[1],
            (_, true) => {
                self.ibf[1] = false;
                self.intr[1] = false;
                self.emit_port_c(ports);
                self.input[1]
            }
        }
    }

    fn read_port_c(&mut self, ports: &mut impl PortHandler) -> u8 {
        let layout = self.port_c_layout();
        let external = if layout.input == 0 {
            0xFF
        } else {
            ports.read_c() & self.external_c
        };
        (self.status_bits() & layout.status)
            | (self.output[2] & layout.latch)
            | (external & layout.input)
    }

    fn write_port_a(&mut self, value: u8, ports: &mut impl PortHandler) {
        self.output[0] = value;
        match self.group_a_mode() {
            0 if self.port_a_input() => {}
            0 => ports.write_a(value),
            1 if self.port_a_input() => {}
            _ => {
                ports.write_a(value);
                self.obf[0] = false;
                self.intr[0] = false;
                self.emit_port_c(ports);
            }
        }
    }

    fn write_port_b(&mut self, value: u8, ports: &mut impl PortHandler) {
        self.output[1] = value;
        if self.port_b_input() {
            return;
        }
        ports.write_b(value);
        if self.group_b_mode() == 1 {
            self.obf[1] = false;
            self.intr[1] = false;
            self.emit_port_c(ports);
        }
    }

    fn write_control(&mut self, value: u8, ports: &mut impl PortHandler) {
        if value & 0x80 != 0 {
            self.control = value;
            self.clear_latches();
            log::trace!(
                "8255 mode set {value:#04X}: group A mode {}, group B mode {}",
                self.group_a_mode(),
                self.group_b_mode()
            );
            if self.group_a_mode() == 2 || !self.port_a_input() {
                ports.clear_a();
            }
            if !self.port_b_input() {
                ports.write_b(0);
            }
            self.emit_port_c(ports);
            return;
        }

        let bit = (value >> 1) & 7;
        let set = value & 1 != 0;
        if !self.set_interrupt_enable(bit, set) {
            let mask = 1u8 << bit;
            if set {
                self.output[2] |= mask;
            } else {
                self.output[2] &= !mask;
            }
        }
        self.emit_port_c(ports);
    }

    /// Bit set/reset on a handshake INTE bit. Returns false if `bit` is an
    /// ordinary port C latch bit under the current mode.
    fn set_interrupt_enable(&mut self, bit: u8, set: bool) -> bool {
        let mode_a = self.group_a_mode();
        let a_in = (mode_a == 1 && self.port_a_input()) || mode_a == 2;
        let a_out = (mode_a == 1 && !self.port_a_input()) || mode_a == 2;

        match bit {
            4 if a_in => {
                self.inte_a_in = set;
                self.intr[0] = set && self.ibf[0];
            }
            6 if a_out => {
                self.inte_a_out = set;
                self.intr[0] = set && self.obf[0];
            }
            2 if self.group_b_mode() == 1 => {
                self.inte_b = set;
                let ready = if self.port_b_input() {
                    self.ibf[1]
                } else {
                    self.obf[1]
                };
                self.intr[1] = set && ready;
            }
            _ => return false,
        }
        true
    }

    fn port_c_layout(&self) -> PortCLayout {
        let mut layout = PortCLayout::default();

        let upper_dir = |layout: &mut PortCLayout, bits: u8, input: bool| {
            if input {
                layout.input |= bits;
            } else {
                layout.latch |= bits;
            }
        };

        let mode_a = self.group_a_mode();
        match mode_a {
            0 => upper_dir(&mut layout, 0xF0, self.port_c_upper_input()),
            1 if self.port_a_input() => {
                layout.status |= 0x28;
                layout.input |= 0x10;
                upper_dir(&mut layout, 0xC0, self.port_c_upper_input());
            }
            1 => {
                layout.status |= 0x88;
                layout.input |= 0x40;
                upper_dir(&mut layout, 0x30, self.port_c_upper_input());
            }
            _ => {
                layout.status |= 0xA8;
                layout.input |= 0x50;
            }
        }

        let mut lower = 0u8;
        if mode_a == 0 {
            lower |= 0x08;
        }
        if self.group_b_mode() == 0 {
            lower |= 0x07;
        } else {
            layout.status |= 0x03;
            layout.input |= 0x04;
        }
        upper_dir(&mut layout, lower, self.port_c_lower_input());

        layout
    }

    /// Handshake outputs at their pin positions.
    fn status_bits(&self) -> u8 {
        let mut bits = 0u8;
        if self.intr[0] {
            bits |= 0x08;
        }
        if self.ibf[0] {
            bits |= 0x20;
        }
        if self.obf[0] {
            bits |= 0x80;
        }
        if self.intr[1] {
            bits |= 0x01;
        }
        let b_flag = if self.port_b_input() {
            self.ibf[1]
        } else {
            self.obf[1]
        };
        if b_flag {
            bits |= 0x02;
        }
        bits
    }

    fn emit_port_c(&self, ports: &mut impl PortHandler) {
        ports.write_c(self.port_c_output());
    }
}

impl Default for Ppi8255 {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for Ppi8255 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "control" => Some(self.control.into()),
            "port_a" => Some(self.output[0].into()),
            "port_b" => Some(self.output[1].into()),
            "port_c" => Some(self.port_c_output().into()),
            "mode_a" => Some(self.group_a_mode().into()),
            "mode_b" => Some(self.group_b_mode().into()),
            "obf_a" => Some(self.obf[0].into()),
            "ibf_a" => Some(self.ibf[0].into()),
            "intr_a" => Some(self.intr[0].into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "control", "port_a", "port_b", "port_c", "mode_a", "mode_b", "obf_a", "ibf_a",
            "intr_a",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every output and serves fixed inputs.
    #[derive(Default)]
    struct Pins {
        a_in: u8,
        b_in: u8,
        c_in: u8,
        a_out: Vec<u8>,
        b_out: Vec<u8>,
        c_out: Vec<u8>,
    }

    impl PortHandler for Pins {
        fn read_a(&mut self) -> u8 {
            self.a_in
        }
        fn read_b(&mut self) -> u8 {
            self.b_in
        }
        fn read_c(&mut self) -> u8 {
            self.c_in
        }
        fn write_a(&mut self, value: u8) {
            self.a_out.push(value);
        }
        fn write_b(&mut self, value: u8) {
            self.b_out.push(value);
        }
        fn write_c(&mut self, value: u8) {
            self.c_out.push(value);
        }
    }

    #[test]
    fn reset_is_all_inputs() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins {
            a_in: 0x12,
            b_in: 0x34,
            c_in: 0x56,
            ..Pins::default()
        };
        assert_eq!(ppi.control(), 0x9B);
        assert_eq!(ppi.read(0, &mut pins), 0x12);
        assert_eq!(ppi.read(1, &mut pins), 0x34);
        assert_eq!(ppi.read(2, &mut pins), 0x56);
    }

    #[test]
    fn writes_to_input_ports_do_not_reach_pins() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins::default();
        ppi.write(0, 0xAA, &mut pins);
        ppi.write(1, 0xBB, &mut pins);
        assert!(pins.a_out.is_empty());
        assert!(pins.b_out.is_empty());
    }

    #[test]
    fn mode_set_clears_and_emits_output_latches() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins::default();
        // Mode 0: A out, C upper out, B out, C lower in
        ppi.write(3, 0x81, &mut pins);
        assert_eq!(pins.a_out, vec![0x00]);
        assert_eq!(pins.b_out, vec![0x00]);
        // Lower nibble is input and floats high
        assert_eq!(pins.c_out.last(), Some(&0x0F));

        ppi.write(0, 0x5A, &mut pins);
        assert_eq!(pins.a_out.last(), Some(&0x5A));
        assert_eq!(ppi.read(0, &mut pins), 0x5A, "output port reads its latch");
    }

    #[test]
    fn port_c_mixes_latch_and_inputs() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins {
            c_in: 0x05,
            ..Pins::default()
        };
        ppi.write(3, 0x81, &mut pins);
        ppi.write(2, 0xA0, &mut pins);
        assert_eq!(ppi.read(2, &mut pins), 0xA5);
        assert_eq!(pins.c_out.last(), Some(&0xAF));
    }

    #[test]
    fn bit_set_reset_in_mode_0() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins::default();
        ppi.write(3, 0x80, &mut pins); // all outputs
        ppi.write(3, 0x09, &mut pins); // set PC4
        assert_eq!(pins.c_out.last(), Some(&0x10));
        ppi.write(3, 0x0F, &mut pins); // set PC7
        assert_eq!(pins.c_out.last(), Some(&0x90));
        ppi.write(3, 0x08, &mut pins); // reset PC4
        assert_eq!(pins.c_out.last(), Some(&0x80));
    }

    #[test]
    fn mode_1_output_handshake() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins::default();
        // Group A mode 1 output, group B mode 0 output
        ppi.write(3, 0xA0, &mut pins);
        assert!(ppi.obf_a(), "buffer empty after mode set");

        ppi.write(3, 0x0D, &mut pins); // INTE A (PC6) on
        assert!(ppi.intr_a(), "empty buffer with INTE raises INTR");

        ppi.write(0, 0x42, &mut pins);
        assert!(!ppi.obf_a(), "write fills the buffer (/OBF low)");
        assert!(!ppi.intr_a(), "write clears INTR");
        assert_eq!(ppi.read(2, &mut pins) & 0x88, 0x00);

        ppi.set_port_c_line(6, false, &mut pins);
        assert!(ppi.obf_a(), "/ACK releases the buffer");
        assert!(ppi.intr_a());
        assert_eq!(ppi.read(2, &mut pins) & 0x88, 0x88);
    }

    #[test]
    fn repeated_ack_without_release_still_acknowledges() {
        let mut ppi = Ppi8255::new();
        ppi.write(3, 0xA0, &mut ());
        ppi.write(0, 0x01, &mut ());
        ppi.set_port_c_line(6, false, &mut ());
        ppi.write(0, 0x02, &mut ());
        assert!(!ppi.obf_a());
        ppi.set_port_c_line(6, false, &mut ());
        assert!(ppi.obf_a());
    }

    #[test]
    fn mode_1_strobed_input() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins {
            a_in: 0x77,
            ..Pins::default()
        };
        // Group A mode 1 input
        ppi.write(3, 0xB0, &mut pins);
        ppi.write(3, 0x09, &mut pins); // INTE A (PC4)
        assert!(!ppi.ibf_a());

        ppi.set_port_c_line(4, false, &mut pins);
        assert!(ppi.ibf_a());
        assert!(ppi.intr_a());

        // Input changes after the strobe; the latch keeps the strobed byte
        pins.a_in = 0x00;
        assert_eq!(ppi.read(0, &mut pins), 0x77);
        assert!(!ppi.ibf_a(), "read empties the buffer");
        assert!(!ppi.intr_a());
    }

    #[test]
    fn mode_1_port_b_output() {
        let mut ppi = Ppi8255::new();
        let mut pins = Pins::default();
        ppi.write(3, 0x84, &mut pins); // group B mode 1, B output
        ppi.write(1, 0x99, &mut pins);
        assert_eq!(pins.b_out.last(), Some(&0x99));
        assert_eq!(ppi.read(2, &mut pins) & 0x02, 0x00, "/OBF B low");
        ppi.set_port_c_line(2, false, &mut pins);
        assert_eq!(ppi.read(2, &mut pins) & 0x02, 0x02, "/ACK B releases");
    }

    #[test]
    fn control_register_reads_high() {
        let mut ppi = Ppi8255::new();
        assert_eq!(ppi.read(3, &mut ()), 0xFF);
    }

    #[test]
    fn observable_paths() {
        let mut ppi = Ppi8255::new();
        ppi.write(3, 0x80, &mut ());
        ppi.write(1, 0x81, &mut ());
        assert_eq!(ppi.query("port_b"), Some(Value::U8(0x81)));
        assert_eq!(ppi.query("mode_a"), Some(Value::U8(0)));
        assert_eq!(ppi.query("nonsense"), None);
    }
}
