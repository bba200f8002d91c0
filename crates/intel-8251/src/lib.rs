//! Intel 8251 USART (Programmable Communication Interface).
//!
//! Two registers: data at offset 0 and control/status at offset 1. After
//! reset, control writes walk through a fixed sequence:
//!
//! 1. Mode instruction (baud factor, character length, parity, stop bits).
//! 2. One or two sync characters (synchronous mode only).
//! 3. Command instructions, until a command with the internal reset bit
//!    sends the chip back to step 1.
//!
//! Serial timing is not modelled: a byte written with the transmitter
//! enabled is transmitted at once into a queue the host drains, and bytes
//! the host delivers with `receive` are available immediately. The queue
//! holds the last [`TX_QUEUE_CAPACITY`] bytes; older ones are dropped if
//! the host never drains it.

use std::collections::VecDeque;

use emu_core::{Observable, Value};

/// Transmitted bytes kept for the host.
pub const TX_QUEUE_CAPACITY: usize = 4096;

/// Status register bits.
pub mod status {
    pub const TX_READY: u8 = 0x01;
    pub const RX_READY: u8 = 0x02;
    pub const TX_EMPTY: u8 = 0x04;
    pub const PARITY_ERROR: u8 = 0x08;
    pub const OVERRUN_ERROR: u8 = 0x10;
    pub const FRAMING_ERROR: u8 = 0x20;
    pub const SYNDET: u8 = 0x40;
    pub const DSR: u8 = 0x80;
}

/// Command instruction bits.
pub mod command {
    pub const TX_ENABLE: u8 = 0x01;
    pub const DTR: u8 = 0x02;
    pub const RX_ENABLE: u8 = 0x04;
    pub const SEND_BREAK: u8 = 0x08;
    pub const ERROR_RESET: u8 = 0x10;
    pub const RTS: u8 = 0x20;
    pub const INTERNAL_RESET: u8 = 0x40;
    pub const HUNT: u8 = 0x80;
}

/// What the next control register write means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    Mode,
    FirstSync,
    SecondSync,
    Command,
}

/// Intel 8251 USART.
pub struct Usart8251 {
    phase: ControlPhase,
    mode: u8,
    sync_chars: [u8; 2],
    command: u8,
    /// Byte written while the transmitter was disabled.
    tx_buffer: Option<u8>,
    transmitted: VecDeque<u8>,
    rx_data: u8,
    rx_ready: bool,
    parity_error: bool,
    overrun_error: bool,
    framing_error: bool,
    /// /DSR input asserted.
    dsr: bool,
}

impl Usart8251 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: ControlPhase::Mode,
            mode: 0,
            sync_chars: [0; 2],
            command: 0,
            tx_buffer: None,
            transmitted: VecDeque::new(),
            rx_data: 0,
            rx_ready: false,
            parity_error: false,
            overrun_error: false,
            framing_error: false,
            dsr: false,
        }
    }

    /// Hardware reset: expect a mode instruction next.
    pub fn reset(&mut self) {
        self.phase = ControlPhase::Mode;
        self.command = 0;
        self.tx_buffer = None;
        self.rx_ready = false;
        self.clear_errors();
    }

    /// Read a register (offset 0 = data, 1 = status).
    pub fn read(&mut self, offset: u8) -> u8 {
        if offset & 1 == 0 {
            self.rx_ready = false;
            self.rx_data
        } else {
            self.status()
        }
    }

    /// Write a register (offset 0 = data, 1 = mode/sync/command).
    pub fn write(&mut self, offset: u8, value: u8) {
        if offset & 1 == 0 {
            self.write_data(value);
        } else {
            self.write_control(value);
        }
    }

    /// Status register value (no side effects).
    #[must_use]
    pub fn status(&self) -> u8 {
        let mut value = 0;
        if self.tx_buffer.is_none() {
            value |= status::TX_READY | status::TX_EMPTY;
        }
        if self.rx_ready {
            value |= status::RX_READY;
        }
        if self.parity_error {
            value |= status::PARITY_ERROR;
        }
        if self.overrun_error {
            value |= status::OVERRUN_ERROR;
        }
        if self.framing_error {
            value |= status::FRAMING_ERROR;
        }
        if self.dsr {
            value |= status::DSR;
        }
        value
    }

    /// Deliver a byte from the serial line.
    ///
    /// Dropped while the receiver is disabled. A byte arriving before the
    /// previous one was read overwrites it and flags an overrun.
    pub fn receive(&mut self, byte: u8) {
        if self.command & command::RX_ENABLE == 0 {
            log::trace!("8251 receiver disabled, dropped {byte:#04X}");
            return;
        }
        if self.rx_ready {
            self.overrun_error = true;
        }
        self.rx_data = byte;
        self.rx_ready = true;
    }

    /// Drain the bytes transmitted so far.
    pub fn take_transmitted(&mut self) -> Vec<u8> {
        self.transmitted.drain(..).collect()
    }

    /// Drive the /DSR input.
    pub fn set_dsr(&mut self, asserted: bool) {
        self.dsr = asserted;
    }

    /// /DTR output (command bit 1).
    #[must_use]
    pub fn dtr(&self) -> bool {
        self.command & command::DTR != 0
    }

    /// /RTS output (command bit 5).
    #[must_use]
    pub fn rts(&self) -> bool {
        self.command & command::RTS != 0
    }

    /// Current control phase.
    #[must_use]
    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    /// Last mode instruction.
    #[must_use]
    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Sync characters received after a synchronous mode instruction.
    #[must_use]
    pub fn sync_chars(&self) -> [u8; 2] {
        self.sync_chars
    }

    fn write_data(&mut self, value: u8) {
        if self.command & command::TX_ENABLE != 0 {
            self.transmit(value);
        } else {
            self.tx_buffer = Some(value);
        }
    }

    fn write_control(&mut self, value: u8) {
        match self.phase {
            ControlPhase::Mode => {
                self.mode = value;
                // Baud factor 00 selects synchronous mode
                self.phase = if value & 0x03 == 0 {
                    ControlPhase::FirstSync
                } else {
                    ControlPhase::Command
                };
                log::trace!("8251 mode {value:#04X}");
            }
            ControlPhase::FirstSync => {
                self.sync_chars[0] = value;
                // SCS (bit 7) selects a single sync character
                self.phase = if self.mode & 0x80 != 0 {
                    ControlPhase::Command
                } else {
                    ControlPhase::SecondSync
                };
            }
            ControlPhase::SecondSync => {
                self.sync_chars[1] = value;
                self.phase = ControlPhase::Command;
            }
            ControlPhase::Command => self.write_command(value),
        }
    }

    fn write_command(&mut self, value: u8) {
        if value & command::INTERNAL_RESET != 0 {
            log::trace!("8251 internal reset");
            self.reset();
            return;
        }
        self.command = value;
        if value & command::ERROR_RESET != 0 {
            self.clear_errors();
        }
        if value & command::TX_ENABLE != 0
            && let Some(byte) = self.tx_buffer.take()
        {
            self.transmit(byte);
        }
    }

    fn transmit(&mut self, byte: u8) {
        if self.transmitted.len() == TX_QUEUE_CAPACITY {
            self.transmitted.pop_front();
        }
        self.transmitted.push_back(byte);
    }

    fn clear_errors(&mut self) {
        self.parity_error = false;
        self.overrun_error = false;
        self.framing_error = false;
    }
}

impl Default for Usart8251 {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for Usart8251 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "mode" => Some(self.mode.into()),
            "command" => Some(self.command.into()),
            "status" => Some(self.status().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["mode", "command", "status"]
    }
}
