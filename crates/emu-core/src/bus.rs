//! Memory and I/O bus interface.

/// Result of a bus read: the data byte plus any wait states the access cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    pub data: u8,
    /// Extra CPU T-states inserted by the addressed device.
    pub wait: u8,
}

impl ReadResult {
    /// A read that completed without wait states.
    #[must_use]
    pub const fn new(data: u8) -> Self {
        Self { data, wait: 0 }
    }

    #[must_use]
    pub const fn with_wait(data: u8, wait: u8) -> Self {
        Self { data, wait }
    }
}

/// Memory and I/O bus seen by a CPU.
///
/// The bus decodes addresses and routes each access to the device behind
/// it. Z80-family CPUs use the separate I/O space through `io_read` and
/// `io_write`; CPUs without port I/O never call them.
pub trait Bus {
    /// Read a byte from program memory.
    fn read(&mut self, address: u32) -> ReadResult;

    /// Write a byte to program memory. Returns wait states.
    fn write(&mut self, address: u32, value: u8) -> u8;

    /// Read a byte from the I/O space. Nothing answers by default, so the
    /// data bus floats high.
    fn io_read(&mut self, _port: u32) -> ReadResult {
        ReadResult::new(0xFF)
    }

    /// Write a byte to the I/O space. Returns wait states.
    fn io_write(&mut self, _port: u32, _value: u8) -> u8 {
        0
    }
}
