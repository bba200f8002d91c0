//! Master to slave mailbox.
//!
//! The master writes a byte through ppi_m port A; the slave reads it
//! through ppi_2 port A, which empties the slot and acknowledges on ppi_m
//! PC6. One slot, no queue: a second write before the read replaces the
//! first.

/// Single-byte mailbox, 0 when empty.
#[derive(Debug, Default)]
pub struct CommLatch {
    value: u8,
    full: bool,
}

impl CommLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a byte. Returns the unread byte it replaced, if any.
    pub fn write(&mut self, value: u8) -> Option<u8> {
        let lost = self.full.then_some(self.value);
        if let Some(lost) = lost {
            log::warn!("comm latch overwrite: {lost:#04X} replaced by {value:#04X} before the slave read it");
        }
        self.value = value;
        self.full = true;
        lost
    }

    /// Drive the pins to 0 without posting a byte.
    pub fn clear(&mut self) {
        self.value = 0;
        self.full = false;
    }

    /// Read and empty the slot.
    pub fn take(&mut self) -> u8 {
        self.full = false;
        std::mem::take(&mut self.value)
    }

    /// Current value without side effects.
    #[must_use]
    pub fn peek(&self) -> u8 {
        self.value
    }

    /// True while a written byte is unread.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full
    }
}
