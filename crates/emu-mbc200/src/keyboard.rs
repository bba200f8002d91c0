//! Keyboard latch at main I/O 0xE0-0xE1.
//!
//! The real keyboard has its own processor talking serial to a USART; its
//! firmware and code set are undumped. In its place a one-byte latch holds
//! the last key typed, with control keys remapped to the codes the system
//! software expects.

/// Host control codes and the codes the system software expects for them.
const TRANSLATION: [(u8, u8); 7] = [
    (0x0E, 0xE2),
    (0x0F, 0xE3),
    (0x08, 0xE4),
    (0x09, 0xE5),
    (0x0A, 0xE6),
    (0x0D, 0xE7),
    (0x1B, 0xE8),
];

/// Status: a code is waiting.
const STATUS_PENDING: u8 = 0x02;
/// Status: the waiting code is a control character.
const STATUS_CONTROL: u8 = 0x08;

/// Translate a host key code.
#[must_use]
pub fn translate(code: u8) -> u8 {
    TRANSLATION
        .iter()
        .find(|&&(from, _)| from == code)
        .map_or(code, |&(_, to)| to)
}

/// One pending key code; 0 means none.
#[derive(Debug, Default)]
pub struct KeyboardLatch {
    pending: u8,
}

impl KeyboardLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A key arrived from the keyboard. Overwrites an unread code.
    pub fn put(&mut self, code: u8) {
        self.pending = translate(code);
    }

    /// CPU read.
    ///
    /// Offset 0 returns the pending code and clears it. Offset 1 returns
    /// the status: 0 with nothing pending, 0x02 with a code pending, 0x0A
    /// if that code is below 0x20. A status read of a control code also
    /// ORs 0x40 into the stored code, so the following data read returns
    /// the code with bit 6 set.
    pub fn read(&mut self, offset: u8) -> u8 {
        if offset & 1 == 0 {
            return std::mem::take(&mut self.pending);
        }
        if self.pending == 0 {
            return 0;
        }
        let mut status = STATUS_PENDING;
        if self.pending < 0x20 {
            status |= STATUS_CONTROL;
            self.pending |= 0x40;
        }
        status
    }

    /// Pending code without side effects.
    #[must_use]
    pub fn pending(&self) -> u8 {
        self.pending
    }
}
