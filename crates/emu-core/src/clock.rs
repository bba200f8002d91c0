//! Master clock configuration.

use crate::Ticks;

/// Master crystal of a machine.
///
/// Components run at integer divisions of this frequency; nothing in a
/// machine keeps time any other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g. `8_000_000` for the MBC-200).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per frame at the given frame rate (integer division).
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> Ticks {
        Ticks::new(self.frequency_hz / frames_per_second)
    }

    /// Frequency of a component clocked at `crystal / divider`.
    #[must_use]
    pub const fn divided(&self, divider: u64) -> u64 {
        self.frequency_hz / divider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_at_50hz() {
        let clock = MasterClock::new(8_000_000);
        assert_eq!(clock.ticks_per_frame(50), Ticks::new(160_000));
        assert_eq!(clock.divided(2), 4_000_000);
    }
}
