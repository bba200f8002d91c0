//! Counted clock ticks.

/// A number of ticks of some clock. Which clock is up to the caller: a
/// machine counts crystal ticks, a chip counts its own divided clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Ticks(u64);

impl Ticks {
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}
