//! Trait for components that can be advanced by clock ticks.

use crate::Ticks;

/// A component advanced by its own clock.
///
/// The owner decides which master clock ticks reach the component (a chip
/// on a divided clock is ticked on every Nth master tick).
pub trait Tickable {
    /// Advance the component by one of its clock ticks.
    fn tick(&mut self);

    /// Advance the component by multiple ticks.
    ///
    /// Overrides must produce the same state as calling `tick()` in a loop.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
