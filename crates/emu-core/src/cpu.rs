//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// The machine owns the CPU and lends it a bus on every tick, so one bus
/// can be shared between a CPU and the other devices (or, on a
/// dual-processor board, handed to each CPU in turn).
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Advance the CPU by one T-state.
    fn tick<B: Bus>(&mut self, bus: &mut B);

    /// Current program counter, zero-extended to 32 bits.
    fn pc(&self) -> u32;

    /// Snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// True while the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Request a maskable interrupt. Returns true if accepted.
    fn interrupt(&mut self) -> bool;

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
