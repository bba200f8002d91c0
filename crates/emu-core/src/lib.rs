//! Core traits and types for clocked machine emulation.
//!
//! A machine owns one master crystal and derives every component's timing
//! from it by integer division. CPUs plug in through [`Cpu`] and see the
//! rest of the machine only through a [`Bus`].

mod bus;
mod clock;
mod cpu;
mod observable;
mod tickable;
mod ticks;

pub use bus::{Bus, ReadResult};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use observable::{Observable, Value, parse_address};
pub use tickable::Tickable;
pub use ticks::Ticks;
