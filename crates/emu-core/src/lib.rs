//! Core traits for microcontroller emulation.
//!
//! A microcontroller core owns its on-chip memories, so the seams here
//! are narrower than for a bus-based micro: a `Cpu` that steps one
//! instruction at a time, and `Peripheral` hooks observing the I/O
//! register file.

mod cpu;
mod peripheral;

pub use cpu::Cpu;
pub use peripheral::Peripheral;
