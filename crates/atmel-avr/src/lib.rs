//! AVR 8-bit microcontroller core emulator.
//!
//! Instruction-level emulation of the classic AVR core: the full
//! opcode map, the eight-flag status register, the unified data-memory
//! view (registers ∪ I/O ∪ extended I/O ∪ SRAM) and the skip/branch
//! program-counter machinery. Not cycle accurate; interrupts are
//! modelled only as the I flag.
//!
//! Device geometry and instruction availability are chosen at
//! construction via [`MemoryLayout`] and [`Variant`], so one core type
//! covers ATtiny- and ATmega-class parts.

pub mod alu;
mod cpu;
pub mod decode;
mod execute;
mod memory;
mod registers;
pub mod sreg;
mod variant;

#[cfg(feature = "test-utils")]
pub mod asm;

pub use cpu::{Avr8, BreakReason, Registers};
pub use decode::{Instruction, Pointer, PointerOp};
pub use memory::{GP_REGISTERS, IO_REGISTERS, MemoryLayout, Region, SREG_ADDRESS};
pub use registers::{RegisterFile, X, Y, Z};
pub use sreg::Sreg;
pub use variant::Variant;
