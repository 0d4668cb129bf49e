//! ATtiny85 microcontroller simulator.
//!
//! Wires an AVR core with ATtiny85 geometry and instruction set to the
//! USI character-output peripheral, a raw image loader, post-run state
//! dumps and an interactive break debugger. Batch runs terminate on the
//! PC fixed point (an instruction that leaves PC unchanged, classically
//! `rjmp .-2`).

mod attiny85;
pub mod debugger;
pub mod dump;
pub mod loader;
mod usi;

pub use attiny85::Attiny85;
pub use loader::ImageError;
pub use usi::Usi;
