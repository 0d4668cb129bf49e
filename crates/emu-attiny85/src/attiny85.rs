//! The ATtiny85 machine: core + USI + batch run loop.

use std::io::{self, Write};
use std::path::Path;

use atmel_avr::{Avr8, GP_REGISTERS, IO_REGISTERS, MemoryLayout, Variant};
use emu_core::Cpu;

use crate::debugger::{self, DebugOutcome};
use crate::loader::{self, ImageError};
use crate::usi::Usi;

/// An ATtiny85 with the USI wired for character output.
pub struct Attiny85 {
    cpu: Avr8,
    debug: bool,
}

impl Attiny85 {
    /// A machine emitting USI output to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_usi_output(Box::new(io::stdout()))
    }

    /// A machine emitting USI output to `out`; tests capture the stream
    /// this way.
    #[must_use]
    pub fn with_usi_output(out: Box<dyn Write>) -> Self {
        let mut cpu = Avr8::new(MemoryLayout::attiny85(), Variant::attiny85());
        cpu.attach_peripheral(Box::new(Usi::new(out)));
        Self { cpu, debug: false }
    }

    /// Arm the interactive debugger: `BREAK` instructions and stack
    /// collisions below the I/O region drop into the break prompt.
    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
        if on {
            self.cpu.arm_stack_watch(GP_REGISTERS + IO_REGISTERS);
        }
    }

    /// Load raw image bytes into program memory.
    pub fn load_image(&mut self, bytes: &[u8]) {
        loader::load_words(&mut self.cpu, bytes);
    }

    /// Load a raw image file into program memory.
    pub fn load_image_file(&mut self, path: &Path) -> Result<(), ImageError> {
        let bytes = loader::read_image(path)?;
        self.load_image(&bytes);
        Ok(())
    }

    /// Execute one machine cycle.
    pub fn step(&mut self) {
        self.cpu.step();
    }

    /// Run until a full cycle leaves PC unchanged (classically
    /// `rjmp .-2`), the only batch halt condition. Returns the number
    /// of cycles executed.
    ///
    /// With the debugger armed, `BREAK` and stack collisions open the
    /// break prompt on stdin/stdout; exiting it ends the run early.
    pub fn run_until_halt(&mut self) -> u64 {
        let mut last_pc = u32::MAX;
        let mut cycles = 0u64;
        while last_pc != self.cpu.pc() {
            last_pc = self.cpu.pc();
            self.cpu.step();
            cycles += 1;

            if self.debug && self.cpu.take_break().is_some() {
                let stdin = io::stdin();
                let outcome = debugger::interactive_break(
                    &mut self.cpu,
                    &mut stdin.lock(),
                    &mut io::stdout(),
                );
                match outcome {
                    Ok(DebugOutcome::Continue) => {}
                    Ok(DebugOutcome::Exit) | Err(_) => break,
                }
            }
        }
        cycles
    }

    /// The core, for inspection.
    #[must_use]
    pub fn cpu(&self) -> &Avr8 {
        &self.cpu
    }

    /// The core, for test setup and debugging.
    pub fn cpu_mut(&mut self) -> &mut Avr8 {
        &mut self.cpu
    }
}

impl Default for Attiny85 {
    fn default() -> Self {
        Self::new()
    }
}
