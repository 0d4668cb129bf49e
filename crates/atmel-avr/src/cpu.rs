//! The AVR8 core.
//!
//! `Avr8` owns the whole microcontroller: register file, status
//! register, program counter, on-chip memories and the registered
//! peripherals. One [`Cpu::step`] is one fetch/decode/execute cycle
//! followed by the peripheral post-tick.

use emu_core::{Cpu, Peripheral};

use crate::decode;
use crate::memory::{IO_REGISTERS, Memory, MemoryLayout, Region, SPH, SPL};
use crate::registers::{RegisterFile, X, Y, Z};
use crate::sreg::Sreg;
use crate::variant::Variant;

/// I/O-file index of the status register.
const SREG_IO: u8 = 0x3F;

/// Why execution wants to drop into a debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    /// A `BREAK` instruction executed.
    BreakInstruction,
    /// A push moved the stack pointer below the collision watermark.
    StackCollision { sp: u16 },
}

/// Register snapshot for inspection and dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// The 32 general-purpose registers.
    pub r: [u8; 32],
    /// Program counter (word address).
    pub pc: u16,
    /// Stack pointer, already masked.
    pub sp: u16,
    /// Packed status register.
    pub sreg: u8,
}

impl Registers {
    /// The X pointer pair.
    #[must_use]
    pub fn x(&self) -> u16 {
        self.pair(X)
    }

    /// The Y pointer pair.
    #[must_use]
    pub fn y(&self) -> u16 {
        self.pair(Y)
    }

    /// The Z pointer pair.
    #[must_use]
    pub fn z(&self) -> u16 {
        self.pair(Z)
    }

    fn pair(&self, n: u8) -> u16 {
        u16::from(self.r[usize::from(n)]) | (u16::from(self.r[usize::from(n) + 1]) << 8)
    }
}

/// An AVR 8-bit microcontroller core.
pub struct Avr8 {
    pub(crate) regs: RegisterFile,
    pub(crate) sreg: Sreg,
    pub(crate) pc: u16,
    pub(crate) skip: bool,
    pub(crate) memory: Memory,
    pub(crate) variant: Variant,
    peripherals: Vec<Box<dyn Peripheral>>,
    pending_break: Option<BreakReason>,
    stack_watch: Option<u16>,
    warned_unknown: bool,
}

impl Avr8 {
    /// Create a core with the given geometry and instruction set, all
    /// memory zeroed and the stack pointer at the top of data space.
    #[must_use]
    pub fn new(layout: MemoryLayout, variant: Variant) -> Self {
        let mut cpu = Self {
            regs: RegisterFile::new(),
            sreg: Sreg::new(),
            pc: 0,
            skip: false,
            memory: Memory::new(layout),
            variant,
            peripherals: Vec::new(),
            pending_break: None,
            stack_watch: None,
            warned_unknown: false,
        };
        cpu.set_sp(layout.data_mem_size() - 1);
        cpu
    }

    /// Register a peripheral. Hooks fire in registration order.
    pub fn attach_peripheral(&mut self, peripheral: Box<dyn Peripheral>) {
        self.peripherals.push(peripheral);
    }

    /// Arm the stack-collision watch: any push that leaves SP below
    /// `watermark` warns and raises a pending break.
    pub fn arm_stack_watch(&mut self, watermark: u16) {
        self.stack_watch = Some(watermark);
    }

    /// Take the pending break event, if an instruction raised one.
    pub fn take_break(&mut self) -> Option<BreakReason> {
        self.pending_break.take()
    }

    /// The memory geometry this core was built with.
    #[must_use]
    pub fn layout(&self) -> MemoryLayout {
        self.memory.layout
    }

    /// The instruction-set variant this core was built with.
    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The stack pointer: SPH:SPL masked to the width of data space.
    #[must_use]
    pub fn sp(&self) -> u16 {
        let raw = u16::from(self.memory.io[SPL]) | (u16::from(self.memory.io[SPH]) << 8);
        raw & self.memory.layout.sp_mask()
    }

    /// Write the stack pointer through SPL/SPH.
    pub fn set_sp(&mut self, value: u16) {
        let masked = value & self.memory.layout.sp_mask();
        self.memory.io[SPL] = masked as u8;
        self.memory.io[SPH] = (masked >> 8) as u8;
    }

    /// Force the program counter (masked). Loaders and debuggers use
    /// this; instructions go through the executor.
    pub fn set_pc(&mut self, value: u16) {
        self.pc = value & self.memory.layout.pc_mask();
    }

    /// Read data space at `address`, firing peripheral hooks for I/O
    /// and extended I/O. The status-register address reads the packed
    /// flags.
    pub fn read_data(&mut self, address: u16) -> u8 {
        let b = self.memory.layout.wrap(address);
        match self.memory.layout.region(b) {
            Region::Gpr(n) => self.regs.get(n),
            Region::Io(n) => {
                for p in &mut self.peripherals {
                    p.pre_read(&mut self.memory.io, b);
                }
                let value = if n == SREG_IO {
                    self.sreg.to_byte()
                } else {
                    self.memory.io[usize::from(n)]
                };
                for p in &mut self.peripherals {
                    p.post_read(&mut self.memory.io, b);
                }
                value
            }
            Region::ExtIo(n) => {
                for p in &mut self.peripherals {
                    p.pre_read(&mut self.memory.io, b);
                }
                let value = self.memory.ext_io[usize::from(n)];
                for p in &mut self.peripherals {
                    p.post_read(&mut self.memory.io, b);
                }
                value
            }
            Region::Sram(n) => self.memory.sram[usize::from(n)],
            Region::Unmapped => 0,
        }
    }

    /// Write data space at `address`. A write to the status-register
    /// address dispatches into the flag array (the raw byte is stored
    /// too, but reads always repack).
    pub fn write_data(&mut self, address: u16, value: u8) {
        let b = self.memory.layout.wrap(address);
        match self.memory.layout.region(b) {
            Region::Gpr(n) => self.regs.set(n, value),
            Region::Io(n) => {
                if n == SREG_IO {
                    self.sreg = Sreg::from_byte(value);
                }
                for p in &mut self.peripherals {
                    p.pre_write(&mut self.memory.io, b);
                }
                self.memory.io[usize::from(n)] = value;
                for p in &mut self.peripherals {
                    p.post_write(&mut self.memory.io, b);
                }
            }
            Region::ExtIo(n) => {
                for p in &mut self.peripherals {
                    p.pre_write(&mut self.memory.io, b);
                }
                self.memory.ext_io[usize::from(n)] = value;
                for p in &mut self.peripherals {
                    p.post_write(&mut self.memory.io, b);
                }
            }
            Region::Sram(n) => self.memory.sram[usize::from(n)] = value,
            Region::Unmapped => {}
        }
    }

    /// Read data space without side effects: no peripheral hooks fire.
    /// For observation and dumps.
    #[must_use]
    pub fn peek_data(&self, address: u16) -> u8 {
        let b = self.memory.layout.wrap(address);
        match self.memory.layout.region(b) {
            Region::Gpr(n) => self.regs.get(n),
            Region::Io(n) if n == SREG_IO => self.sreg.to_byte(),
            Region::Io(n) => self.memory.io[usize::from(n)],
            Region::ExtIo(n) => self.memory.ext_io[usize::from(n)],
            Region::Sram(n) => self.memory.sram[usize::from(n)],
            Region::Unmapped => 0,
        }
    }

    /// Read the program word at word address `address`.
    #[must_use]
    pub fn read_prog_word(&self, address: u16) -> u16 {
        self.memory.prog_word(address)
    }

    /// Read program memory as `LPM` sees it: byte-addressed, low byte
    /// of each word first.
    #[must_use]
    pub fn read_prog_byte(&self, address: u16) -> u8 {
        self.memory.prog_byte(address)
    }

    /// Write the program word at word address `address`.
    pub fn write_prog_word(&mut self, address: u16, value: u16) {
        self.memory.set_prog_word(address, value);
    }

    /// Current status register.
    #[must_use]
    pub fn sreg(&self) -> Sreg {
        self.sreg
    }

    /// The EEPROM contents. Reserved storage: no instruction touches
    /// it, but device dumps and future EEPROM registers read from here.
    #[must_use]
    pub fn eeprom(&self) -> &[u8] {
        &self.memory.eeprom
    }

    /// True when the next instruction is armed to be skipped.
    #[must_use]
    pub fn skip_armed(&self) -> bool {
        self.skip
    }

    pub(crate) fn advance_pc(&mut self, delta: u16) {
        self.pc = self.pc.wrapping_add(delta) & self.memory.layout.pc_mask();
    }

    /// Set PC so the step loop's post-increment lands on `target`.
    pub(crate) fn jump_to(&mut self, target: u16) {
        self.pc = target.wrapping_sub(1) & self.memory.layout.pc_mask();
    }

    pub(crate) fn push8(&mut self, value: u8) {
        let sp = self.sp();
        self.check_stack(sp);
        self.write_data(sp, value);
        self.set_sp(sp.wrapping_sub(1));
    }

    pub(crate) fn pop8(&mut self) -> u8 {
        let sp = self.sp().wrapping_add(1);
        self.set_sp(sp);
        self.read_data(sp)
    }

    /// 16-bit push: low byte at SP, high byte at SP−1, SP −= 2.
    pub(crate) fn push16(&mut self, value: u16) {
        let sp = self.sp();
        self.check_stack(sp);
        self.write_data(sp, value as u8);
        self.write_data(sp.wrapping_sub(1), (value >> 8) as u8);
        self.set_sp(sp.wrapping_sub(2));
    }

    pub(crate) fn pop16(&mut self) -> u16 {
        let sp = self.sp().wrapping_add(2);
        self.set_sp(sp);
        u16::from(self.read_data(sp)) | (u16::from(self.read_data(sp.wrapping_sub(1))) << 8)
    }

    fn check_stack(&mut self, sp: u16) {
        if let Some(watermark) = self.stack_watch {
            if sp < watermark {
                eprintln!(
                    "warning: stack collision at PC={:#06x}, SP={:#06x}",
                    self.pc, sp
                );
                self.pending_break = Some(BreakReason::StackCollision { sp });
            }
        }
    }

    pub(crate) fn raise_break(&mut self) {
        self.pending_break = Some(BreakReason::BreakInstruction);
    }

    pub(crate) fn warn_unknown(&mut self, word: u16) {
        if !self.warned_unknown {
            eprintln!(
                "warning: unknown opcode {word:#06x} at PC={:#06x}, treating as NOP",
                self.pc
            );
            self.warned_unknown = true;
        }
    }
}

impl Cpu for Avr8 {
    type Registers = Registers;

    /// One machine cycle: honour an armed skip, otherwise decode and
    /// execute, then post-increment PC and run the peripheral tick.
    fn step(&mut self) {
        if self.skip {
            let word = self.memory.prog_word(self.pc);
            self.advance_pc(decode::words(word));
            self.skip = false;
        } else {
            let word = self.memory.prog_word(self.pc);
            let ext = self.memory.prog_word(self.pc.wrapping_add(1));
            let instruction = decode::decode(word, ext);
            self.execute(instruction);
            self.advance_pc(1);
        }

        for p in &mut self.peripherals {
            p.post_tick(&mut self.memory.io);
        }
    }

    fn pc(&self) -> u32 {
        u32::from(self.pc)
    }

    fn registers(&self) -> Registers {
        Registers {
            r: *self.regs.as_bytes(),
            pc: self.pc,
            sp: self.sp(),
            sreg: self.sreg.to_byte(),
        }
    }

    /// Reset to power-up state. Program memory is preserved so a loaded
    /// image can be rerun.
    fn reset(&mut self) {
        self.regs = RegisterFile::new();
        self.sreg = Sreg::new();
        self.pc = 0;
        self.skip = false;
        self.pending_break = None;
        self.memory.io = [0; IO_REGISTERS as usize];
        self.memory.ext_io.fill(0);
        self.memory.sram.fill(0);
        self.set_sp(self.memory.layout.data_mem_size() - 1);
    }
}
