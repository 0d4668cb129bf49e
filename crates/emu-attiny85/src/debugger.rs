//! Interactive break debugger.
//!
//! A small prompt loop over an injected reader/writer pair; the CLI
//! wires it to stdin/stdout. Commands mirror the dump helpers plus a
//! view mode for poking around data, program and I/O space. Addresses
//! are read in decimal, values print in hex.

use std::io::{self, BufRead, Write};

use atmel_avr::{Avr8, GP_REGISTERS};
use emu_core::Cpu;

use crate::dump;

/// How the operator left the break prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugOutcome {
    /// Resume execution.
    Continue,
    /// Stop the run.
    Exit,
}

/// The break prompt. Entered when a `BREAK` executes or the stack
/// watch trips; loops until the operator continues or exits. End of
/// input counts as exit.
pub fn interactive_break(
    cpu: &mut Avr8,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<DebugOutcome> {
    writeln!(out, "BREAK at PC={:#06x}", cpu.registers().pc)?;
    loop {
        let command = read_command(
            input,
            out,
            "break [exit=e, continue=c, dump=d, view=v, m=memdump] ",
            &['c', 'd', 'v', 'e', 'm'],
        )?;
        match command {
            None | Some('e') => return Ok(DebugOutcome::Exit),
            Some('c') => return Ok(DebugOutcome::Continue),
            Some('d') => {
                dump::dump_registers(cpu, out)?;
                dump::dump_stack(cpu, out)?;
            }
            Some('v') => interactive_view(cpu, input, out)?,
            Some(_) => dump::dump_memory(cpu, out)?,
        }
    }
}

/// The view prompt: inspect single locations until `b` goes back.
pub fn interactive_view(
    cpu: &mut Avr8,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    let data_mem_size = cpu.layout().data_mem_size();
    let flash_words = cpu.layout().flash_words;
    loop {
        let command = read_command(
            input,
            out,
            "view [back=b, data=d, data word=w, program=p, io=i, register=r,X,Y,Z] ",
            &['d', 'p', 'r', 'i', 'b', 'w', 'X', 'Y', 'Z'],
        )?;
        let regs = cpu.registers();
        match command {
            None | Some('b') => return Ok(()),
            Some('d') => {
                let Some(a) = read_address(input, out, data_mem_size - 1)? else {
                    return Ok(());
                };
                let a = a % data_mem_size;
                writeln!(out, "DS[{a}] = {:#04x}", cpu.peek_data(a))?;
            }
            Some('w') => {
                let Some(a) = read_address(input, out, data_mem_size - 1)? else {
                    return Ok(());
                };
                let lo = a % data_mem_size;
                let hi = (a + 1) % data_mem_size;
                let word = u16::from(cpu.peek_data(lo)) | (u16::from(cpu.peek_data(hi)) << 8);
                writeln!(out, "DS[{hi}:{lo}] = {word:#06x}")?;
            }
            Some('p') => {
                let Some(a) = read_address(input, out, flash_words - 1)? else {
                    return Ok(());
                };
                let a = a % flash_words;
                writeln!(out, "PS[{a}] = {:#06x}", cpu.read_prog_word(a))?;
            }
            Some('i') => {
                let Some(a) = read_address(input, out, 63)? else {
                    return Ok(());
                };
                let a = a % 64;
                writeln!(out, "IO[{a}] = {:#04x}", cpu.peek_data(a + GP_REGISTERS))?;
            }
            Some('r') => {
                let Some(a) = read_address(input, out, 31)? else {
                    return Ok(());
                };
                let a = a % 32;
                writeln!(out, "R[{a}] = {:#04x}", regs.r[usize::from(a)])?;
            }
            Some('X') => writeln!(out, "R[X] = {:#06x}", regs.x())?,
            Some('Y') => writeln!(out, "R[Y] = {:#06x}", regs.y())?,
            Some(_) => writeln!(out, "R[Z] = {:#06x}", regs.z())?,
        }
    }
}

/// Prompt until a line starts with one of `accepted`. `None` on end of
/// input.
fn read_command(
    input: &mut impl BufRead,
    out: &mut impl Write,
    prompt: &str,
    accepted: &[char],
) -> io::Result<Option<char>> {
    loop {
        writeln!(out, "{prompt}")?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if let Some(c) = line.trim().chars().next() {
            if accepted.contains(&c) {
                return Ok(Some(c));
            }
        }
    }
}

/// Prompt for a decimal address until one parses. `None` on end of
/// input.
fn read_address(
    input: &mut impl BufRead,
    out: &mut impl Write,
    max: u16,
) -> io::Result<Option<u16>> {
    loop {
        writeln!(out, "address [0-{max}]")?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if let Ok(a) = line.trim().parse::<u16>() {
            return Ok(Some(a));
        }
    }
}
