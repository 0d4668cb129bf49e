//! End-to-end program runs: whole images through the batch loop.
//!
//! Programs are assembled with the `atmel_avr::asm` encoders into the
//! raw little-endian image format the loader takes, then run to the PC
//! fixed point like the binary does.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use atmel_avr::{Pointer, PointerOp, asm};
use emu_attiny85::Attiny85;
use emu_core::Cpu;

/// Captures the USI character stream.
#[derive(Clone, Default)]
struct SharedOut(Rc<RefCell<Vec<u8>>>);

impl Write for SharedOut {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn machine_with_capture() -> (Attiny85, SharedOut) {
    let out = SharedOut::default();
    (Attiny85::with_usi_output(Box::new(out.clone())), out)
}

fn image(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn halt_image_reaches_a_fixed_point() {
    let mut machine = Attiny85::new();
    machine.load_image(&image(&[0xCFFF])); // rjmp .-2
    let cycles = machine.run_until_halt();
    assert!(cycles <= 2);
    assert_eq!(machine.cpu().registers().pc, 0);
}

#[test]
fn out_to_sreg_reads_back_through_data_space() {
    let mut machine = Attiny85::new();
    machine.load_image(&image(&[
        asm::ldi(16, 0xA5),
        asm::out(0x3F, 16),
        asm::rjmp(-1),
    ]));
    machine.run_until_halt();
    let cpu = machine.cpu();
    assert_eq!(cpu.registers().sreg, 0xA5);
    assert_eq!(cpu.peek_data(0x5F), 0xA5);
    assert_eq!(cpu.sreg().to_byte(), 0xA5);
}

#[test]
fn multi_byte_compare_across_the_borrow_chain() {
    // r1:r0 = 0x0100 = r3:r2, compared with CP/CPC
    let mut machine = Attiny85::new();
    machine.load_image(&image(&[
        asm::ldi(16, 0x00),
        asm::ldi(17, 0x01),
        asm::mov(0, 16),
        asm::mov(1, 17),
        asm::mov(2, 16),
        asm::mov(3, 17),
        asm::cp(0, 2),
        asm::cpc(1, 3),
        asm::rjmp(-1),
    ]));
    machine.run_until_halt();
    let sreg = machine.cpu().sreg();
    assert!(sreg.z, "equality across the chain");
    assert!(!sreg.c);
}

/// Iterative Fibonacci: fib(24) = 46368 stored little-endian at data
/// addresses 0x0001/0x0002.
#[test]
fn fibonacci_of_24() {
    let mut program = vec![
        asm::ldi(16, 0), // a = 0
        asm::ldi(17, 0),
        asm::ldi(18, 1), // b = 1
        asm::ldi(19, 0),
        asm::ldi(20, 24), // iterations
        // loop: (a, b) -> (b, a+b)
        asm::mov(21, 18), // word 5
        asm::mov(22, 19),
        asm::add(18, 16),
        asm::adc(19, 17),
        asm::mov(16, 21),
        asm::mov(17, 22),
        asm::dec(20),
        asm::brne(-8), // word 12 -> word 5
    ];
    program.extend_from_slice(&asm::sts(0x0001, 16));
    program.extend_from_slice(&asm::sts(0x0002, 17));
    program.push(asm::rjmp(-1));

    let mut machine = Attiny85::new();
    machine.load_image(&image(&program));
    machine.run_until_halt();

    let cpu = machine.cpu();
    let result = u16::from(cpu.peek_data(0x0001)) | (u16::from(cpu.peek_data(0x0002)) << 8);
    assert_eq!(result, 46368);
    assert_eq!(cpu.peek_data(0x0001), 0x20);
    assert_eq!(cpu.peek_data(0x0002), 0xB5);
}

/// Bubble sort over SRAM plus a line of USI output, with the printing
/// in an RCALL/RET subroutine so the call stack gets a workout.
#[test]
fn sort_and_print_through_the_usi() {
    const BASE: u8 = 0x60; // SRAM start, low byte (high byte 0)
    let text = b"Sort done.\n";

    let mut program = vec![
        // crt0: stack pointer to RAMEND (0x025F)
        asm::ldi(16, 0x5F),
        asm::out(0x3D, 16),
        asm::ldi(16, 0x02),
        asm::out(0x3E, 16),
        // fill 0x60..0x68 with 7,6,..,0
        asm::ldi(26, BASE),
        asm::ldi(27, 0x00),
        asm::ldi(16, 8),
        asm::ldi(17, 8),
        asm::dec(17), // word 8: fill loop
        asm::st(Pointer::X, 17, PointerOp::PostInc),
        asm::dec(16),
        asm::brne(-4), // word 11 -> word 8
        // bubble sort, 7 passes of 7 neighbour compares
        asm::ldi(20, 7),
        asm::ldi(26, BASE), // word 13: outer loop
        asm::ldi(27, 0x00),
        asm::mov(21, 20),
        asm::ld(18, Pointer::X, PointerOp::PostInc), // word 16: inner loop
        asm::ld(19, Pointer::X, PointerOp::None),
        asm::cp(19, 18),
        asm::brcc(3), // word 19 -> word 23, ordered pair
        asm::st(Pointer::X, 18, PointerOp::None),
        asm::st(Pointer::X, 19, PointerOp::PreDec),
        asm::adiw(26, 1),
        asm::dec(21), // word 23
        asm::brne(-9), // word 24 -> word 16
        asm::dec(20),
        asm::brne(-14), // word 26 -> word 13
    ];

    // print the text, one rcall per character; emit lands after the halt
    let emit = (27 + 2 * text.len() + 1) as i16;
    for (i, &c) in text.iter().enumerate() {
        program.push(asm::ldi(24, c));
        let here = (27 + 2 * i + 1) as i16;
        program.push(asm::rcall(emit - (here + 1)));
    }
    program.push(asm::rjmp(-1)); // halt

    // emit: push r24 through the USI with eight USICLK strobes
    assert_eq!(program.len(), emit as usize);
    program.push(asm::out(0x0F, 24)); // USIDR
    program.push(asm::ldi(25, 8));
    program.push(asm::sbi(0x0D, 1)); // strobe loop: set USICLK
    program.push(asm::dec(25));
    program.push(asm::brne(-3));
    program.push(asm::ret());

    let (mut machine, out) = machine_with_capture();
    machine.load_image(&image(&program));
    machine.run_until_halt();

    assert_eq!(out.0.borrow().as_slice(), text);

    let cpu = machine.cpu();
    let sorted: Vec<u8> = (0x60..0x68).map(|a| cpu.peek_data(a)).collect();
    assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    // subroutine returns unwound the stack
    assert_eq!(cpu.sp(), 0x025F);
    // the last character also sits in USIBR
    assert_eq!(cpu.peek_data(0x20 + 0x10), b'\n');
}

#[test]
fn skip_chain_with_bit_set_skips_the_jump() {
    let mut machine = Attiny85::new();
    machine.cpu_mut().write_data(0, 0x01); // r0 bit 0 set
    machine.load_image(&image(&[
        asm::sbrs(0, 0),
        asm::rjmp(1),
        asm::ldi(16, 0xAA),
        asm::ldi(17, 0xBB),
        asm::rjmp(-1),
    ]));
    machine.run_until_halt();
    let regs = machine.cpu().registers();
    assert_eq!(regs.r[16], 0xAA, "skipped RJMP lets the target run");
    assert_eq!(regs.r[17], 0xBB);
}

#[test]
fn skip_chain_with_bit_clear_takes_the_jump() {
    let mut machine = Attiny85::new();
    machine.load_image(&image(&[
        asm::sbrs(0, 0),
        asm::rjmp(1),
        asm::ldi(16, 0xAA),
        asm::ldi(17, 0xBB),
        asm::rjmp(-1),
    ]));
    machine.run_until_halt();
    let regs = machine.cpu().registers();
    assert_eq!(regs.r[16], 0x00, "RJMP executed and jumped the target");
    assert_eq!(regs.r[17], 0xBB);
}

#[test]
fn usi_stream_and_buffer_track_each_emitted_byte() {
    // one character, strobed by eight explicit USICLK writes
    let mut program = vec![asm::ldi(24, b'Z'), asm::out(0x0F, 24)];
    for _ in 0..8 {
        program.push(asm::sbi(0x0D, 1));
    }
    program.push(asm::rjmp(-1));

    let (mut machine, out) = machine_with_capture();
    machine.load_image(&image(&program));
    machine.run_until_halt();

    assert_eq!(out.0.borrow().as_slice(), b"Z");
    assert_eq!(machine.cpu().peek_data(0x20 + 0x10), b'Z');
}
