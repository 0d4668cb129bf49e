//! Instruction execution for the AVR core.
//!
//! The step loop post-increments PC by one word after every
//! instruction, so control transfers go through [`Avr8::jump_to`]
//! (which parks PC one word short of the target) and relative forms
//! simply add their displacement. Two-word instructions consume their
//! extra word here with `advance_pc(1)`.

use crate::alu;
use crate::cpu::Avr8;
use crate::decode::{Instruction, Pointer, PointerOp};
use crate::memory::GP_REGISTERS;
use crate::registers::Z;

impl Avr8 {
    pub(crate) fn execute(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Nop => {}

            // -------------------------------------------------------------
            // Two-operand arithmetic and logic
            // -------------------------------------------------------------
            Instruction::Add { d, r } => {
                let v = alu::add8(&mut self.sreg, self.regs.get(d), self.regs.get(r), false);
                self.regs.set(d, v);
            }
            Instruction::Adc { d, r } => {
                let carry = self.sreg.c;
                let v = alu::add8(&mut self.sreg, self.regs.get(d), self.regs.get(r), carry);
                self.regs.set(d, v);
            }
            Instruction::Sub { d, r } => {
                let v = alu::sub8(&mut self.sreg, self.regs.get(d), self.regs.get(r), false);
                self.regs.set(d, v);
            }
            Instruction::Sbc { d, r } => {
                let v = alu::sub8_chain(&mut self.sreg, self.regs.get(d), self.regs.get(r));
                self.regs.set(d, v);
            }
            Instruction::And { d, r } => {
                let v = alu::and8(&mut self.sreg, self.regs.get(d), self.regs.get(r));
                self.regs.set(d, v);
            }
            Instruction::Or { d, r } => {
                let v = alu::or8(&mut self.sreg, self.regs.get(d), self.regs.get(r));
                self.regs.set(d, v);
            }
            Instruction::Eor { d, r } => {
                let v = alu::eor8(&mut self.sreg, self.regs.get(d), self.regs.get(r));
                self.regs.set(d, v);
            }
            Instruction::Mov { d, r } => {
                let v = self.regs.get(r);
                self.regs.set(d, v);
            }

            // Compares share the subtract flag machine, result discarded
            Instruction::Cp { d, r } => {
                alu::sub8(&mut self.sreg, self.regs.get(d), self.regs.get(r), false);
            }
            Instruction::Cpc { d, r } => {
                alu::sub8_chain(&mut self.sreg, self.regs.get(d), self.regs.get(r));
            }

            // -------------------------------------------------------------
            // Immediate forms (r16..r31)
            // -------------------------------------------------------------
            Instruction::Cpi { d, k } => {
                alu::sub8(&mut self.sreg, self.regs.get(d), k, false);
            }
            Instruction::Subi { d, k } => {
                let v = alu::sub8(&mut self.sreg, self.regs.get(d), k, false);
                self.regs.set(d, v);
            }
            Instruction::Sbci { d, k } => {
                let v = alu::sub8_chain(&mut self.sreg, self.regs.get(d), k);
                self.regs.set(d, v);
            }
            Instruction::Ori { d, k } => {
                let v = alu::or8(&mut self.sreg, self.regs.get(d), k);
                self.regs.set(d, v);
            }
            Instruction::Andi { d, k } => {
                let v = alu::and8(&mut self.sreg, self.regs.get(d), k);
                self.regs.set(d, v);
            }
            Instruction::Ldi { d, k } => {
                self.regs.set(d, k);
            }

            // -------------------------------------------------------------
            // One-operand arithmetic
            // -------------------------------------------------------------
            Instruction::Com { d } => {
                let v = alu::com8(&mut self.sreg, self.regs.get(d));
                self.regs.set(d, v);
            }
            Instruction::Neg { d } => {
                let v = alu::sub8(&mut self.sreg, 0, self.regs.get(d), false);
                self.regs.set(d, v);
            }
            Instruction::Inc { d } => {
                let v = alu::inc8(&mut self.sreg, self.regs.get(d));
                self.regs.set(d, v);
            }
            Instruction::Dec { d } => {
                let v = alu::dec8(&mut self.sreg, self.regs.get(d));
                self.regs.set(d, v);
            }
            Instruction::Lsr { d } => {
                let v = alu::lsr8(&mut self.sreg, self.regs.get(d));
                self.regs.set(d, v);
            }
            Instruction::Ror { d } => {
                let v = alu::ror8(&mut self.sreg, self.regs.get(d));
                self.regs.set(d, v);
            }
            Instruction::Asr { d } => {
                let v = alu::asr8(&mut self.sreg, self.regs.get(d));
                self.regs.set(d, v);
            }
            Instruction::Swap { d } => {
                let v = self.regs.get(d);
                self.regs.set(d, (v << 4) | (v >> 4));
            }

            // -------------------------------------------------------------
            // 16-bit immediate arithmetic on the upper pairs
            // -------------------------------------------------------------
            Instruction::Adiw { p, k } => {
                let v = alu::adiw16(&mut self.sreg, self.regs.pair(p), k);
                self.regs.set_pair(p, v);
            }
            Instruction::Sbiw { p, k } => {
                let v = alu::sbiw16(&mut self.sreg, self.regs.pair(p), k);
                self.regs.set_pair(p, v);
            }

            // -------------------------------------------------------------
            // Multiply family (variant-gated), product into r1:r0
            // -------------------------------------------------------------
            Instruction::Mul { d, r } => {
                if self.variant.mul {
                    let product = u16::from(self.regs.get(d)) * u16::from(self.regs.get(r));
                    let v = alu::mul16(&mut self.sreg, product);
                    self.regs.set_pair(0, v);
                }
            }
            Instruction::Muls { d, r } => {
                if self.variant.mul {
                    let product = (i16::from(self.regs.get(d) as i8)
                        * i16::from(self.regs.get(r) as i8)) as u16;
                    let v = alu::mul16(&mut self.sreg, product);
                    self.regs.set_pair(0, v);
                }
            }
            Instruction::Mulsu { d, r } => {
                if self.variant.mul {
                    let product = (i16::from(self.regs.get(d) as i8)
                        .wrapping_mul(i16::from(self.regs.get(r)))) as u16;
                    let v = alu::mul16(&mut self.sreg, product);
                    self.regs.set_pair(0, v);
                }
            }
            Instruction::Fmul { d, r } => {
                if self.variant.mul {
                    let product = u16::from(self.regs.get(d)) * u16::from(self.regs.get(r));
                    let v = alu::fmul16(&mut self.sreg, product);
                    self.regs.set_pair(0, v);
                }
            }
            Instruction::Fmuls { d, r } => {
                if self.variant.mul {
                    let product = (i16::from(self.regs.get(d) as i8)
                        * i16::from(self.regs.get(r) as i8)) as u16;
                    let v = alu::fmul16(&mut self.sreg, product);
                    self.regs.set_pair(0, v);
                }
            }
            Instruction::Fmulsu { d, r } => {
                if self.variant.mul {
                    let product = (i16::from(self.regs.get(d) as i8)
                        .wrapping_mul(i16::from(self.regs.get(r)))) as u16;
                    let v = alu::fmul16(&mut self.sreg, product);
                    self.regs.set_pair(0, v);
                }
            }

            // -------------------------------------------------------------
            // Transfers
            // -------------------------------------------------------------
            Instruction::Movw { d, r } => {
                if self.variant.movw {
                    let v = self.regs.pair(r);
                    self.regs.set_pair(d, v);
                }
            }
            Instruction::Ld { d, ptr, op } => {
                let address = self.pointer_address(ptr, op);
                let v = self.read_data(address);
                self.regs.set(d, v);
            }
            Instruction::St { r, ptr, op } => {
                let address = self.pointer_address(ptr, op);
                let v = self.regs.get(r);
                self.write_data(address, v);
            }
            Instruction::Lds { d, address } => {
                self.advance_pc(1);
                let v = self.read_data(address);
                self.regs.set(d, v);
            }
            Instruction::Sts { r, address } => {
                self.advance_pc(1);
                let v = self.regs.get(r);
                self.write_data(address, v);
            }
            Instruction::Lpm { d, post_inc } => {
                let z = self.regs.pair(Z);
                let v = self.read_prog_byte(z);
                self.regs.set(d, v);
                if post_inc {
                    self.regs.set_pair(Z, z.wrapping_add(1));
                }
            }
            Instruction::Elpm { d, post_inc } => {
                // No RAMPZ on the supported cores, so an enabled ELPM
                // sees the same 64 KiB byte space as LPM.
                if self.variant.elpm {
                    let z = self.regs.pair(Z);
                    let v = self.read_prog_byte(z);
                    self.regs.set(d, v);
                    if post_inc {
                        self.regs.set_pair(Z, z.wrapping_add(1));
                    }
                }
            }
            Instruction::Spm => {
                // Self-programming is out of scope; decodes but does
                // nothing.
            }
            Instruction::In { d, a } => {
                let v = self.read_data(u16::from(a) + GP_REGISTERS);
                self.regs.set(d, v);
            }
            Instruction::Out { a, r } => {
                let v = self.regs.get(r);
                self.write_data(u16::from(a) + GP_REGISTERS, v);
            }
            Instruction::Push { r } => {
                let v = self.regs.get(r);
                self.push8(v);
            }
            Instruction::Pop { d } => {
                let v = self.pop8();
                self.regs.set(d, v);
            }

            // -------------------------------------------------------------
            // Bit operations
            // -------------------------------------------------------------
            Instruction::Bset { s } => self.sreg.set_flag(s, true),
            Instruction::Bclr { s } => self.sreg.set_flag(s, false),
            Instruction::Bst { d, b } => {
                self.sreg.t = self.regs.get(d) & (1 << b) != 0;
            }
            Instruction::Bld { d, b } => {
                let v = self.regs.get(d);
                if self.sreg.t {
                    self.regs.set(d, v | (1 << b));
                } else {
                    self.regs.set(d, v & !(1 << b));
                }
            }
            Instruction::Sbi { a, b } => {
                let address = u16::from(a) + GP_REGISTERS;
                let v = self.read_data(address);
                self.write_data(address, v | (1 << b));
            }
            Instruction::Cbi { a, b } => {
                let address = u16::from(a) + GP_REGISTERS;
                let v = self.read_data(address);
                self.write_data(address, v & !(1 << b));
            }

            // -------------------------------------------------------------
            // Skips: arm the pre-pass for the next cycle
            // -------------------------------------------------------------
            Instruction::Cpse { d, r } => {
                if self.regs.get(d) == self.regs.get(r) {
                    self.skip = true;
                }
            }
            Instruction::Sbrc { r, b } => {
                if self.regs.get(r) & (1 << b) == 0 {
                    self.skip = true;
                }
            }
            Instruction::Sbrs { r, b } => {
                if self.regs.get(r) & (1 << b) != 0 {
                    self.skip = true;
                }
            }
            Instruction::Sbic { a, b } => {
                if self.read_data(u16::from(a) + GP_REGISTERS) & (1 << b) == 0 {
                    self.skip = true;
                }
            }
            Instruction::Sbis { a, b } => {
                if self.read_data(u16::from(a) + GP_REGISTERS) & (1 << b) != 0 {
                    self.skip = true;
                }
            }

            // -------------------------------------------------------------
            // Branches: 7-bit displacement relative to PC+1
            // -------------------------------------------------------------
            Instruction::Brbs { s, k } => {
                if self.sreg.flag(s) {
                    self.advance_pc(k as u16);
                }
            }
            Instruction::Brbc { s, k } => {
                if !self.sreg.flag(s) {
                    self.advance_pc(k as u16);
                }
            }

            // -------------------------------------------------------------
            // Jumps and calls
            // -------------------------------------------------------------
            Instruction::Rjmp { k } => {
                self.advance_pc(k as u16);
            }
            Instruction::Rcall { k } => {
                let ret = self.pc.wrapping_add(1);
                self.push16(ret);
                self.advance_pc(k as u16);
            }
            Instruction::Ijmp => {
                let z = self.regs.pair(Z);
                self.jump_to(z);
            }
            Instruction::Icall => {
                let ret = self.pc.wrapping_add(1);
                self.push16(ret);
                let z = self.regs.pair(Z);
                self.jump_to(z);
            }
            // EIND is not modelled, so the extended forms see the same
            // 16-bit Z as IJMP/ICALL on cores that have them.
            Instruction::Eijmp => {
                if self.variant.eind {
                    let z = self.regs.pair(Z);
                    self.jump_to(z);
                }
            }
            Instruction::Eicall => {
                if self.variant.eind {
                    let ret = self.pc.wrapping_add(1);
                    self.push16(ret);
                    let z = self.regs.pair(Z);
                    self.jump_to(z);
                }
            }
            Instruction::Jmp { k } => {
                self.advance_pc(1);
                if self.variant.jmp_call {
                    self.jump_to(k as u16);
                }
            }
            Instruction::Call { k } => {
                self.advance_pc(1);
                if self.variant.jmp_call {
                    let ret = self.pc.wrapping_add(1);
                    self.push16(ret);
                    self.jump_to(k as u16);
                }
            }
            Instruction::Ret => {
                let ret = self.pop16();
                self.jump_to(ret);
            }
            Instruction::Reti => {
                let ret = self.pop16();
                self.jump_to(ret);
                self.sreg.i = true;
            }

            // -------------------------------------------------------------
            // Control
            // -------------------------------------------------------------
            Instruction::Sleep | Instruction::Wdr => {}
            Instruction::Break => self.raise_break(),
            Instruction::Reserved { word } => self.warn_unknown(word),
        }
    }

    /// Resolve an indirect address and apply the pointer update.
    fn pointer_address(&mut self, ptr: Pointer, op: PointerOp) -> u16 {
        let base = match ptr {
            Pointer::X => crate::registers::X,
            Pointer::Y => crate::registers::Y,
            Pointer::Z => Z,
        };
        let value = self.regs.pair(base);
        match op {
            PointerOp::None => value,
            PointerOp::Displacement(q) => value.wrapping_add(u16::from(q)),
            PointerOp::PostInc => {
                self.regs.set_pair(base, value.wrapping_add(1));
                value
            }
            PointerOp::PreDec => {
                let decremented = value.wrapping_sub(1);
                self.regs.set_pair(base, decremented);
                decremented
            }
        }
    }
}
