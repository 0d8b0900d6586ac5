//! Decoder for 16-bit compressed encodings.
//!
//! Dispatch is on `(quadrant, funct3)`. Operands are reported in the
//! expanded form, so `c.li a0, 5` decodes to `[a0, x0, 5]` just like
//! `addi a0, x0, 5`. Reserved encodings yield `None`; HINT encodings decode
//! normally.

use crate::decoder::{Access, Attributes, DecodedInstruction, DecodedOperand};
use crate::format::{bit, bits, extract, ImmShape};
use crate::ir::Xlen;
use crate::mnemonic::Mnemonic;

use Access::{Read, Write};
use Mnemonic::*;

const ZERO: u32 = 0;
const RA: u32 = 1;
const SP: u32 = 2;

const NONE: Attributes = Attributes::NONE;
const LOAD: Attributes = Attributes::LOAD;
const STORE: Attributes = Attributes::STORE;
const FLOAD: Attributes = Attributes::LOAD.union(Attributes::FLOAT);
const FSTORE: Attributes = Attributes::STORE.union(Attributes::FLOAT);

fn build(
    m: Mnemonic,
    xlen: Xlen,
    half: u16,
    attributes: Attributes,
    operands: &[DecodedOperand],
) -> DecodedInstruction {
    let mut insn = DecodedInstruction::new(
        m,
        2,
        xlen,
        u32::from(half),
        attributes | Attributes::COMPRESSED,
    );
    for &op in operands {
        insn.push(op);
    }
    insn
}

/// Decode one compressed halfword.
pub(crate) fn decode(half: u16, xlen: Xlen) -> Option<DecodedInstruction> {
    let w = u32::from(half);
    let rv64 = xlen.has_rv64();
    let xl = xlen.bits();
    let rd = bits(w, 11, 7);
    let rs2 = bits(w, 6, 2);
    let rd_p = bits(w, 4, 2) + 8;
    let rs1_p = bits(w, 9, 7) + 8;

    let x = DecodedOperand::x;
    let f = DecodedOperand::f;
    let imm = |shape| DecodedOperand::Imm(extract(shape, w));
    let out = |m, attrs, ops: &[DecodedOperand]| Some(build(m, xlen, half, attrs, ops));

    match (w & 0b11, bits(w, 15, 13)) {
        // Quadrant 0
        (0b00, 0b000) => {
            let nzuimm = extract(ImmShape::Ciw, w);
            if nzuimm == 0 {
                return None;
            }
            out(CAddi4spn, NONE, &[x(rd_p, xl, Write), x(SP, xl, Read), DecodedOperand::Imm(nzuimm)])
        }
        (0b00, 0b001) => out(CFld, FLOAD, &[f(rd_p, 64, Write), x(rs1_p, xl, Read), imm(ImmShape::ClD)]),
        (0b00, 0b010) => out(CLw, LOAD, &[x(rd_p, xl, Write), x(rs1_p, xl, Read), imm(ImmShape::ClW)]),
        (0b00, 0b011) if rv64 => {
            out(CLd, LOAD, &[x(rd_p, xl, Write), x(rs1_p, xl, Read), imm(ImmShape::ClD)])
        }
        (0b00, 0b011) => out(CFlw, FLOAD, &[f(rd_p, 32, Write), x(rs1_p, xl, Read), imm(ImmShape::ClW)]),
        (0b00, 0b101) => out(CFsd, FSTORE, &[f(rd_p, 64, Read), x(rs1_p, xl, Read), imm(ImmShape::ClD)]),
        (0b00, 0b110) => out(CSw, STORE, &[x(rd_p, xl, Read), x(rs1_p, xl, Read), imm(ImmShape::ClW)]),
        (0b00, 0b111) if rv64 => {
            out(CSd, STORE, &[x(rd_p, xl, Read), x(rs1_p, xl, Read), imm(ImmShape::ClD)])
        }
        (0b00, 0b111) => out(CFsw, FSTORE, &[f(rd_p, 32, Read), x(rs1_p, xl, Read), imm(ImmShape::ClW)]),

        // Quadrant 1
        (0b01, 0b000) => {
            let m = if rd == ZERO { CNop } else { CAddi };
            out(m, NONE, &[x(rd, xl, Write), x(rd, xl, Read), imm(ImmShape::Ci)])
        }
        (0b01, 0b001) if rv64 => {
            if rd == ZERO {
                return None;
            }
            out(CAddiw, NONE, &[x(rd, 32, Write), x(rd, 32, Read), imm(ImmShape::Ci)])
        }
        (0b01, 0b001) => out(CJal, Attributes::JUMP, &[x(RA, xl, Write), imm(ImmShape::Cj)]),
        (0b01, 0b010) => out(CLi, NONE, &[x(rd, xl, Write), x(ZERO, xl, Read), imm(ImmShape::Ci)]),
        (0b01, 0b011) if rd == SP => {
            let nzimm = extract(ImmShape::CiAddi16sp, w);
            if nzimm == 0 {
                return None;
            }
            out(CAddi16sp, NONE, &[x(SP, xl, Write), x(SP, xl, Read), DecodedOperand::Imm(nzimm)])
        }
        (0b01, 0b011) => {
            let nzimm = extract(ImmShape::CiLui, w);
            if nzimm == 0 {
                return None;
            }
            out(CLui, NONE, &[x(rd, xl, Write), DecodedOperand::Imm((nzimm >> 12) & 0xF_FFFF)])
        }
        (0b01, 0b100) => {
            let rd_p = rs1_p;
            match bits(w, 11, 10) {
                0b00 | 0b01 => {
                    if !rv64 && bit(w, 12) != 0 {
                        return None;
                    }
                    let m = if bits(w, 11, 10) == 0 { CSrli } else { CSrai };
                    out(m, NONE, &[x(rd_p, xl, Write), x(rd_p, xl, Read), imm(ImmShape::CiShamt)])
                }
                0b10 => out(CAndi, NONE, &[x(rd_p, xl, Write), x(rd_p, xl, Read), imm(ImmShape::Ci)]),
                _ => {
                    let rs2_p = bits(w, 4, 2) + 8;
                    let (m, width) = match (bit(w, 12), bits(w, 6, 5)) {
                        (0, 0b00) => (CSub, xl),
                        (0, 0b01) => (CXor, xl),
                        (0, 0b10) => (COr, xl),
                        (0, _) => (CAnd, xl),
                        (_, 0b00) if rv64 => (CSubw, 32),
                        (_, 0b01) if rv64 => (CAddw, 32),
                        _ => return None,
                    };
                    out(m, NONE, &[x(rd_p, width, Write), x(rd_p, width, Read), x(rs2_p, width, Read)])
                }
            }
        }
        (0b01, 0b101) => out(CJ, Attributes::JUMP, &[x(ZERO, xl, Write), imm(ImmShape::Cj)]),
        (0b01, 0b110) => {
            out(CBeqz, Attributes::BRANCH, &[x(rs1_p, xl, Read), x(ZERO, xl, Read), imm(ImmShape::Cb)])
        }
        (0b01, 0b111) => {
            out(CBnez, Attributes::BRANCH, &[x(rs1_p, xl, Read), x(ZERO, xl, Read), imm(ImmShape::Cb)])
        }

        // Quadrant 2
        (0b10, 0b000) => {
            if !rv64 && bit(w, 12) != 0 {
                return None;
            }
            out(CSlli, NONE, &[x(rd, xl, Write), x(rd, xl, Read), imm(ImmShape::CiShamt)])
        }
        (0b10, 0b001) => out(CFldsp, FLOAD, &[f(rd, 64, Write), x(SP, xl, Read), imm(ImmShape::CiLdsp)]),
        (0b10, 0b010) => {
            if rd == ZERO {
                return None;
            }
            out(CLwsp, LOAD, &[x(rd, xl, Write), x(SP, xl, Read), imm(ImmShape::CiLwsp)])
        }
        (0b10, 0b011) if rv64 => {
            if rd == ZERO {
                return None;
            }
            out(CLdsp, LOAD, &[x(rd, xl, Write), x(SP, xl, Read), imm(ImmShape::CiLdsp)])
        }
        (0b10, 0b011) => out(CFlwsp, FLOAD, &[f(rd, 32, Write), x(SP, xl, Read), imm(ImmShape::CiLwsp)]),
        (0b10, 0b100) => match (bit(w, 12), rd, rs2) {
            (0, ZERO, ZERO) => None,
            (0, _, ZERO) => out(
                CJr,
                Attributes::JUMP,
                &[x(ZERO, xl, Write), x(rd, xl, Read), DecodedOperand::Imm(0)],
            ),
            (0, _, _) => out(CMv, NONE, &[x(rd, xl, Write), x(ZERO, xl, Read), x(rs2, xl, Read)]),
            (_, ZERO, ZERO) => out(CEbreak, Attributes::SYSTEM, &[]),
            (_, _, ZERO) => out(
                CJalr,
                Attributes::JUMP,
                &[x(RA, xl, Write), x(rd, xl, Read), DecodedOperand::Imm(0)],
            ),
            _ => out(CAdd, NONE, &[x(rd, xl, Write), x(rd, xl, Read), x(rs2, xl, Read)]),
        },
        (0b10, 0b101) => out(CFsdsp, FSTORE, &[f(rs2, 64, Read), x(SP, xl, Read), imm(ImmShape::CssSdsp)]),
        (0b10, 0b110) => out(CSwsp, STORE, &[x(rs2, xl, Read), x(SP, xl, Read), imm(ImmShape::CssSwsp)]),
        (0b10, 0b111) if rv64 => {
            out(CSdsp, STORE, &[x(rs2, xl, Read), x(SP, xl, Read), imm(ImmShape::CssSdsp)])
        }
        (0b10, 0b111) => out(CFswsp, FSTORE, &[f(rs2, 32, Read), x(SP, xl, Read), imm(ImmShape::CssSwsp)]),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodedOperand as Op;

    fn dec(half: u16, xlen: Xlen) -> DecodedInstruction {
        decode(half, xlen).unwrap()
    }

    #[test]
    fn reserved_encodings() {
        // all-zero halfword
        assert!(decode(0x0000, Xlen::Rv64).is_none());
        // c.addi16sp with zero immediate
        assert!(decode(0x6101, Xlen::Rv64).is_none());
        // c.lui with zero immediate
        assert!(decode(0x6501, Xlen::Rv64).is_none());
        // c.lwsp x0
        assert!(decode(0x4002, Xlen::Rv64).is_none());
        // c.jr x0
        assert!(decode(0x8002, Xlen::Rv64).is_none());
        // quadrant 0 funct3 100
        assert!(decode(0x8000 | 0x0004, Xlen::Rv64).is_none());
        // c.slli with shamt[5] on RV32
        assert!(decode(0x1502, Xlen::Rv32).is_none());
        assert_eq!(dec(0x1502, Xlen::Rv64).operand(2), Some(&Op::Imm(32)));
        // c.addiw x0
        assert!(decode(0x2001, Xlen::Rv64).is_none());
    }

    #[test]
    fn expanded_operands() {
        // c.li a0, 1
        let i = dec(0x4505, Xlen::Rv64);
        assert_eq!(i.mnemonic, CLi);
        assert_eq!(i.mnemonic.expanded(), Mnemonic::Addi);
        assert_eq!(
            i.operands(),
            &[Op::x(10, 64, Write), Op::x(0, 64, Read), Op::Imm(1)]
        );
        assert!(i.is_compressed());
        assert!(i.attributes.contains(Attributes::COMPRESSED));
        // c.lui a0, 1
        let i = dec(0x6505, Xlen::Rv64);
        assert_eq!(i.mnemonic, CLui);
        assert_eq!(i.operand(1), Some(&Op::Imm(1)));
        // c.lui a0, 0xfffff (-1)
        let i = dec(0x757D, Xlen::Rv64);
        assert_eq!(i.operand(1), Some(&Op::Imm(0xF_FFFF)));
    }

    #[test]
    fn stack_forms() {
        // c.addi sp, -16
        let i = dec(0x1141, Xlen::Rv64);
        assert_eq!(i.mnemonic, CAddi);
        assert_eq!(i.operand(2), Some(&Op::Imm(-16)));
        let i = dec(0x717D, Xlen::Rv64);
        assert_eq!(i.mnemonic, CAddi16sp);
        assert_eq!(i.operand(2), Some(&Op::Imm(-16)));
        // c.sdsp ra, 8(sp)
        let i = dec(0xE406, Xlen::Rv64);
        assert_eq!(i.mnemonic, CSdsp);
        assert_eq!(i.operands(), &[Op::x(1, 64, Read), Op::x(2, 64, Read), Op::Imm(8)]);
        // c.ldsp ra, 8(sp)
        let i = dec(0x60A2, Xlen::Rv64);
        assert_eq!(i.mnemonic, CLdsp);
        assert_eq!(i.operand(2), Some(&Op::Imm(8)));
        // c.addi4spn s0, sp, 8
        let i = dec(0x0020, Xlen::Rv64);
        assert_eq!(i.mnemonic, CAddi4spn);
        assert_eq!(i.operands(), &[Op::x(8, 64, Write), Op::x(2, 64, Read), Op::Imm(8)]);
    }

    #[test]
    fn xlen_dependent_slots() {
        // 0x2505: c.jal on RV32, c.addiw a0, 1 on RV64
        assert_eq!(dec(0x2505, Xlen::Rv32).mnemonic, CJal);
        let i = dec(0x2505, Xlen::Rv64);
        assert_eq!(i.mnemonic, CAddiw);
        assert_eq!(i.operands(), &[Op::x(10, 32, Write), Op::x(10, 32, Read), Op::Imm(1)]);
        // 0x6188: c.flw on RV32, c.ld on RV64
        assert_eq!(dec(0x6188, Xlen::Rv32).mnemonic, CFlw);
        assert_eq!(dec(0x6188, Xlen::Rv64).mnemonic, CLd);
        // c.addw only on RV64
        assert!(decode(0x9D2D, Xlen::Rv32).is_none());
        assert_eq!(dec(0x9D2D, Xlen::Rv64).mnemonic, CAddw);
    }

    #[test]
    fn control_flow() {
        let i = dec(0x8082, Xlen::Rv64);
        assert_eq!(i.mnemonic, CJr);
        assert_eq!(i.operands(), &[Op::x(0, 64, Write), Op::x(1, 64, Read), Op::Imm(0)]);
        assert!(i.attributes.contains(Attributes::JUMP));
        assert_eq!(dec(0x9502, Xlen::Rv64).mnemonic, CJalr);
        assert_eq!(dec(0x9002, Xlen::Rv64).mnemonic, CEbreak);
        // c.beqz a0, 8
        let i = dec(0xC501, Xlen::Rv64);
        assert_eq!(i.mnemonic, CBeqz);
        assert_eq!(i.operands(), &[Op::x(10, 64, Read), Op::x(0, 64, Read), Op::Imm(8)]);
        // c.j 4
        let i = dec(0xA011, Xlen::Rv64);
        assert_eq!(i.mnemonic, CJ);
        assert_eq!(i.operand(1), Some(&Op::Imm(4)));
    }

    #[test]
    fn register_ops() {
        // c.mv a0, a1
        let i = dec(0x852E, Xlen::Rv64);
        assert_eq!(i.mnemonic, CMv);
        assert_eq!(i.operands(), &[Op::x(10, 64, Write), Op::x(0, 64, Read), Op::x(11, 64, Read)]);
        // c.add a0, a1
        assert_eq!(dec(0x952E, Xlen::Rv64).mnemonic, CAdd);
        // c.sub a0, a1
        assert_eq!(dec(0x8D0D, Xlen::Rv64).mnemonic, CSub);
        // c.subw a0, a1
        let i = dec(0x9D0D, Xlen::Rv64);
        assert_eq!(i.mnemonic, CSubw);
        assert!(i.operands().iter().all(|o| o.width() == Some(32)));
    }
}
