//! A extension: load-reserved/store-conditional and AMOs.
//!
//! Every method takes an [`AtomicOrdering`] which sets the `aq`/`rl` bits.
//! The memory address is always `(rs1)` with no offset.

use crate::assembler::Assembler;
use crate::error::EncodeError;
use crate::format::amo_type;
use crate::ir::{AtomicOrdering, Gpr};
use crate::mnemonic::Mnemonic;

const WORD: u32 = 0b010;
const DOUBLE: u32 = 0b011;

macro_rules! amo_ops {
    ($( $(#[$doc:meta])* $name:ident => $m:ident, $funct5:expr, $width:expr; )*) => {
        impl Assembler {
            $(
                $(#[$doc])*
                pub fn $name(
                    &mut self,
                    rd: Gpr,
                    rs2: Gpr,
                    rs1: Gpr,
                    ordering: AtomicOrdering,
                ) -> Result<(), EncodeError> {
                    self.amo(Mnemonic::$m, $funct5, $width, rd, rs2, rs1, ordering)
                }
            )*
        }
    };
}

impl Assembler {
    fn amo(
        &mut self,
        m: Mnemonic,
        funct5: u32,
        width: u32,
        rd: Gpr,
        rs2: Gpr,
        rs1: Gpr,
        ordering: AtomicOrdering,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        self.emit_word(amo_type(
            funct5,
            ordering.aq(),
            ordering.rl(),
            rs2.num(),
            rs1.num(),
            width,
            rd.num(),
        ))
    }

    /// `lr.w rd, (rs1)`.
    pub fn lr_w(&mut self, rd: Gpr, rs1: Gpr, ordering: AtomicOrdering) -> Result<(), EncodeError> {
        self.amo(Mnemonic::LrW, 0b00010, WORD, rd, crate::ir::regs::ZERO, rs1, ordering)
    }

    /// `lr.d rd, (rs1)` (RV64).
    pub fn lr_d(&mut self, rd: Gpr, rs1: Gpr, ordering: AtomicOrdering) -> Result<(), EncodeError> {
        self.amo(Mnemonic::LrD, 0b00010, DOUBLE, rd, crate::ir::regs::ZERO, rs1, ordering)
    }
}

amo_ops! {
    /// `sc.w rd, rs2, (rs1)`: `rd` receives 0 on success.
    sc_w => ScW, 0b00011, WORD;
    /// `amoswap.w rd, rs2, (rs1)`.
    amoswap_w => AmoswapW, 0b00001, WORD;
    /// `amoadd.w rd, rs2, (rs1)`.
    amoadd_w => AmoaddW, 0b00000, WORD;
    /// `amoxor.w rd, rs2, (rs1)`.
    amoxor_w => AmoxorW, 0b00100, WORD;
    /// `amoand.w rd, rs2, (rs1)`.
    amoand_w => AmoandW, 0b01100, WORD;
    /// `amoor.w rd, rs2, (rs1)`.
    amoor_w => AmoorW, 0b01000, WORD;
    /// `amomin.w rd, rs2, (rs1)`.
    amomin_w => AmominW, 0b10000, WORD;
    /// `amomax.w rd, rs2, (rs1)`.
    amomax_w => AmomaxW, 0b10100, WORD;
    /// `amominu.w rd, rs2, (rs1)`.
    amominu_w => AmominuW, 0b11000, WORD;
    /// `amomaxu.w rd, rs2, (rs1)`.
    amomaxu_w => AmomaxuW, 0b11100, WORD;
    /// `sc.d rd, rs2, (rs1)` (RV64).
    sc_d => ScD, 0b00011, DOUBLE;
    /// `amoswap.d rd, rs2, (rs1)` (RV64).
    amoswap_d => AmoswapD, 0b00001, DOUBLE;
    /// `amoadd.d rd, rs2, (rs1)` (RV64).
    amoadd_d => AmoaddD, 0b00000, DOUBLE;
    /// `amoxor.d rd, rs2, (rs1)` (RV64).
    amoxor_d => AmoxorD, 0b00100, DOUBLE;
    /// `amoand.d rd, rs2, (rs1)` (RV64).
    amoand_d => AmoandD, 0b01100, DOUBLE;
    /// `amoor.d rd, rs2, (rs1)` (RV64).
    amoor_d => AmoorD, 0b01000, DOUBLE;
    /// `amomin.d rd, rs2, (rs1)` (RV64).
    amomin_d => AmominD, 0b10000, DOUBLE;
    /// `amomax.d rd, rs2, (rs1)` (RV64).
    amomax_d => AmomaxD, 0b10100, DOUBLE;
    /// `amominu.d rd, rs2, (rs1)` (RV64).
    amominu_d => AmominuD, 0b11000, DOUBLE;
    /// `amomaxu.d rd, rs2, (rs1)` (RV64).
    amomaxu_d => AmomaxuD, 0b11100, DOUBLE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::regs::*;
    use crate::ir::Xlen;

    fn word(xlen: Xlen, f: impl FnOnce(&mut Assembler) -> Result<(), EncodeError>) -> u32 {
        let mut asm = Assembler::new(xlen);
        f(&mut asm).unwrap();
        let b = asm.bytes();
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    #[test]
    fn lr_sc_words() {
        // lr.w a0, (a1)
        assert_eq!(word(Xlen::Rv32, |a| a.lr_w(A0, A1, AtomicOrdering::Relaxed)), 0x1005A52F);
        // sc.w a2, a3, (a1)
        assert_eq!(word(Xlen::Rv32, |a| a.sc_w(A2, A3, A1, AtomicOrdering::Relaxed)), 0x18D5A62F);
        // lr.d.aqrl a0, (a1)
        assert_eq!(word(Xlen::Rv64, |a| a.lr_d(A0, A1, AtomicOrdering::AcqRel)), 0x1605B52F);
    }

    #[test]
    fn ordering_bits() {
        let base = word(Xlen::Rv64, |a| a.amoadd_w(A0, A2, A1, AtomicOrdering::Relaxed));
        assert_eq!(base, 0x00C5A52F);
        let aq = word(Xlen::Rv64, |a| a.amoadd_w(A0, A2, A1, AtomicOrdering::Acquire));
        let rl = word(Xlen::Rv64, |a| a.amoadd_w(A0, A2, A1, AtomicOrdering::Release));
        assert_eq!(aq, base | 1 << 26);
        assert_eq!(rl, base | 1 << 25);
    }

    #[test]
    fn amo_funct5() {
        let w = word(Xlen::Rv64, |a| a.amomaxu_d(A0, A2, A1, AtomicOrdering::Relaxed));
        assert_eq!(w >> 27, 0b11100);
        assert_eq!((w >> 12) & 7, 0b011);
        let w = word(Xlen::Rv64, |a| a.amoswap_w(A0, A2, A1, AtomicOrdering::Relaxed));
        assert_eq!(w >> 27, 0b00001);
    }

    #[test]
    fn doubleword_needs_rv64() {
        let mut asm = Assembler::new(Xlen::Rv32);
        assert!(matches!(
            asm.amoadd_d(A0, A2, A1, AtomicOrdering::Relaxed),
            Err(EncodeError::UnsupportedInstruction { .. })
        ));
        assert!(asm.lr_d(A0, A1, AtomicOrdering::Relaxed).is_err());
        assert_eq!(asm.offset(), 0);
    }
}
