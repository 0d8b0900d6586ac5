//! C extension: explicit 16-bit instructions and the auto-compress rewrite.
//!
//! The explicit `c_*` methods reject operands the 16-bit form cannot
//! express. [`try_compress`] works on finished 32-bit words and only
//! narrows when the result executes identically.

use alloc::string::ToString;

use crate::assembler::{check_imm, invalid, Assembler, BranchTarget};
use crate::error::EncodeError;
use crate::format::{
    bits, ca_type, cb_alu, cb_type, ci_type, ciw_type, cj_type, cls_type, cr_type, css_type,
    extract, pack, ImmShape, C_OP_Q0, C_OP_Q1, C_OP_Q2, OP_BRANCH, OP_IMM, OP_IMM_W, OP_JAL,
    OP_JALR, OP_LOAD, OP_LOAD_FP, OP_LUI, OP_REG, OP_REG_W, OP_STORE, OP_STORE_FP,
};
use crate::ir::{Fpr, Gpr, Xlen};
use crate::label::SiteKind;
use crate::mnemonic::Mnemonic;

const EBREAK: u32 = 0x0010_0073;
const C_EBREAK: u16 = 0x9002;
const C_NOP: u16 = 0x0001;

/// Map a compact register (`x8`–`x15`) to its 3-bit field.
#[inline]
fn compact(num: u32) -> Option<u16> {
    if (8..16).contains(&num) {
        Some((num - 8) as u16)
    } else {
        None
    }
}

/// Narrow a 32-bit instruction word to its 16-bit equivalent.
///
/// Returns `None` when no C-extension form encodes the same operation with
/// the same operands. `addi rd, rs, 0` is never narrowed to `c.mv`; the
/// `mv` pseudo-instruction does that explicitly.
pub(crate) fn try_compress(word: u32, xlen: Xlen) -> Option<u16> {
    let rv64 = xlen.has_rv64();
    let opcode = word & 0x7F;
    let rd = bits(word, 11, 7);
    let funct3 = bits(word, 14, 12);
    let rs1 = bits(word, 19, 15);
    let rs2 = bits(word, 24, 20);
    let funct7 = bits(word, 31, 25);
    let rd16 = rd as u16;

    match (opcode, funct3) {
        (OP_IMM, 0b000) => {
            let imm = extract(ImmShape::I, word);
            if rd == 0 {
                return (rs1 == 0 && imm == 0).then_some(C_NOP);
            }
            if imm == 0 {
                return None;
            }
            if rs1 == 0 && ImmShape::Ci.fits(imm) {
                return Some(ci_type(0b010, rd16, pack(ImmShape::Ci, imm), C_OP_Q1));
            }
            if rd == rs1 && ImmShape::Ci.fits(imm) {
                return Some(ci_type(0b000, rd16, pack(ImmShape::Ci, imm), C_OP_Q1));
            }
            if rd == 2 && rs1 == 2 && ImmShape::CiAddi16sp.fits(imm) {
                return Some(ci_type(0b011, 2, pack(ImmShape::CiAddi16sp, imm), C_OP_Q1));
            }
            if rs1 == 2 && ImmShape::Ciw.fits(imm) {
                return Some(ciw_type(0b000, pack(ImmShape::Ciw, imm), compact(rd)?, C_OP_Q0));
            }
            None
        }
        (OP_IMM_W, 0b000) if rv64 && rd != 0 && rd == rs1 => {
            let imm = extract(ImmShape::I, word);
            ImmShape::Ci
                .fits(imm)
                .then(|| ci_type(0b001, rd16, pack(ImmShape::Ci, imm), C_OP_Q1))
        }
        (OP_IMM, 0b111) if rd == rs1 => {
            let imm = extract(ImmShape::I, word);
            let rd_p = compact(rd)?;
            ImmShape::Ci
                .fits(imm)
                .then(|| cb_alu(0b10, rd_p, pack(ImmShape::Ci, imm)))
        }
        (OP_IMM, 0b001) if rd != 0 && rd == rs1 && bits(word, 31, 26) == 0 => {
            let shamt = bits(word, 25, 20);
            (shamt != 0).then(|| ci_type(0b000, rd16, pack(ImmShape::CiShamt, i64::from(shamt)), C_OP_Q2))
        }
        (OP_IMM, 0b101) if rd == rs1 => {
            let shamt = bits(word, 25, 20);
            let funct2 = match bits(word, 31, 26) {
                0b00_0000 => 0b00,
                0b01_0000 => 0b01,
                _ => return None,
            };
            let rd_p = compact(rd)?;
            (shamt != 0).then(|| cb_alu(funct2, rd_p, pack(ImmShape::CiShamt, i64::from(shamt))))
        }
        (OP_LUI, _) if rd != 0 && rd != 2 => {
            let imm = crate::format::sign_extend(bits(word, 31, 12), 20);
            (imm != 0 && ImmShape::Ci.fits(imm))
                .then(|| ci_type(0b011, rd16, pack(ImmShape::CiLui, imm << 12), C_OP_Q1))
        }
        (OP_REG, 0b000) if funct7 == 0 => {
            if rd == 0 || rs2 == 0 {
                None
            } else if rs1 == 0 {
                Some(cr_type(0b1000, rd16, rs2 as u16, C_OP_Q2))
            } else if rd == rs1 {
                Some(cr_type(0b1001, rd16, rs2 as u16, C_OP_Q2))
            } else {
                None
            }
        }
        (OP_REG, _) if rd == rs1 => {
            let funct2 = match (funct7, funct3) {
                (0b010_0000, 0b000) => 0b00,
                (0, 0b100) => 0b01,
                (0, 0b110) => 0b10,
                (0, 0b111) => 0b11,
                _ => return None,
            };
            Some(ca_type(0b100011, compact(rd)?, funct2, compact(rs2)?, C_OP_Q1))
        }
        (OP_REG_W, 0b000) if rv64 && rd == rs1 => {
            let funct2 = match funct7 {
                0b010_0000 => 0b00,
                0 => 0b01,
                _ => return None,
            };
            Some(ca_type(0b100111, compact(rd)?, funct2, compact(rs2)?, C_OP_Q1))
        }
        (OP_LOAD, 0b010) => {
            let off = extract(ImmShape::I, word);
            load16(rd, rs1, off, rd != 0, (0b010, ImmShape::CiLwsp), (0b010, ImmShape::ClW))
        }
        (OP_LOAD, 0b011) if rv64 => {
            let off = extract(ImmShape::I, word);
            load16(rd, rs1, off, rd != 0, (0b011, ImmShape::CiLdsp), (0b011, ImmShape::ClD))
        }
        (OP_LOAD_FP, 0b010) if !rv64 => {
            let off = extract(ImmShape::I, word);
            load16(rd, rs1, off, true, (0b011, ImmShape::CiLwsp), (0b011, ImmShape::ClW))
        }
        (OP_LOAD_FP, 0b011) => {
            let off = extract(ImmShape::I, word);
            load16(rd, rs1, off, true, (0b001, ImmShape::CiLdsp), (0b001, ImmShape::ClD))
        }
        (OP_STORE, 0b010) => {
            let off = extract(ImmShape::S, word);
            store16(rs2, rs1, off, (0b110, ImmShape::CssSwsp), (0b110, ImmShape::ClW))
        }
        (OP_STORE, 0b011) if rv64 => {
            let off = extract(ImmShape::S, word);
            store16(rs2, rs1, off, (0b111, ImmShape::CssSdsp), (0b111, ImmShape::ClD))
        }
        (OP_STORE_FP, 0b010) if !rv64 => {
            let off = extract(ImmShape::S, word);
            store16(rs2, rs1, off, (0b111, ImmShape::CssSwsp), (0b111, ImmShape::ClW))
        }
        (OP_STORE_FP, 0b011) => {
            let off = extract(ImmShape::S, word);
            store16(rs2, rs1, off, (0b101, ImmShape::CssSdsp), (0b101, ImmShape::ClD))
        }
        (OP_JALR, 0b000) if rs1 != 0 && bits(word, 31, 20) == 0 => match rd {
            0 => Some(cr_type(0b1000, rs1 as u16, 0, C_OP_Q2)),
            1 => Some(cr_type(0b1001, rs1 as u16, 0, C_OP_Q2)),
            _ => None,
        },
        (OP_BRANCH, 0b000 | 0b001) if rs2 == 0 => {
            let off = extract(ImmShape::B, word);
            let rs1_p = compact(rs1)?;
            let funct = if funct3 == 0 { 0b110 } else { 0b111 };
            ImmShape::Cb.fits(off).then(|| cb_type(funct, rs1_p, off))
        }
        (OP_JAL, _) => {
            let off = extract(ImmShape::J, word);
            if !ImmShape::Cj.fits(off) {
                return None;
            }
            match rd {
                0 => Some(cj_type(0b101, off)),
                1 if !rv64 => Some(cj_type(0b001, off)),
                _ => None,
            }
        }
        _ if word == EBREAK => Some(C_EBREAK),
        _ => None,
    }
}

/// Stack-pointer form when the base is `sp`, otherwise the compact form.
fn load16(
    rd: u32,
    base: u32,
    off: i64,
    sp_allowed: bool,
    (sp_funct, sp_shape): (u16, ImmShape),
    (funct, shape): (u16, ImmShape),
) -> Option<u16> {
    if base == 2 && sp_allowed && sp_shape.fits(off) {
        return Some(ci_type(sp_funct, rd as u16, pack(sp_shape, off), C_OP_Q2));
    }
    let rd_p = compact(rd)?;
    let rs1_p = compact(base)?;
    shape
        .fits(off)
        .then(|| cls_type(funct, rs1_p, pack(shape, off), rd_p, C_OP_Q0))
}

fn store16(
    rs2: u32,
    base: u32,
    off: i64,
    (sp_funct, sp_shape): (u16, ImmShape),
    (funct, shape): (u16, ImmShape),
) -> Option<u16> {
    if base == 2 && sp_shape.fits(off) {
        return Some(css_type(sp_funct, pack(sp_shape, off), rs2 as u16, C_OP_Q2));
    }
    let rs2_p = compact(rs2)?;
    let rs1_p = compact(base)?;
    shape
        .fits(off)
        .then(|| cls_type(funct, rs1_p, pack(shape, off), rs2_p, C_OP_Q0))
}

impl Assembler {
    // ── Operand checks ───────────────────────────────────────

    fn cx(m: Mnemonic, r: Gpr) -> Result<u16, EncodeError> {
        r.compact()
            .map(u16::from)
            .ok_or_else(|| invalid(m, "register must be one of x8-x15"))
    }

    fn cf(m: Mnemonic, r: Fpr) -> Result<u16, EncodeError> {
        r.compact()
            .map(u16::from)
            .ok_or_else(|| invalid(m, "register must be one of f8-f15"))
    }

    fn nonzero_reg(m: Mnemonic, r: Gpr, what: &str) -> Result<u16, EncodeError> {
        if r.is_zero() {
            Err(invalid(m, what))
        } else {
            Ok(r.num() as u16)
        }
    }

    fn nonzero_imm(m: Mnemonic, shape: ImmShape, imm: i32) -> Result<u32, EncodeError> {
        check_imm(m, shape, i64::from(imm))?;
        if imm == 0 {
            return Err(invalid(m, "immediate must be non-zero"));
        }
        Ok(pack(shape, i64::from(imm)))
    }

    fn c_shamt(&self, m: Mnemonic, shamt: u32) -> Result<u32, EncodeError> {
        let max = self.isa_xlen().max_shamt();
        if shamt == 0 || shamt > max {
            return Err(EncodeError::ImmediateOverflow {
                mnemonic: m.as_str().to_string(),
                value: i64::from(shamt),
                min: 1,
                max: i64::from(max),
            });
        }
        Ok(pack(ImmShape::CiShamt, i64::from(shamt)))
    }

    fn emit_c(&mut self, m: Mnemonic, hw: u16) -> Result<(), EncodeError> {
        self.require(m)?;
        self.put16(hw)
    }

    fn c_load_store(
        &mut self,
        m: Mnemonic,
        funct3: u16,
        shape: ImmShape,
        base: Gpr,
        offset: i32,
        r_p: u16,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        let base_p = Self::cx(m, base)?;
        check_imm(m, shape, i64::from(offset))?;
        self.put16(cls_type(funct3, base_p, pack(shape, i64::from(offset)), r_p, C_OP_Q0))
    }

    fn c_branch(
        &mut self,
        m: Mnemonic,
        funct3: u16,
        rs1: Gpr,
        target: BranchTarget,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        let rs1_p = Self::cx(m, rs1)?;
        let resolved = self.resolve(m, SiteKind::CBranch, ImmShape::Cb, target)?;
        self.emit_pc_relative16(resolved, |disp| cb_type(funct3, rs1_p, disp))
    }

    fn c_jump(&mut self, m: Mnemonic, funct3: u16, target: BranchTarget) -> Result<(), EncodeError> {
        self.require(m)?;
        let resolved = self.resolve(m, SiteKind::CJump, ImmShape::Cj, target)?;
        self.emit_pc_relative16(resolved, |disp| cj_type(funct3, disp))
    }

    fn c_ca(&mut self, m: Mnemonic, funct6: u16, funct2: u16, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.require(m)?;
        let rd_p = Self::cx(m, rd)?;
        let rs2_p = Self::cx(m, rs2)?;
        self.put16(ca_type(funct6, rd_p, funct2, rs2_p, C_OP_Q1))
    }

    // ── Quadrant 0 ───────────────────────────────────────────

    /// `c.addi4spn rd', sp, nzuimm` with `nzuimm` a non-zero multiple of 4
    /// up to 1020.
    pub fn c_addi4spn(&mut self, rd: Gpr, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CAddi4spn;
        let rd_p = Self::cx(m, rd)?;
        let packed = Self::nonzero_imm(m, ImmShape::Ciw, imm)?;
        self.emit_c(m, ciw_type(0b000, packed, rd_p, C_OP_Q0))
    }

    /// `c.fld rd', offset(base')`.
    pub fn c_fld(&mut self, rd: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rd_p = Self::cf(Mnemonic::CFld, rd)?;
        self.c_load_store(Mnemonic::CFld, 0b001, ImmShape::ClD, base, offset, rd_p)
    }

    /// `c.lw rd', offset(base')`.
    pub fn c_lw(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rd_p = Self::cx(Mnemonic::CLw, rd)?;
        self.c_load_store(Mnemonic::CLw, 0b010, ImmShape::ClW, base, offset, rd_p)
    }

    /// `c.flw rd', offset(base')` (RV32).
    pub fn c_flw(&mut self, rd: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rd_p = Self::cf(Mnemonic::CFlw, rd)?;
        self.c_load_store(Mnemonic::CFlw, 0b011, ImmShape::ClW, base, offset, rd_p)
    }

    /// `c.ld rd', offset(base')` (RV64).
    pub fn c_ld(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rd_p = Self::cx(Mnemonic::CLd, rd)?;
        self.c_load_store(Mnemonic::CLd, 0b011, ImmShape::ClD, base, offset, rd_p)
    }

    /// `c.fsd rs2', offset(base')`.
    pub fn c_fsd(&mut self, rs2: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rs2_p = Self::cf(Mnemonic::CFsd, rs2)?;
        self.c_load_store(Mnemonic::CFsd, 0b101, ImmShape::ClD, base, offset, rs2_p)
    }

    /// `c.sw rs2', offset(base')`.
    pub fn c_sw(&mut self, rs2: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rs2_p = Self::cx(Mnemonic::CSw, rs2)?;
        self.c_load_store(Mnemonic::CSw, 0b110, ImmShape::ClW, base, offset, rs2_p)
    }

    /// `c.fsw rs2', offset(base')` (RV32).
    pub fn c_fsw(&mut self, rs2: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rs2_p = Self::cf(Mnemonic::CFsw, rs2)?;
        self.c_load_store(Mnemonic::CFsw, 0b111, ImmShape::ClW, base, offset, rs2_p)
    }

    /// `c.sd rs2', offset(base')` (RV64).
    pub fn c_sd(&mut self, rs2: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        let rs2_p = Self::cx(Mnemonic::CSd, rs2)?;
        self.c_load_store(Mnemonic::CSd, 0b111, ImmShape::ClD, base, offset, rs2_p)
    }

    // ── Quadrant 1 ───────────────────────────────────────────

    /// `c.nop`.
    pub fn c_nop(&mut self) -> Result<(), EncodeError> {
        self.emit_c(Mnemonic::CNop, C_NOP)
    }

    /// `c.addi rd, nzimm`.
    pub fn c_addi(&mut self, rd: Gpr, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CAddi;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        let packed = Self::nonzero_imm(m, ImmShape::Ci, imm)?;
        self.emit_c(m, ci_type(0b000, r, packed, C_OP_Q1))
    }

    /// `c.jal target` (RV32).
    pub fn c_jal(&mut self, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.c_jump(Mnemonic::CJal, 0b001, target.into())
    }

    /// `c.addiw rd, imm` (RV64).
    pub fn c_addiw(&mut self, rd: Gpr, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CAddiw;
        self.require(m)?;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        check_imm(m, ImmShape::Ci, i64::from(imm))?;
        self.put16(ci_type(0b001, r, pack(ImmShape::Ci, i64::from(imm)), C_OP_Q1))
    }

    /// `c.li rd, imm`.
    pub fn c_li(&mut self, rd: Gpr, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CLi;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        check_imm(m, ImmShape::Ci, i64::from(imm))?;
        self.emit_c(m, ci_type(0b010, r, pack(ImmShape::Ci, i64::from(imm)), C_OP_Q1))
    }

    /// `c.addi16sp nzimm`, a non-zero multiple of 16 in `-512..=496`.
    pub fn c_addi16sp(&mut self, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CAddi16sp;
        let packed = Self::nonzero_imm(m, ImmShape::CiAddi16sp, imm)?;
        self.emit_c(m, ci_type(0b011, 2, packed, C_OP_Q1))
    }

    /// `c.lui rd, nzimm` where `nzimm` is the upper immediate (`-32..=31`,
    /// non-zero) placed in bits 17:12. `rd` must not be `x0` or `sp`.
    pub fn c_lui(&mut self, rd: Gpr, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CLui;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        if r == 2 {
            return Err(invalid(m, "rd must not be sp"));
        }
        Self::nonzero_imm(m, ImmShape::Ci, imm)?;
        let packed = pack(ImmShape::CiLui, i64::from(imm) << 12);
        self.emit_c(m, ci_type(0b011, r, packed, C_OP_Q1))
    }

    /// `c.srli rd', shamt`.
    pub fn c_srli(&mut self, rd: Gpr, shamt: u32) -> Result<(), EncodeError> {
        let m = Mnemonic::CSrli;
        let rd_p = Self::cx(m, rd)?;
        let packed = self.c_shamt(m, shamt)?;
        self.emit_c(m, cb_alu(0b00, rd_p, packed))
    }

    /// `c.srai rd', shamt`.
    pub fn c_srai(&mut self, rd: Gpr, shamt: u32) -> Result<(), EncodeError> {
        let m = Mnemonic::CSrai;
        let rd_p = Self::cx(m, rd)?;
        let packed = self.c_shamt(m, shamt)?;
        self.emit_c(m, cb_alu(0b01, rd_p, packed))
    }

    /// `c.andi rd', imm`.
    pub fn c_andi(&mut self, rd: Gpr, imm: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CAndi;
        let rd_p = Self::cx(m, rd)?;
        check_imm(m, ImmShape::Ci, i64::from(imm))?;
        self.emit_c(m, cb_alu(0b10, rd_p, pack(ImmShape::Ci, i64::from(imm))))
    }

    /// `c.sub rd', rs2'`.
    pub fn c_sub(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.c_ca(Mnemonic::CSub, 0b100011, 0b00, rd, rs2)
    }

    /// `c.xor rd', rs2'`.
    pub fn c_xor(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.c_ca(Mnemonic::CXor, 0b100011, 0b01, rd, rs2)
    }

    /// `c.or rd', rs2'`.
    pub fn c_or(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.c_ca(Mnemonic::COr, 0b100011, 0b10, rd, rs2)
    }

    /// `c.and rd', rs2'`.
    pub fn c_and(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.c_ca(Mnemonic::CAnd, 0b100011, 0b11, rd, rs2)
    }

    /// `c.subw rd', rs2'` (RV64).
    pub fn c_subw(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.c_ca(Mnemonic::CSubw, 0b100111, 0b00, rd, rs2)
    }

    /// `c.addw rd', rs2'` (RV64).
    pub fn c_addw(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.c_ca(Mnemonic::CAddw, 0b100111, 0b01, rd, rs2)
    }

    /// `c.j target`.
    pub fn c_j(&mut self, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.c_jump(Mnemonic::CJ, 0b101, target.into())
    }

    /// `c.beqz rs1', target`.
    pub fn c_beqz(&mut self, rs1: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.c_branch(Mnemonic::CBeqz, 0b110, rs1, target.into())
    }

    /// `c.bnez rs1', target`.
    pub fn c_bnez(&mut self, rs1: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.c_branch(Mnemonic::CBnez, 0b111, rs1, target.into())
    }

    // ── Quadrant 2 ───────────────────────────────────────────

    /// `c.slli rd, shamt`.
    pub fn c_slli(&mut self, rd: Gpr, shamt: u32) -> Result<(), EncodeError> {
        let m = Mnemonic::CSlli;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        let packed = self.c_shamt(m, shamt)?;
        self.emit_c(m, ci_type(0b000, r, packed, C_OP_Q2))
    }

    /// `c.fldsp rd, offset(sp)`.
    pub fn c_fldsp(&mut self, rd: Fpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CFldsp;
        check_imm(m, ImmShape::CiLdsp, i64::from(offset))?;
        let packed = pack(ImmShape::CiLdsp, i64::from(offset));
        self.emit_c(m, ci_type(0b001, rd.num() as u16, packed, C_OP_Q2))
    }

    /// `c.lwsp rd, offset(sp)`.
    pub fn c_lwsp(&mut self, rd: Gpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CLwsp;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        check_imm(m, ImmShape::CiLwsp, i64::from(offset))?;
        let packed = pack(ImmShape::CiLwsp, i64::from(offset));
        self.emit_c(m, ci_type(0b010, r, packed, C_OP_Q2))
    }

    /// `c.flwsp rd, offset(sp)` (RV32).
    pub fn c_flwsp(&mut self, rd: Fpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CFlwsp;
        check_imm(m, ImmShape::CiLwsp, i64::from(offset))?;
        let packed = pack(ImmShape::CiLwsp, i64::from(offset));
        self.emit_c(m, ci_type(0b011, rd.num() as u16, packed, C_OP_Q2))
    }

    /// `c.ldsp rd, offset(sp)` (RV64).
    pub fn c_ldsp(&mut self, rd: Gpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CLdsp;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        check_imm(m, ImmShape::CiLdsp, i64::from(offset))?;
        let packed = pack(ImmShape::CiLdsp, i64::from(offset));
        self.emit_c(m, ci_type(0b011, r, packed, C_OP_Q2))
    }

    /// `c.jr rs1`.
    pub fn c_jr(&mut self, rs1: Gpr) -> Result<(), EncodeError> {
        let m = Mnemonic::CJr;
        let r = Self::nonzero_reg(m, rs1, "rs1 must not be x0")?;
        self.emit_c(m, cr_type(0b1000, r, 0, C_OP_Q2))
    }

    /// `c.mv rd, rs2`.
    pub fn c_mv(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        let m = Mnemonic::CMv;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        let s = Self::nonzero_reg(m, rs2, "rs2 must not be x0")?;
        self.emit_c(m, cr_type(0b1000, r, s, C_OP_Q2))
    }

    /// `c.ebreak`.
    pub fn c_ebreak(&mut self) -> Result<(), EncodeError> {
        self.emit_c(Mnemonic::CEbreak, C_EBREAK)
    }

    /// `c.jalr rs1`.
    pub fn c_jalr(&mut self, rs1: Gpr) -> Result<(), EncodeError> {
        let m = Mnemonic::CJalr;
        let r = Self::nonzero_reg(m, rs1, "rs1 must not be x0")?;
        self.emit_c(m, cr_type(0b1001, r, 0, C_OP_Q2))
    }

    /// `c.add rd, rs2`.
    pub fn c_add(&mut self, rd: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        let m = Mnemonic::CAdd;
        let r = Self::nonzero_reg(m, rd, "rd must not be x0")?;
        let s = Self::nonzero_reg(m, rs2, "rs2 must not be x0")?;
        self.emit_c(m, cr_type(0b1001, r, s, C_OP_Q2))
    }

    /// `c.fsdsp rs2, offset(sp)`.
    pub fn c_fsdsp(&mut self, rs2: Fpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CFsdsp;
        check_imm(m, ImmShape::CssSdsp, i64::from(offset))?;
        let packed = pack(ImmShape::CssSdsp, i64::from(offset));
        self.emit_c(m, css_type(0b101, packed, rs2.num() as u16, C_OP_Q2))
    }

    /// `c.swsp rs2, offset(sp)`.
    pub fn c_swsp(&mut self, rs2: Gpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CSwsp;
        check_imm(m, ImmShape::CssSwsp, i64::from(offset))?;
        let packed = pack(ImmShape::CssSwsp, i64::from(offset));
        self.emit_c(m, css_type(0b110, packed, rs2.num() as u16, C_OP_Q2))
    }

    /// `c.fswsp rs2, offset(sp)` (RV32).
    pub fn c_fswsp(&mut self, rs2: Fpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CFswsp;
        check_imm(m, ImmShape::CssSwsp, i64::from(offset))?;
        let packed = pack(ImmShape::CssSwsp, i64::from(offset));
        self.emit_c(m, css_type(0b111, packed, rs2.num() as u16, C_OP_Q2))
    }

    /// `c.sdsp rs2, offset(sp)` (RV64).
    pub fn c_sdsp(&mut self, rs2: Gpr, offset: i32) -> Result<(), EncodeError> {
        let m = Mnemonic::CSdsp;
        check_imm(m, ImmShape::CssSdsp, i64::from(offset))?;
        let packed = pack(ImmShape::CssSdsp, i64::from(offset));
        self.emit_c(m, css_type(0b111, packed, rs2.num() as u16, C_OP_Q2))
    }
}
