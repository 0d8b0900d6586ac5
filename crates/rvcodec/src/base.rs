//! RV32I/RV64I, M, Zicsr and Zifencei instructions and their pseudo-ops.
//!
//! Offsets are byte displacements. Memory operands are written as
//! `(reg, base, offset)`, matching the assembler form `op reg, offset(base)`.

use alloc::string::ToString;
use alloc::vec::Vec;

use crate::assembler::{check_imm, AuipcTarget, Assembler, BranchTarget};
use crate::error::EncodeError;
use crate::format::{
    b_type, i_type, j_type, pack, r_type, s_type, u_type, ImmShape, OP_AUIPC, OP_FENCE, OP_IMM,
    OP_IMM_W, OP_JALR, OP_LOAD, OP_LUI, OP_REG, OP_REG_W, OP_STORE, OP_SYSTEM,
};
use crate::ir::regs::{RA, T1, ZERO};
use crate::ir::{csr, FenceSet, Gpr};
use crate::label::{split_hi_lo, Label, SiteKind};
use crate::mnemonic::Mnemonic;

/// funct7 of the M extension.
const MULDIV: u32 = 0b000_0001;
/// funct7 selecting `sub`/`sra` and friends.
const ALT: u32 = 0b010_0000;

impl Assembler {
    // ── Internal shapes ──────────────────────────────────────

    fn r_op(
        &mut self,
        m: Mnemonic,
        opcode: u32,
        funct3: u32,
        funct7: u32,
        rd: Gpr,
        rs1: Gpr,
        rs2: Gpr,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        self.emit_word(r_type(opcode, rd.num(), funct3, rs1.num(), rs2.num(), funct7))
    }

    fn i_op(
        &mut self,
        m: Mnemonic,
        opcode: u32,
        funct3: u32,
        rd: Gpr,
        rs1: Gpr,
        imm: i32,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        check_imm(m, ImmShape::I, i64::from(imm))?;
        self.emit_word(i_type(opcode, rd.num(), funct3, rs1.num(), i64::from(imm)))
    }

    fn shift_op(
        &mut self,
        m: Mnemonic,
        opcode: u32,
        funct3: u32,
        arithmetic: bool,
        rd: Gpr,
        rs1: Gpr,
        shamt: u32,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        let max = if opcode == OP_IMM_W {
            31
        } else {
            self.isa_xlen().max_shamt()
        };
        if shamt > max {
            return Err(EncodeError::ImmediateOverflow {
                mnemonic: m.as_str().to_string(),
                value: i64::from(shamt),
                min: 0,
                max: i64::from(max),
            });
        }
        let imm = i64::from(shamt) | if arithmetic { 0x400 } else { 0 };
        self.emit_word(i_type(opcode, rd.num(), funct3, rs1.num(), imm))
    }

    fn load(
        &mut self,
        m: Mnemonic,
        funct3: u32,
        rd: Gpr,
        base: Gpr,
        offset: i32,
    ) -> Result<(), EncodeError> {
        self.i_op(m, OP_LOAD, funct3, rd, base, offset)
    }

    fn store(
        &mut self,
        m: Mnemonic,
        funct3: u32,
        rs2: Gpr,
        base: Gpr,
        offset: i32,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        check_imm(m, ImmShape::S, i64::from(offset))?;
        self.emit_word(s_type(OP_STORE, funct3, base.num(), rs2.num(), i64::from(offset)))
    }

    fn branch(
        &mut self,
        m: Mnemonic,
        funct3: u32,
        rs1: Gpr,
        rs2: Gpr,
        target: BranchTarget,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        let resolved = self.resolve(m, SiteKind::Branch, ImmShape::B, target)?;
        self.emit_pc_relative(resolved, true, |disp| {
            b_type(funct3, rs1.num(), rs2.num(), disp)
        })
    }

    fn csr_op(
        &mut self,
        m: Mnemonic,
        funct3: u32,
        rd: Gpr,
        csr: u16,
        src: u32,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        let word = pack(ImmShape::Csr, i64::from(csr))
            | (src << 15)
            | (funct3 << 12)
            | (rd.num() << 7)
            | OP_SYSTEM;
        self.emit_word(word)
    }

    fn csr_imm_op(
        &mut self,
        m: Mnemonic,
        funct3: u32,
        rd: Gpr,
        csr: u16,
        zimm: u8,
    ) -> Result<(), EncodeError> {
        check_imm(m, ImmShape::Uimm5, i64::from(zimm))?;
        self.csr_op(m, funct3, rd, csr, u32::from(zimm))
    }

    // ── RV32I ────────────────────────────────────────────────

    /// `lui rd, imm20`. The immediate is masked to 20 bits.
    pub fn lui(&mut self, rd: Gpr, imm20: i32) -> Result<(), EncodeError> {
        self.emit_word(u_type(OP_LUI, rd.num(), i64::from(imm20)))
    }

    /// `auipc rd, imm20`. The immediate is masked to 20 bits.
    pub fn auipc(&mut self, rd: Gpr, imm20: i32) -> Result<(), EncodeError> {
        self.put32(u_type(OP_AUIPC, rd.num(), i64::from(imm20)))
    }

    /// `jal rd, target`.
    pub fn jal(&mut self, rd: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        let m = Mnemonic::Jal;
        let resolved = self.resolve(m, SiteKind::Jal, ImmShape::J, target.into())?;
        self.emit_pc_relative(resolved, true, |disp| j_type(rd.num(), disp))
    }

    /// `jalr rd, offset(rs1)`.
    pub fn jalr(&mut self, rd: Gpr, rs1: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Jalr, OP_JALR, 0b000, rd, rs1, offset)
    }

    /// `beq rs1, rs2, target`.
    pub fn beq(&mut self, rs1: Gpr, rs2: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.branch(Mnemonic::Beq, 0b000, rs1, rs2, target.into())
    }

    /// `bne rs1, rs2, target`.
    pub fn bne(&mut self, rs1: Gpr, rs2: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.branch(Mnemonic::Bne, 0b001, rs1, rs2, target.into())
    }

    /// `blt rs1, rs2, target`.
    pub fn blt(&mut self, rs1: Gpr, rs2: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.branch(Mnemonic::Blt, 0b100, rs1, rs2, target.into())
    }

    /// `bge rs1, rs2, target`.
    pub fn bge(&mut self, rs1: Gpr, rs2: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.branch(Mnemonic::Bge, 0b101, rs1, rs2, target.into())
    }

    /// `bltu rs1, rs2, target`.
    pub fn bltu(&mut self, rs1: Gpr, rs2: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.branch(Mnemonic::Bltu, 0b110, rs1, rs2, target.into())
    }

    /// `bgeu rs1, rs2, target`.
    pub fn bgeu(&mut self, rs1: Gpr, rs2: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.branch(Mnemonic::Bgeu, 0b111, rs1, rs2, target.into())
    }

    /// `lb rd, offset(base)`.
    pub fn lb(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Lb, 0b000, rd, base, offset)
    }

    /// `lh rd, offset(base)`.
    pub fn lh(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Lh, 0b001, rd, base, offset)
    }

    /// `lw rd, offset(base)`.
    pub fn lw(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Lw, 0b010, rd, base, offset)
    }

    /// `lbu rd, offset(base)`.
    pub fn lbu(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Lbu, 0b100, rd, base, offset)
    }

    /// `lhu rd, offset(base)`.
    pub fn lhu(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Lhu, 0b101, rd, base, offset)
    }

    /// `sb rs2, offset(base)`.
    pub fn sb(&mut self, rs2: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.store(Mnemonic::Sb, 0b000, rs2, base, offset)
    }

    /// `sh rs2, offset(base)`.
    pub fn sh(&mut self, rs2: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.store(Mnemonic::Sh, 0b001, rs2, base, offset)
    }

    /// `sw rs2, offset(base)`.
    pub fn sw(&mut self, rs2: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.store(Mnemonic::Sw, 0b010, rs2, base, offset)
    }

    /// `addi rd, rs1, imm`.
    pub fn addi(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Addi, OP_IMM, 0b000, rd, rs1, imm)
    }

    /// `slti rd, rs1, imm`.
    pub fn slti(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Slti, OP_IMM, 0b010, rd, rs1, imm)
    }

    /// `sltiu rd, rs1, imm`.
    pub fn sltiu(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Sltiu, OP_IMM, 0b011, rd, rs1, imm)
    }

    /// `xori rd, rs1, imm`.
    pub fn xori(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Xori, OP_IMM, 0b100, rd, rs1, imm)
    }

    /// `ori rd, rs1, imm`.
    pub fn ori(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Ori, OP_IMM, 0b110, rd, rs1, imm)
    }

    /// `andi rd, rs1, imm`.
    pub fn andi(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Andi, OP_IMM, 0b111, rd, rs1, imm)
    }

    /// `slli rd, rs1, shamt`.
    pub fn slli(&mut self, rd: Gpr, rs1: Gpr, shamt: u32) -> Result<(), EncodeError> {
        self.shift_op(Mnemonic::Slli, OP_IMM, 0b001, false, rd, rs1, shamt)
    }

    /// `srli rd, rs1, shamt`.
    pub fn srli(&mut self, rd: Gpr, rs1: Gpr, shamt: u32) -> Result<(), EncodeError> {
        self.shift_op(Mnemonic::Srli, OP_IMM, 0b101, false, rd, rs1, shamt)
    }

    /// `srai rd, rs1, shamt`.
    pub fn srai(&mut self, rd: Gpr, rs1: Gpr, shamt: u32) -> Result<(), EncodeError> {
        self.shift_op(Mnemonic::Srai, OP_IMM, 0b101, true, rd, rs1, shamt)
    }

    /// `add rd, rs1, rs2`.
    pub fn add(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Add, OP_REG, 0b000, 0, rd, rs1, rs2)
    }

    /// `sub rd, rs1, rs2`.
    pub fn sub(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Sub, OP_REG, 0b000, ALT, rd, rs1, rs2)
    }

    /// `sll rd, rs1, rs2`.
    pub fn sll(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Sll, OP_REG, 0b001, 0, rd, rs1, rs2)
    }

    /// `slt rd, rs1, rs2`.
    pub fn slt(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Slt, OP_REG, 0b010, 0, rd, rs1, rs2)
    }

    /// `sltu rd, rs1, rs2`.
    pub fn sltu(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Sltu, OP_REG, 0b011, 0, rd, rs1, rs2)
    }

    /// `xor rd, rs1, rs2`.
    pub fn xor(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Xor, OP_REG, 0b100, 0, rd, rs1, rs2)
    }

    /// `srl rd, rs1, rs2`.
    pub fn srl(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Srl, OP_REG, 0b101, 0, rd, rs1, rs2)
    }

    /// `sra rd, rs1, rs2`.
    pub fn sra(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Sra, OP_REG, 0b101, ALT, rd, rs1, rs2)
    }

    /// `or rd, rs1, rs2`.
    pub fn or(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Or, OP_REG, 0b110, 0, rd, rs1, rs2)
    }

    /// `and rd, rs1, rs2`.
    pub fn and(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::And, OP_REG, 0b111, 0, rd, rs1, rs2)
    }

    /// `fence pred, succ`. Sets are masked to their 4 bits.
    pub fn fence(&mut self, pred: FenceSet, succ: FenceSet) -> Result<(), EncodeError> {
        self.emit_word(((pred.bits() & 0xF) << 24) | ((succ.bits() & 0xF) << 20) | OP_FENCE)
    }

    /// `ecall`.
    pub fn ecall(&mut self) -> Result<(), EncodeError> {
        self.emit_word(OP_SYSTEM)
    }

    /// `ebreak`.
    pub fn ebreak(&mut self) -> Result<(), EncodeError> {
        self.emit_word((1 << 20) | OP_SYSTEM)
    }

    // ── RV64I ────────────────────────────────────────────────

    /// `lwu rd, offset(base)` (RV64).
    pub fn lwu(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Lwu, 0b110, rd, base, offset)
    }

    /// `ld rd, offset(base)` (RV64).
    pub fn ld(&mut self, rd: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.load(Mnemonic::Ld, 0b011, rd, base, offset)
    }

    /// `sd rs2, offset(base)` (RV64).
    pub fn sd(&mut self, rs2: Gpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.store(Mnemonic::Sd, 0b011, rs2, base, offset)
    }

    /// `addiw rd, rs1, imm` (RV64).
    pub fn addiw(&mut self, rd: Gpr, rs1: Gpr, imm: i32) -> Result<(), EncodeError> {
        self.i_op(Mnemonic::Addiw, OP_IMM_W, 0b000, rd, rs1, imm)
    }

    /// `slliw rd, rs1, shamt` (RV64).
    pub fn slliw(&mut self, rd: Gpr, rs1: Gpr, shamt: u32) -> Result<(), EncodeError> {
        self.shift_op(Mnemonic::Slliw, OP_IMM_W, 0b001, false, rd, rs1, shamt)
    }

    /// `srliw rd, rs1, shamt` (RV64).
    pub fn srliw(&mut self, rd: Gpr, rs1: Gpr, shamt: u32) -> Result<(), EncodeError> {
        self.shift_op(Mnemonic::Srliw, OP_IMM_W, 0b101, false, rd, rs1, shamt)
    }

    /// `sraiw rd, rs1, shamt` (RV64).
    pub fn sraiw(&mut self, rd: Gpr, rs1: Gpr, shamt: u32) -> Result<(), EncodeError> {
        self.shift_op(Mnemonic::Sraiw, OP_IMM_W, 0b101, true, rd, rs1, shamt)
    }

    /// `addw rd, rs1, rs2` (RV64).
    pub fn addw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Addw, OP_REG_W, 0b000, 0, rd, rs1, rs2)
    }

    /// `subw rd, rs1, rs2` (RV64).
    pub fn subw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Subw, OP_REG_W, 0b000, ALT, rd, rs1, rs2)
    }

    /// `sllw rd, rs1, rs2` (RV64).
    pub fn sllw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Sllw, OP_REG_W, 0b001, 0, rd, rs1, rs2)
    }

    /// `srlw rd, rs1, rs2` (RV64).
    pub fn srlw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Srlw, OP_REG_W, 0b101, 0, rd, rs1, rs2)
    }

    /// `sraw rd, rs1, rs2` (RV64).
    pub fn sraw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Sraw, OP_REG_W, 0b101, ALT, rd, rs1, rs2)
    }

    // ── M ────────────────────────────────────────────────────

    /// `mul rd, rs1, rs2`.
    pub fn mul(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Mul, OP_REG, 0b000, MULDIV, rd, rs1, rs2)
    }

    /// `mulh rd, rs1, rs2`.
    pub fn mulh(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Mulh, OP_REG, 0b001, MULDIV, rd, rs1, rs2)
    }

    /// `mulhsu rd, rs1, rs2`.
    pub fn mulhsu(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Mulhsu, OP_REG, 0b010, MULDIV, rd, rs1, rs2)
    }

    /// `mulhu rd, rs1, rs2`.
    pub fn mulhu(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Mulhu, OP_REG, 0b011, MULDIV, rd, rs1, rs2)
    }

    /// `div rd, rs1, rs2`.
    pub fn div(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Div, OP_REG, 0b100, MULDIV, rd, rs1, rs2)
    }

    /// `divu rd, rs1, rs2`.
    pub fn divu(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Divu, OP_REG, 0b101, MULDIV, rd, rs1, rs2)
    }

    /// `rem rd, rs1, rs2`.
    pub fn rem(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Rem, OP_REG, 0b110, MULDIV, rd, rs1, rs2)
    }

    /// `remu rd, rs1, rs2`.
    pub fn remu(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Remu, OP_REG, 0b111, MULDIV, rd, rs1, rs2)
    }

    /// `mulw rd, rs1, rs2` (RV64).
    pub fn mulw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Mulw, OP_REG_W, 0b000, MULDIV, rd, rs1, rs2)
    }

    /// `divw rd, rs1, rs2` (RV64).
    pub fn divw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Divw, OP_REG_W, 0b100, MULDIV, rd, rs1, rs2)
    }

    /// `divuw rd, rs1, rs2` (RV64).
    pub fn divuw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Divuw, OP_REG_W, 0b101, MULDIV, rd, rs1, rs2)
    }

    /// `remw rd, rs1, rs2` (RV64).
    pub fn remw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Remw, OP_REG_W, 0b110, MULDIV, rd, rs1, rs2)
    }

    /// `remuw rd, rs1, rs2` (RV64).
    pub fn remuw(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.r_op(Mnemonic::Remuw, OP_REG_W, 0b111, MULDIV, rd, rs1, rs2)
    }

    // ── Zifencei / Zicsr ─────────────────────────────────────

    /// `fence.i`.
    pub fn fence_i(&mut self) -> Result<(), EncodeError> {
        self.emit_word((0b001 << 12) | OP_FENCE)
    }

    /// `csrrw rd, csr, rs1`. The CSR number is masked to 12 bits.
    pub fn csrrw(&mut self, rd: Gpr, csr: u16, rs1: Gpr) -> Result<(), EncodeError> {
        self.csr_op(Mnemonic::Csrrw, 0b001, rd, csr, rs1.num())
    }

    /// `csrrs rd, csr, rs1`.
    pub fn csrrs(&mut self, rd: Gpr, csr: u16, rs1: Gpr) -> Result<(), EncodeError> {
        self.csr_op(Mnemonic::Csrrs, 0b010, rd, csr, rs1.num())
    }

    /// `csrrc rd, csr, rs1`.
    pub fn csrrc(&mut self, rd: Gpr, csr: u16, rs1: Gpr) -> Result<(), EncodeError> {
        self.csr_op(Mnemonic::Csrrc, 0b011, rd, csr, rs1.num())
    }

    /// `csrrwi rd, csr, zimm` with `zimm` in `0..32`.
    pub fn csrrwi(&mut self, rd: Gpr, csr: u16, zimm: u8) -> Result<(), EncodeError> {
        self.csr_imm_op(Mnemonic::Csrrwi, 0b101, rd, csr, zimm)
    }

    /// `csrrsi rd, csr, zimm`.
    pub fn csrrsi(&mut self, rd: Gpr, csr: u16, zimm: u8) -> Result<(), EncodeError> {
        self.csr_imm_op(Mnemonic::Csrrsi, 0b110, rd, csr, zimm)
    }

    /// `csrrci rd, csr, zimm`.
    pub fn csrrci(&mut self, rd: Gpr, csr: u16, zimm: u8) -> Result<(), EncodeError> {
        self.csr_imm_op(Mnemonic::Csrrci, 0b111, rd, csr, zimm)
    }

    // ── Pseudo-instructions ──────────────────────────────────

    /// `nop` (`addi x0, x0, 0`).
    pub fn nop(&mut self) -> Result<(), EncodeError> {
        self.addi(ZERO, ZERO, 0)
    }

    /// `mv rd, rs` (`addi rd, rs, 0`).
    ///
    /// With auto-compress on and neither register `x0`, this is `c.mv`.
    pub fn mv(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        if self.current_config().auto_compress && !rd.is_zero() && !rs.is_zero() {
            return self.c_mv(rd, rs);
        }
        self.addi(rd, rs, 0)
    }

    /// `not rd, rs` (`xori rd, rs, -1`).
    pub fn not(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.xori(rd, rs, -1)
    }

    /// `neg rd, rs` (`sub rd, x0, rs`).
    pub fn neg(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.sub(rd, ZERO, rs)
    }

    /// `negw rd, rs` (`subw rd, x0, rs`, RV64).
    pub fn negw(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.subw(rd, ZERO, rs)
    }

    /// `sext.w rd, rs` (`addiw rd, rs, 0`, RV64).
    pub fn sext_w(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.addiw(rd, rs, 0)
    }

    /// `seqz rd, rs` (`sltiu rd, rs, 1`).
    pub fn seqz(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.sltiu(rd, rs, 1)
    }

    /// `snez rd, rs` (`sltu rd, x0, rs`).
    pub fn snez(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.sltu(rd, ZERO, rs)
    }

    /// `sltz rd, rs` (`slt rd, rs, x0`).
    pub fn sltz(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.slt(rd, rs, ZERO)
    }

    /// `sgtz rd, rs` (`slt rd, x0, rs`).
    pub fn sgtz(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.slt(rd, ZERO, rs)
    }

    /// `beqz rs, target`.
    pub fn beqz(&mut self, rs: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.beq(rs, ZERO, target)
    }

    /// `bnez rs, target`.
    pub fn bnez(&mut self, rs: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.bne(rs, ZERO, target)
    }

    /// `blez rs, target` (`bge x0, rs`).
    pub fn blez(&mut self, rs: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.bge(ZERO, rs, target)
    }

    /// `bgez rs, target` (`bge rs, x0`).
    pub fn bgez(&mut self, rs: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.bge(rs, ZERO, target)
    }

    /// `bltz rs, target` (`blt rs, x0`).
    pub fn bltz(&mut self, rs: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.blt(rs, ZERO, target)
    }

    /// `bgtz rs, target` (`blt x0, rs`).
    pub fn bgtz(&mut self, rs: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.blt(ZERO, rs, target)
    }

    /// `bgt rs, rt, target` (`blt rt, rs`).
    pub fn bgt(&mut self, rs: Gpr, rt: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.blt(rt, rs, target)
    }

    /// `ble rs, rt, target` (`bge rt, rs`).
    pub fn ble(&mut self, rs: Gpr, rt: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.bge(rt, rs, target)
    }

    /// `bgtu rs, rt, target` (`bltu rt, rs`).
    pub fn bgtu(&mut self, rs: Gpr, rt: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.bltu(rt, rs, target)
    }

    /// `bleu rs, rt, target` (`bgeu rt, rs`).
    pub fn bleu(&mut self, rs: Gpr, rt: Gpr, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.bgeu(rt, rs, target)
    }

    /// `j target` (`jal x0, target`).
    pub fn j(&mut self, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.jal(ZERO, target)
    }

    /// `jal target` (`jal ra, target`).
    pub fn jal_ra(&mut self, target: impl Into<BranchTarget>) -> Result<(), EncodeError> {
        self.jal(RA, target)
    }

    /// `jr rs` (`jalr x0, 0(rs)`).
    pub fn jr(&mut self, rs: Gpr) -> Result<(), EncodeError> {
        self.jalr(ZERO, rs, 0)
    }

    /// `jalr rs` (`jalr ra, 0(rs)`).
    pub fn jalr_ra(&mut self, rs: Gpr) -> Result<(), EncodeError> {
        self.jalr(RA, rs, 0)
    }

    /// `ret` (`jalr x0, 0(ra)`).
    pub fn ret(&mut self) -> Result<(), EncodeError> {
        self.jalr(ZERO, RA, 0)
    }

    /// `call label` (`auipc ra, hi; jalr ra, lo(ra)`).
    pub fn call(&mut self, label: Label) -> Result<(), EncodeError> {
        self.emit_auipc_pair(AuipcTarget::Label(label), RA, |lo| {
            i_type(OP_JALR, RA.num(), 0b000, RA.num(), lo)
        })
    }

    /// `tail label` (`auipc t1, hi; jalr x0, lo(t1)`).
    pub fn tail(&mut self, label: Label) -> Result<(), EncodeError> {
        self.emit_auipc_pair(AuipcTarget::Label(label), T1, |lo| {
            i_type(OP_JALR, ZERO.num(), 0b000, T1.num(), lo)
        })
    }

    /// `la rd, label` (`auipc rd, hi; addi rd, rd, lo`).
    pub fn la(&mut self, rd: Gpr, label: Label) -> Result<(), EncodeError> {
        self.emit_auipc_pair(AuipcTarget::Label(label), rd, |lo| {
            i_type(OP_IMM, rd.num(), 0b000, rd.num(), lo)
        })
    }

    /// `li rd, imm`: load an arbitrary constant in as few instructions as
    /// the `lui`/`addi(w)`/`slli` decomposition allows.
    ///
    /// On RV32 the value must fit in 32 bits; values above `i32::MAX` are
    /// taken as their 32-bit pattern.
    pub fn li(&mut self, rd: Gpr, imm: i64) -> Result<(), EncodeError> {
        let rv64 = self.isa_xlen().has_rv64();
        let value = if rv64 {
            imm
        } else {
            if imm < i64::from(i32::MIN) || imm > i64::from(u32::MAX) {
                return Err(EncodeError::ImmediateOverflow {
                    mnemonic: "li".to_string(),
                    value: imm,
                    min: i64::from(i32::MIN),
                    max: i64::from(u32::MAX),
                });
            }
            i64::from(imm as u32 as i32)
        };
        let mut words = Vec::with_capacity(8);
        li_sequence(rd.num(), value, rv64, &mut words);
        self.ensure_room(words.len() * 4)?;
        for word in words {
            self.emit_word(word)?;
        }
        Ok(())
    }

    /// `csrr rd, csr` (`csrrs rd, csr, x0`).
    pub fn csrr(&mut self, rd: Gpr, csr: u16) -> Result<(), EncodeError> {
        self.csrrs(rd, csr, ZERO)
    }

    /// `csrw csr, rs` (`csrrw x0, csr, rs`).
    pub fn csrw(&mut self, csr: u16, rs: Gpr) -> Result<(), EncodeError> {
        self.csrrw(ZERO, csr, rs)
    }

    /// `csrs csr, rs` (`csrrs x0, csr, rs`).
    pub fn csrs(&mut self, csr: u16, rs: Gpr) -> Result<(), EncodeError> {
        self.csrrs(ZERO, csr, rs)
    }

    /// `csrc csr, rs` (`csrrc x0, csr, rs`).
    pub fn csrc(&mut self, csr: u16, rs: Gpr) -> Result<(), EncodeError> {
        self.csrrc(ZERO, csr, rs)
    }

    /// `csrwi csr, zimm` (`csrrwi x0, csr, zimm`).
    pub fn csrwi(&mut self, csr: u16, zimm: u8) -> Result<(), EncodeError> {
        self.csrrwi(ZERO, csr, zimm)
    }

    /// `csrsi csr, zimm` (`csrrsi x0, csr, zimm`).
    pub fn csrsi(&mut self, csr: u16, zimm: u8) -> Result<(), EncodeError> {
        self.csrrsi(ZERO, csr, zimm)
    }

    /// `csrci csr, zimm` (`csrrci x0, csr, zimm`).
    pub fn csrci(&mut self, csr: u16, zimm: u8) -> Result<(), EncodeError> {
        self.csrrci(ZERO, csr, zimm)
    }

    /// `frcsr rd` (`csrrs rd, fcsr, x0`).
    pub fn frcsr(&mut self, rd: Gpr) -> Result<(), EncodeError> {
        self.csrrs(rd, csr::FCSR, ZERO)
    }

    /// `fscsr rd, rs` (`csrrw rd, fcsr, rs`).
    pub fn fscsr(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.csrrw(rd, csr::FCSR, rs)
    }

    /// `frrm rd` (`csrrs rd, frm, x0`).
    pub fn frrm(&mut self, rd: Gpr) -> Result<(), EncodeError> {
        self.csrrs(rd, csr::FRM, ZERO)
    }

    /// `fsrm rd, rs` (`csrrw rd, frm, rs`).
    pub fn fsrm(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.csrrw(rd, csr::FRM, rs)
    }

    /// `frflags rd` (`csrrs rd, fflags, x0`).
    pub fn frflags(&mut self, rd: Gpr) -> Result<(), EncodeError> {
        self.csrrs(rd, csr::FFLAGS, ZERO)
    }

    /// `fsflags rd, rs` (`csrrw rd, fflags, rs`).
    pub fn fsflags(&mut self, rd: Gpr, rs: Gpr) -> Result<(), EncodeError> {
        self.csrrw(rd, csr::FFLAGS, rs)
    }
}

/// Expand `li rd, value` into instruction words.
///
/// The first word always initialises `rd` from scratch (`lui` or
/// `addi rd, x0, imm`); later words use `rd` as source and destination.
/// On RV64 the low part of a 32-bit value uses `addiw` so a `lui` result
/// with bit 31 set is wrapped back to the intended sign.
pub(crate) fn li_sequence(rd: u32, value: i64, rv64: bool, out: &mut Vec<u32>) {
    if ImmShape::I.fits(value) {
        out.push(i_type(OP_IMM, rd, 0b000, 0, value));
        return;
    }

    if i32::try_from(value).is_ok() {
        let (hi, lo) = split_hi_lo(value);
        out.push(u_type(OP_LUI, rd, hi));
        if lo != 0 {
            let opcode = if rv64 { OP_IMM_W } else { OP_IMM };
            out.push(i_type(opcode, rd, 0b000, rd, lo));
        }
        return;
    }

    let lo12 = (value << 52) >> 52;
    let rest = value.wrapping_sub(lo12);
    let shamt = (rest as u64).trailing_zeros().clamp(12, 63);
    li_sequence(rd, rest >> shamt, rv64, out);
    out.push(i_type(OP_IMM, rd, 0b001, rd, i64::from(shamt)));
    if lo12 != 0 {
        out.push(i_type(OP_IMM, rd, 0b000, rd, lo12));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Xlen;
    use crate::ir::regs::*;

    fn words(asm: &Assembler) -> Vec<u32> {
        asm.bytes()
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn one(f: impl FnOnce(&mut Assembler) -> Result<(), EncodeError>) -> u32 {
        let mut asm = Assembler::new(Xlen::Rv64);
        f(&mut asm).unwrap();
        assert_eq!(asm.offset(), 4);
        words(&asm)[0]
    }

    /// Evaluate an `li` expansion the way the hardware would.
    fn run_li(words: &[u32], rv64: bool) -> i64 {
        let mut r: i64 = 0;
        for &w in words {
            let opcode = w & 0x7F;
            let funct3 = (w >> 12) & 7;
            let imm = crate::format::extract(ImmShape::I, w);
            r = match (opcode, funct3) {
                (OP_LUI, _) => (w & 0xFFFF_F000) as i32 as i64,
                (OP_IMM, 0b000) => {
                    let src = if (w >> 15) & 0x1F == 0 { 0 } else { r };
                    src.wrapping_add(imm)
                }
                (OP_IMM, 0b001) => r << (imm & 0x3F),
                (OP_IMM_W, 0b000) => (r.wrapping_add(imm) as i32) as i64,
                _ => panic!("unexpected word {w:#010x}"),
            };
            if !rv64 {
                r = r as i32 as i64;
            }
        }
        r
    }

    #[test]
    fn r_type_words() {
        assert_eq!(one(|a| a.add(X1, X2, X3)), 0x003100B3);
        assert_eq!(one(|a| a.sub(X1, X2, X3)), 0x403100B3);
        assert_eq!(one(|a| a.mul(A0, A1, A2)), 0x02C58533);
        assert_eq!(one(|a| a.divuw(A0, A1, A2)), 0x02C5D53B);
    }

    #[test]
    fn i_type_words() {
        assert_eq!(one(|a| a.addi(A0, A0, 1)), 0x00150513);
        assert_eq!(one(|a| a.addi(X1, X2, -1)), 0xFFF10093);
        assert_eq!(one(|a| a.lw(A0, SP, 8)), 0x00812503);
        assert_eq!(one(|a| a.sd(RA, SP, 8)), 0x00113423);
        assert_eq!(one(|a| a.ret()), 0x00008067);
        assert_eq!(one(|a| a.nop()), 0x00000013);
        assert_eq!(one(|a| a.ecall()), 0x00000073);
        assert_eq!(one(|a| a.ebreak()), 0x00100073);
    }

    #[test]
    fn shifts() {
        assert_eq!(one(|a| a.slli(A0, A0, 63)), 0x03F51513);
        assert_eq!(one(|a| a.srai(A0, A0, 1)), 0x40155513);
        assert_eq!(one(|a| a.sraiw(A0, A0, 31)), 0x41F5551B);
        let mut asm = Assembler::new(Xlen::Rv32);
        assert!(matches!(
            asm.slli(A0, A0, 32),
            Err(EncodeError::ImmediateOverflow { max: 31, .. })
        ));
        let mut asm = Assembler::new(Xlen::Rv64);
        assert!(asm.slliw(A0, A0, 32).is_err());
        assert!(asm.slli(A0, A0, 64).is_err());
        assert_eq!(asm.offset(), 0);
    }

    #[test]
    fn immediate_range_checked() {
        let mut asm = Assembler::new(Xlen::Rv64);
        assert_eq!(
            asm.addi(A0, A0, 2048),
            Err(EncodeError::ImmediateOverflow {
                mnemonic: "addi".into(),
                value: 2048,
                min: -2048,
                max: 2047
            })
        );
        assert!(asm.sw(A0, SP, -2049).is_err());
        assert!(asm.beq(A0, A1, 3).is_err());
        assert!(asm.jal(RA, 1 << 20).is_err());
        assert_eq!(asm.offset(), 0);
    }

    #[test]
    fn rv64_only_rejected_on_rv32() {
        let mut asm = Assembler::new(Xlen::Rv32);
        assert_eq!(
            asm.ld(A0, SP, 0),
            Err(EncodeError::UnsupportedInstruction {
                mnemonic: "ld".into(),
                xlen: Xlen::Rv32
            })
        );
        assert!(asm.addw(A0, A0, A0).is_err());
        assert!(asm.sext_w(A0, A0).is_err());
        assert!(asm.offset() == 0);
    }

    #[test]
    fn branch_offsets() {
        // beq x0, x0, +8
        assert_eq!(one(|a| a.beq(ZERO, ZERO, 8)), 0x00000463);
        // jal x0, -4
        assert_eq!(one(|a| a.j(-4)), 0xFFDFF06F);
    }

    #[test]
    fn pseudo_branches_swap_operands() {
        assert_eq!(one(|a| a.bgt(A0, A1, 16)), one(|a| a.blt(A1, A0, 16)));
        assert_eq!(one(|a| a.ble(A0, A1, 16)), one(|a| a.bge(A1, A0, 16)));
        assert_eq!(one(|a| a.bgtu(A0, A1, 16)), one(|a| a.bltu(A1, A0, 16)));
        assert_eq!(one(|a| a.bleu(A0, A1, 16)), one(|a| a.bgeu(A1, A0, 16)));
        assert_eq!(one(|a| a.blez(A0, 16)), one(|a| a.bge(ZERO, A0, 16)));
        assert_eq!(one(|a| a.bgtz(A0, 16)), one(|a| a.blt(ZERO, A0, 16)));
    }

    #[test]
    fn pseudo_alu() {
        assert_eq!(one(|a| a.mv(A0, A1)), one(|a| a.addi(A0, A1, 0)));
        assert_eq!(one(|a| a.not(A0, A1)), one(|a| a.xori(A0, A1, -1)));
        assert_eq!(one(|a| a.neg(A0, A1)), one(|a| a.sub(A0, ZERO, A1)));
        assert_eq!(one(|a| a.seqz(A0, A1)), one(|a| a.sltiu(A0, A1, 1)));
        assert_eq!(one(|a| a.snez(A0, A1)), one(|a| a.sltu(A0, ZERO, A1)));
    }

    #[test]
    fn csr_words() {
        // csrr a0, cycle
        assert_eq!(one(|a| a.csrr(A0, csr::CYCLE)), 0xC0002573);
        // csrwi fflags, 0
        assert_eq!(one(|a| a.csrwi(csr::FFLAGS, 0)), 0x00105073);
        // CSR number masked to 12 bits
        assert_eq!(one(|a| a.csrr(A0, 0xF000 | csr::CYCLE)), 0xC0002573);
        let mut asm = Assembler::new(Xlen::Rv64);
        assert!(asm.csrrwi(A0, csr::FCSR, 32).is_err());
    }

    #[test]
    fn fence_words() {
        assert_eq!(one(|a| a.fence(FenceSet::IORW, FenceSet::IORW)), 0x0FF0000F);
        assert_eq!(one(|a| a.fence(FenceSet::R | FenceSet::W, FenceSet::W)), 0x0310000F);
        assert_eq!(one(|a| a.fence_i()), 0x0000100F);
    }

    #[test]
    fn li_small_and_32bit() {
        let mut asm = Assembler::new(Xlen::Rv32);
        asm.li(A0, 42).unwrap();
        assert_eq!(words(&asm), [0x02A00513]);

        let mut asm = Assembler::new(Xlen::Rv32);
        asm.li(A0, 0x12345678).unwrap();
        assert_eq!(words(&asm), [0x12345537, 0x67850513]);

        let mut asm = Assembler::new(Xlen::Rv32);
        asm.li(A0, 0xFFFF_FFFF).unwrap();
        assert_eq!(words(&asm), [0xFFF00513]);

        let mut asm = Assembler::new(Xlen::Rv32);
        assert!(asm.li(A0, 1 << 32).is_err());
    }

    #[test]
    fn li_rv64_values_evaluate() {
        for &v in &[
            0i64,
            -1,
            2047,
            -2048,
            2048,
            0x7FFF_FFFF,
            0x7FFF_F800,
            -0x8000_0000,
            0x8000_0000,
            0xFFFF_FFFF,
            0x1234_5678_9ABC_DEF0,
            i64::MAX,
            i64::MIN,
            0x0000_0001_0000_0000,
            -0x1234_5678_9ABC,
        ] {
            let mut out = Vec::new();
            li_sequence(10, v, true, &mut out);
            assert!(out.len() <= 8, "{v:#x} took {} words", out.len());
            assert_eq!(run_li(&out, true), v, "{v:#x}");
        }
    }

    #[test]
    fn li_rv32_values_evaluate() {
        for &v in &[0i64, 1, -1, 0x7FFF_FFFF, -0x8000_0000, 0x7FFF_F800, 0x1000] {
            let mut out = Vec::new();
            li_sequence(10, v, false, &mut out);
            assert!(out.len() <= 2);
            assert_eq!(run_li(&out, false), v, "{v:#x}");
        }
    }

    #[test]
    fn la_and_call_bound_label() {
        let mut asm = Assembler::new(Xlen::Rv64);
        let f = asm.new_label();
        asm.bind(f).unwrap();
        asm.nop().unwrap();
        asm.call(f).unwrap();
        asm.la(A0, f).unwrap();
        let w = words(&asm);
        // call at 4: auipc ra, 0; jalr ra, -4(ra)
        assert_eq!(w[1], 0x00000097);
        assert_eq!(w[2], 0xFFC080E7);
        // la at 12: auipc a0, 0; addi a0, a0, -12
        assert_eq!(w[3], 0x00000517);
        assert_eq!(w[4], 0xFF450513);
    }

    #[test]
    fn tail_forward_label() {
        let mut asm = Assembler::new(Xlen::Rv64);
        let f = asm.new_label();
        asm.tail(f).unwrap();
        asm.bind_at(f, 0x1000).unwrap();
        let w = words(&asm);
        assert_eq!(w[0], u_type(OP_AUIPC, T1.num(), 1));
        assert_eq!(w[1], i_type(OP_JALR, 0, 0, T1.num(), 0));
    }

    #[test]
    fn upper_immediates_are_masked() {
        assert_eq!(one(|a| a.lui(A0, -1)), one(|a| a.lui(A0, 0xFFFFF)));
        assert_eq!(one(|a| a.lui(A0, 0x10_0001)), one(|a| a.lui(A0, 1)));
        assert_eq!(one(|a| a.auipc(T0, 0x80000)), 0x8000_0297);
    }
}
