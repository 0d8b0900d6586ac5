//! Declarative decode table for 32-bit encodings.
//!
//! Each [`Row`] is a `(mask, value)` pair: a word matches when
//! `word & mask == value`. Rows are pairwise disjoint, so lookup order does
//! not matter. The row's layout says how to rebuild the operands.

use crate::decoder::{Access, Attributes, DecodedInstruction, DecodedOperand};
use crate::format::{
    bit, bits, extract, ImmShape, OP_AMO, OP_AUIPC, OP_BRANCH, OP_FENCE, OP_FP, OP_IMM, OP_IMM_W,
    OP_JAL, OP_JALR, OP_LOAD, OP_LOAD_FP, OP_LUI, OP_MADD, OP_MSUB, OP_NMADD, OP_NMSUB, OP_REG,
    OP_REG_W, OP_STORE, OP_STORE_FP, OP_SYSTEM, OP_V,
};
use crate::ir::{AtomicOrdering, RoundingMode, VectorMask, Xlen};
use crate::mnemonic::{Extension, Mnemonic};

use Access::{Read, Write};

/// Register width of an integer operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Width {
    /// The decoder's XLEN.
    Xlen,
    /// A fixed number of bits.
    Fixed(u16),
}

impl Width {
    const fn bits(self, xlen: Xlen) -> u16 {
        match self {
            Width::Xlen => xlen.bits(),
            Width::Fixed(b) => b,
        }
    }
}

const X: Width = Width::Xlen;
const W: Width = Width::Fixed(32);
const DW: Width = Width::Fixed(64);
const S: u16 = 32;
const D: u16 = 64;

/// Operand layout of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    /// `rd, imm20`
    Upper,
    /// `rd, offset`
    Jump,
    /// `rd, rs1, imm` for `jalr`.
    JumpReg,
    /// `rs1, rs2, offset`
    Branch,
    /// `rd, rs1, imm` for integer loads. Operands are built exactly like
    /// [`Layout::JumpReg`].
    Load,
    /// `rs2, rs1, imm`
    Store,
    /// `rd, rs1, imm`
    RegImm(Width),
    /// `rd, rs1, shamt` with a 6-bit shift amount (5-bit on RV32).
    Shift,
    /// `rd, rs1, shamt` with a 5-bit shift amount.
    ShiftW,
    /// `rd, rs1, rs2`
    Reg(Width),
    /// `pred, succ`
    Fence,
    /// No operands.
    Bare,
    /// `rd, csr, rs1`
    Csr,
    /// `rd, csr, zimm`
    CsrImm,
    /// `rd, rs1` with `aq`/`rl`.
    LoadReserved(Width),
    /// `rd, rs2, rs1` with `aq`/`rl`.
    Amo(Width),
    /// `rd, rs2, rs1` with `aq`/`rl`; `rd` receives an XLEN-wide status code.
    StoreConditional(Width),
    /// `frd, rs1, imm`
    FLoad(u16),
    /// `frs2, rs1, imm`
    FStore(u16),
    /// `frd, frs1, frs2, frs3` with `rm`.
    FFused(u16),
    /// `frd, frs1, frs2` with `rm`.
    FArith(u16),
    /// `frd, frs1, frs2`
    FSelect(u16),
    /// `frd, frs1` with `rm`.
    FUnary(u16),
    /// `rd, frs1, frs2`
    FCompare(u16),
    /// `rd, frs1`, rounded when the encoding carries `rm`.
    FToX { x: Width, fp: u16, rounded: bool },
    /// `frd, rs1`, rounded when the encoding carries `rm`.
    XToF { fp: u16, x: Width, rounded: bool },
    /// `frd, frs1` between precisions, with `rm`.
    FConvert { to: u16, from: u16 },
    /// `rd, rs1, vtypei`
    Vsetvli,
    /// `rd, uimm, vtypei`
    Vsetivli,
    /// `rd, rs1, rs2`
    Vsetvl,
    /// `vd, rs1` with `vm`.
    VLoad,
    /// `vs3, rs1` with `vm`.
    VStore,
    /// `vd, vs2, vs1` with `vm`.
    VecVec,
    /// `vd, vs2, rs1` with `vm`.
    VecScalar,
    /// `vd, vs2, simm5` with `vm`.
    VecImm,
}

impl Layout {
    const fn has_rounding(self) -> bool {
        matches!(
            self,
            Layout::FFused(_)
                | Layout::FArith(_)
                | Layout::FUnary(_)
                | Layout::FConvert { .. }
                | Layout::FToX { rounded: true, .. }
                | Layout::XToF { rounded: true, .. }
        )
    }
}

/// One entry of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    /// Fixed bits of the encoding.
    pub mask: u32,
    /// Required values of the fixed bits.
    pub value: u32,
    /// Instruction the row decodes to.
    pub mnemonic: Mnemonic,
    /// Class flags of the instruction.
    pub attributes: Attributes,
    pub(crate) layout: Layout,
}

impl Row {
    const fn new(mask: u32, value: u32, mnemonic: Mnemonic, layout: Layout) -> Row {
        Row {
            mask,
            value,
            mnemonic,
            attributes: classify(mnemonic, layout),
            layout,
        }
    }

    /// Whether `word` has this row's fixed bits.
    #[inline]
    pub const fn matches(&self, word: u32) -> bool {
        word & self.mask == self.value
    }
}

const fn classify(m: Mnemonic, layout: Layout) -> Attributes {
    let by_layout = match layout {
        Layout::Jump | Layout::JumpReg => Attributes::JUMP,
        Layout::Branch => Attributes::BRANCH,
        Layout::Load | Layout::FLoad(_) | Layout::VLoad => Attributes::LOAD,
        Layout::Store | Layout::FStore(_) | Layout::VStore => Attributes::STORE,
        Layout::LoadReserved(_) => Attributes::ATOMIC.union(Attributes::LOAD),
        Layout::StoreConditional(_) => Attributes::ATOMIC.union(Attributes::STORE),
        Layout::Amo(_) => Attributes::ATOMIC
            .union(Attributes::LOAD)
            .union(Attributes::STORE),
        Layout::Fence | Layout::Bare | Layout::Csr | Layout::CsrImm => Attributes::SYSTEM,
        _ => Attributes::NONE,
    };
    let by_extension = match m.extension() {
        Extension::F | Extension::D => Attributes::FLOAT,
        Extension::V => Attributes::VECTOR,
        _ => Attributes::NONE,
    };
    by_layout.union(by_extension)
}

const M_OPCODE: u32 = 0x0000_007F;
const M_FUNCT3: u32 = 0x0000_707F;
const M_FUNCT7: u32 = 0xFE00_707F;
const M_FUNCT6: u32 = 0xFC00_707F;
const M_EXACT: u32 = 0xFFFF_FFFF;
const M_LR: u32 = 0xF9F0_707F;
const M_AMO: u32 = 0xF800_707F;
const M_FMA: u32 = 0x0600_007F;
const M_FP: u32 = 0xFE00_007F;
const M_FP_RS2: u32 = 0xFFF0_007F;
const M_FP_RS2_F3: u32 = 0xFFF0_707F;
const M_VMEM: u32 = 0xFDF0_707F;

const fn f3(opcode: u32, funct3: u32) -> u32 {
    (funct3 << 12) | opcode
}

const fn f7(opcode: u32, funct3: u32, funct7: u32) -> u32 {
    (funct7 << 25) | f3(opcode, funct3)
}

const fn f6(opcode: u32, funct3: u32, funct6: u32) -> u32 {
    (funct6 << 26) | f3(opcode, funct3)
}

const fn amo(funct5: u32, funct3: u32) -> u32 {
    (funct5 << 27) | f3(OP_AMO, funct3)
}

const fn fp(funct7: u32, rs2: u32, funct3: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | f3(OP_FP, funct3)
}

const fn fma(opcode: u32, fmt: u32) -> u32 {
    (fmt << 25) | opcode
}

macro_rules! table {
    ($( $m:ident: $mask:expr, $value:expr, $layout:expr; )*) => {
        static ROWS: &[Row] = &[
            $( Row::new($mask, $value, Mnemonic::$m, $layout), )*
        ];
    };
}

table! {
    // RV32I
    Lui: M_OPCODE, OP_LUI, Layout::Upper;
    Auipc: M_OPCODE, OP_AUIPC, Layout::Upper;
    Jal: M_OPCODE, OP_JAL, Layout::Jump;
    Jalr: M_FUNCT3, f3(OP_JALR, 0b000), Layout::JumpReg;
    Beq: M_FUNCT3, f3(OP_BRANCH, 0b000), Layout::Branch;
    Bne: M_FUNCT3, f3(OP_BRANCH, 0b001), Layout::Branch;
    Blt: M_FUNCT3, f3(OP_BRANCH, 0b100), Layout::Branch;
    Bge: M_FUNCT3, f3(OP_BRANCH, 0b101), Layout::Branch;
    Bltu: M_FUNCT3, f3(OP_BRANCH, 0b110), Layout::Branch;
    Bgeu: M_FUNCT3, f3(OP_BRANCH, 0b111), Layout::Branch;
    Lb: M_FUNCT3, f3(OP_LOAD, 0b000), Layout::Load;
    Lh: M_FUNCT3, f3(OP_LOAD, 0b001), Layout::Load;
    Lw: M_FUNCT3, f3(OP_LOAD, 0b010), Layout::Load;
    Lbu: M_FUNCT3, f3(OP_LOAD, 0b100), Layout::Load;
    Lhu: M_FUNCT3, f3(OP_LOAD, 0b101), Layout::Load;
    Sb: M_FUNCT3, f3(OP_STORE, 0b000), Layout::Store;
    Sh: M_FUNCT3, f3(OP_STORE, 0b001), Layout::Store;
    Sw: M_FUNCT3, f3(OP_STORE, 0b010), Layout::Store;
    Addi: M_FUNCT3, f3(OP_IMM, 0b000), Layout::RegImm(X);
    Slti: M_FUNCT3, f3(OP_IMM, 0b010), Layout::RegImm(X);
    Sltiu: M_FUNCT3, f3(OP_IMM, 0b011), Layout::RegImm(X);
    Xori: M_FUNCT3, f3(OP_IMM, 0b100), Layout::RegImm(X);
    Ori: M_FUNCT3, f3(OP_IMM, 0b110), Layout::RegImm(X);
    Andi: M_FUNCT3, f3(OP_IMM, 0b111), Layout::RegImm(X);
    Slli: M_FUNCT6, f6(OP_IMM, 0b001, 0b00_0000), Layout::Shift;
    Srli: M_FUNCT6, f6(OP_IMM, 0b101, 0b00_0000), Layout::Shift;
    Srai: M_FUNCT6, f6(OP_IMM, 0b101, 0b01_0000), Layout::Shift;
    Add: M_FUNCT7, f7(OP_REG, 0b000, 0), Layout::Reg(X);
    Sub: M_FUNCT7, f7(OP_REG, 0b000, 0x20), Layout::Reg(X);
    Sll: M_FUNCT7, f7(OP_REG, 0b001, 0), Layout::Reg(X);
    Slt: M_FUNCT7, f7(OP_REG, 0b010, 0), Layout::Reg(X);
    Sltu: M_FUNCT7, f7(OP_REG, 0b011, 0), Layout::Reg(X);
    Xor: M_FUNCT7, f7(OP_REG, 0b100, 0), Layout::Reg(X);
    Srl: M_FUNCT7, f7(OP_REG, 0b101, 0), Layout::Reg(X);
    Sra: M_FUNCT7, f7(OP_REG, 0b101, 0x20), Layout::Reg(X);
    Or: M_FUNCT7, f7(OP_REG, 0b110, 0), Layout::Reg(X);
    And: M_FUNCT7, f7(OP_REG, 0b111, 0), Layout::Reg(X);
    Fence: M_FUNCT3, f3(OP_FENCE, 0b000), Layout::Fence;
    Ecall: M_EXACT, OP_SYSTEM, Layout::Bare;
    Ebreak: M_EXACT, (1 << 20) | OP_SYSTEM, Layout::Bare;
    // RV64I
    Lwu: M_FUNCT3, f3(OP_LOAD, 0b110), Layout::Load;
    Ld: M_FUNCT3, f3(OP_LOAD, 0b011), Layout::Load;
    Sd: M_FUNCT3, f3(OP_STORE, 0b011), Layout::Store;
    Addiw: M_FUNCT3, f3(OP_IMM_W, 0b000), Layout::RegImm(W);
    Slliw: M_FUNCT7, f7(OP_IMM_W, 0b001, 0), Layout::ShiftW;
    Srliw: M_FUNCT7, f7(OP_IMM_W, 0b101, 0), Layout::ShiftW;
    Sraiw: M_FUNCT7, f7(OP_IMM_W, 0b101, 0x20), Layout::ShiftW;
    Addw: M_FUNCT7, f7(OP_REG_W, 0b000, 0), Layout::Reg(W);
    Subw: M_FUNCT7, f7(OP_REG_W, 0b000, 0x20), Layout::Reg(W);
    Sllw: M_FUNCT7, f7(OP_REG_W, 0b001, 0), Layout::Reg(W);
    Srlw: M_FUNCT7, f7(OP_REG_W, 0b101, 0), Layout::Reg(W);
    Sraw: M_FUNCT7, f7(OP_REG_W, 0b101, 0x20), Layout::Reg(W);
    // Zifencei / Zicsr
    FenceI: M_FUNCT3, f3(OP_FENCE, 0b001), Layout::Bare;
    Csrrw: M_FUNCT3, f3(OP_SYSTEM, 0b001), Layout::Csr;
    Csrrs: M_FUNCT3, f3(OP_SYSTEM, 0b010), Layout::Csr;
    Csrrc: M_FUNCT3, f3(OP_SYSTEM, 0b011), Layout::Csr;
    Csrrwi: M_FUNCT3, f3(OP_SYSTEM, 0b101), Layout::CsrImm;
    Csrrsi: M_FUNCT3, f3(OP_SYSTEM, 0b110), Layout::CsrImm;
    Csrrci: M_FUNCT3, f3(OP_SYSTEM, 0b111), Layout::CsrImm;
    // M
    Mul: M_FUNCT7, f7(OP_REG, 0b000, 1), Layout::Reg(X);
    Mulh: M_FUNCT7, f7(OP_REG, 0b001, 1), Layout::Reg(X);
    Mulhsu: M_FUNCT7, f7(OP_REG, 0b010, 1), Layout::Reg(X);
    Mulhu: M_FUNCT7, f7(OP_REG, 0b011, 1), Layout::Reg(X);
    Div: M_FUNCT7, f7(OP_REG, 0b100, 1), Layout::Reg(X);
    Divu: M_FUNCT7, f7(OP_REG, 0b101, 1), Layout::Reg(X);
    Rem: M_FUNCT7, f7(OP_REG, 0b110, 1), Layout::Reg(X);
    Remu: M_FUNCT7, f7(OP_REG, 0b111, 1), Layout::Reg(X);
    Mulw: M_FUNCT7, f7(OP_REG_W, 0b000, 1), Layout::Reg(W);
    Divw: M_FUNCT7, f7(OP_REG_W, 0b100, 1), Layout::Reg(W);
    Divuw: M_FUNCT7, f7(OP_REG_W, 0b101, 1), Layout::Reg(W);
    Remw: M_FUNCT7, f7(OP_REG_W, 0b110, 1), Layout::Reg(W);
    Remuw: M_FUNCT7, f7(OP_REG_W, 0b111, 1), Layout::Reg(W);
    // A
    LrW: M_LR, amo(0b00010, 0b010), Layout::LoadReserved(W);
    ScW: M_AMO, amo(0b00011, 0b010), Layout::StoreConditional(W);
    AmoswapW: M_AMO, amo(0b00001, 0b010), Layout::Amo(W);
    AmoaddW: M_AMO, amo(0b00000, 0b010), Layout::Amo(W);
    AmoxorW: M_AMO, amo(0b00100, 0b010), Layout::Amo(W);
    AmoandW: M_AMO, amo(0b01100, 0b010), Layout::Amo(W);
    AmoorW: M_AMO, amo(0b01000, 0b010), Layout::Amo(W);
    AmominW: M_AMO, amo(0b10000, 0b010), Layout::Amo(W);
    AmomaxW: M_AMO, amo(0b10100, 0b010), Layout::Amo(W);
    AmominuW: M_AMO, amo(0b11000, 0b010), Layout::Amo(W);
    AmomaxuW: M_AMO, amo(0b11100, 0b010), Layout::Amo(W);
    LrD: M_LR, amo(0b00010, 0b011), Layout::LoadReserved(DW);
    ScD: M_AMO, amo(0b00011, 0b011), Layout::StoreConditional(DW);
    AmoswapD: M_AMO, amo(0b00001, 0b011), Layout::Amo(DW);
    AmoaddD: M_AMO, amo(0b00000, 0b011), Layout::Amo(DW);
    AmoxorD: M_AMO, amo(0b00100, 0b011), Layout::Amo(DW);
    AmoandD: M_AMO, amo(0b01100, 0b011), Layout::Amo(DW);
    AmoorD: M_AMO, amo(0b01000, 0b011), Layout::Amo(DW);
    AmominD: M_AMO, amo(0b10000, 0b011), Layout::Amo(DW);
    AmomaxD: M_AMO, amo(0b10100, 0b011), Layout::Amo(DW);
    AmominuD: M_AMO, amo(0b11000, 0b011), Layout::Amo(DW);
    AmomaxuD: M_AMO, amo(0b11100, 0b011), Layout::Amo(DW);
    // F
    Flw: M_FUNCT3, f3(OP_LOAD_FP, 0b010), Layout::FLoad(S);
    Fsw: M_FUNCT3, f3(OP_STORE_FP, 0b010), Layout::FStore(S);
    FmaddS: M_FMA, fma(OP_MADD, 0), Layout::FFused(S);
    FmsubS: M_FMA, fma(OP_MSUB, 0), Layout::FFused(S);
    FnmsubS: M_FMA, fma(OP_NMSUB, 0), Layout::FFused(S);
    FnmaddS: M_FMA, fma(OP_NMADD, 0), Layout::FFused(S);
    FaddS: M_FP, fp(0b000_0000, 0, 0), Layout::FArith(S);
    FsubS: M_FP, fp(0b000_0100, 0, 0), Layout::FArith(S);
    FmulS: M_FP, fp(0b000_1000, 0, 0), Layout::FArith(S);
    FdivS: M_FP, fp(0b000_1100, 0, 0), Layout::FArith(S);
    FsqrtS: M_FP_RS2, fp(0b010_1100, 0, 0), Layout::FUnary(S);
    FsgnjS: M_FUNCT7, fp(0b001_0000, 0, 0b000), Layout::FSelect(S);
    FsgnjnS: M_FUNCT7, fp(0b001_0000, 0, 0b001), Layout::FSelect(S);
    FsgnjxS: M_FUNCT7, fp(0b001_0000, 0, 0b010), Layout::FSelect(S);
    FminS: M_FUNCT7, fp(0b001_0100, 0, 0b000), Layout::FSelect(S);
    FmaxS: M_FUNCT7, fp(0b001_0100, 0, 0b001), Layout::FSelect(S);
    FcvtWS: M_FP_RS2, fp(0b110_0000, 0, 0), Layout::FToX { x: W, fp: S, rounded: true };
    FcvtWuS: M_FP_RS2, fp(0b110_0000, 1, 0), Layout::FToX { x: W, fp: S, rounded: true };
    FmvXW: M_FP_RS2_F3, fp(0b111_0000, 0, 0b000), Layout::FToX { x: W, fp: S, rounded: false };
    FeqS: M_FUNCT7, fp(0b101_0000, 0, 0b010), Layout::FCompare(S);
    FltS: M_FUNCT7, fp(0b101_0000, 0, 0b001), Layout::FCompare(S);
    FleS: M_FUNCT7, fp(0b101_0000, 0, 0b000), Layout::FCompare(S);
    FclassS: M_FP_RS2_F3, fp(0b111_0000, 0, 0b001), Layout::FToX { x: X, fp: S, rounded: false };
    FcvtSW: M_FP_RS2, fp(0b110_1000, 0, 0), Layout::XToF { fp: S, x: W, rounded: true };
    FcvtSWu: M_FP_RS2, fp(0b110_1000, 1, 0), Layout::XToF { fp: S, x: W, rounded: true };
    FmvWX: M_FP_RS2_F3, fp(0b111_1000, 0, 0b000), Layout::XToF { fp: S, x: W, rounded: false };
    FcvtLS: M_FP_RS2, fp(0b110_0000, 2, 0), Layout::FToX { x: DW, fp: S, rounded: true };
    FcvtLuS: M_FP_RS2, fp(0b110_0000, 3, 0), Layout::FToX { x: DW, fp: S, rounded: true };
    FcvtSL: M_FP_RS2, fp(0b110_1000, 2, 0), Layout::XToF { fp: S, x: DW, rounded: true };
    FcvtSLu: M_FP_RS2, fp(0b110_1000, 3, 0), Layout::XToF { fp: S, x: DW, rounded: true };
    // D
    Fld: M_FUNCT3, f3(OP_LOAD_FP, 0b011), Layout::FLoad(D);
    Fsd: M_FUNCT3, f3(OP_STORE_FP, 0b011), Layout::FStore(D);
    FmaddD: M_FMA, fma(OP_MADD, 1), Layout::FFused(D);
    FmsubD: M_FMA, fma(OP_MSUB, 1), Layout::FFused(D);
    FnmsubD: M_FMA, fma(OP_NMSUB, 1), Layout::FFused(D);
    FnmaddD: M_FMA, fma(OP_NMADD, 1), Layout::FFused(D);
    FaddD: M_FP, fp(0b000_0001, 0, 0), Layout::FArith(D);
    FsubD: M_FP, fp(0b000_0101, 0, 0), Layout::FArith(D);
    FmulD: M_FP, fp(0b000_1001, 0, 0), Layout::FArith(D);
    FdivD: M_FP, fp(0b000_1101, 0, 0), Layout::FArith(D);
    FsqrtD: M_FP_RS2, fp(0b010_1101, 0, 0), Layout::FUnary(D);
    FsgnjD: M_FUNCT7, fp(0b001_0001, 0, 0b000), Layout::FSelect(D);
    FsgnjnD: M_FUNCT7, fp(0b001_0001, 0, 0b001), Layout::FSelect(D);
    FsgnjxD: M_FUNCT7, fp(0b001_0001, 0, 0b010), Layout::FSelect(D);
    FminD: M_FUNCT7, fp(0b001_0101, 0, 0b000), Layout::FSelect(D);
    FmaxD: M_FUNCT7, fp(0b001_0101, 0, 0b001), Layout::FSelect(D);
    FcvtSD: M_FP_RS2, fp(0b010_0000, 1, 0), Layout::FConvert { to: S, from: D };
    FcvtDS: M_FP_RS2, fp(0b010_0001, 0, 0), Layout::FConvert { to: D, from: S };
    FeqD: M_FUNCT7, fp(0b101_0001, 0, 0b010), Layout::FCompare(D);
    FltD: M_FUNCT7, fp(0b101_0001, 0, 0b001), Layout::FCompare(D);
    FleD: M_FUNCT7, fp(0b101_0001, 0, 0b000), Layout::FCompare(D);
    FclassD: M_FP_RS2_F3, fp(0b111_0001, 0, 0b001), Layout::FToX { x: X, fp: D, rounded: false };
    FcvtWD: M_FP_RS2, fp(0b110_0001, 0, 0), Layout::FToX { x: W, fp: D, rounded: true };
    FcvtWuD: M_FP_RS2, fp(0b110_0001, 1, 0), Layout::FToX { x: W, fp: D, rounded: true };
    FcvtDW: M_FP_RS2, fp(0b110_1001, 0, 0), Layout::XToF { fp: D, x: W, rounded: true };
    FcvtDWu: M_FP_RS2, fp(0b110_1001, 1, 0), Layout::XToF { fp: D, x: W, rounded: true };
    FcvtLD: M_FP_RS2, fp(0b110_0001, 2, 0), Layout::FToX { x: DW, fp: D, rounded: true };
    FcvtLuD: M_FP_RS2, fp(0b110_0001, 3, 0), Layout::FToX { x: DW, fp: D, rounded: true };
    FmvXD: M_FP_RS2_F3, fp(0b111_0001, 0, 0b000), Layout::FToX { x: DW, fp: D, rounded: false };
    FcvtDL: M_FP_RS2, fp(0b110_1001, 2, 0), Layout::XToF { fp: D, x: DW, rounded: true };
    FcvtDLu: M_FP_RS2, fp(0b110_1001, 3, 0), Layout::XToF { fp: D, x: DW, rounded: true };
    FmvDX: M_FP_RS2_F3, fp(0b111_1001, 0, 0b000), Layout::XToF { fp: D, x: DW, rounded: false };
    // V
    Vsetvli: 0x8000_707F, f3(OP_V, 0b111), Layout::Vsetvli;
    Vsetivli: 0xC000_707F, 0xC000_0000 | f3(OP_V, 0b111), Layout::Vsetivli;
    Vsetvl: M_FUNCT7, f7(OP_V, 0b111, 0b100_0000), Layout::Vsetvl;
    Vle8V: M_VMEM, f3(OP_LOAD_FP, 0b000), Layout::VLoad;
    Vle16V: M_VMEM, f3(OP_LOAD_FP, 0b101), Layout::VLoad;
    Vle32V: M_VMEM, f3(OP_LOAD_FP, 0b110), Layout::VLoad;
    Vle64V: M_VMEM, f3(OP_LOAD_FP, 0b111), Layout::VLoad;
    Vse8V: M_VMEM, f3(OP_STORE_FP, 0b000), Layout::VStore;
    Vse16V: M_VMEM, f3(OP_STORE_FP, 0b101), Layout::VStore;
    Vse32V: M_VMEM, f3(OP_STORE_FP, 0b110), Layout::VStore;
    Vse64V: M_VMEM, f3(OP_STORE_FP, 0b111), Layout::VStore;
    VaddVv: M_FUNCT6, f6(OP_V, 0b000, 0b00_0000), Layout::VecVec;
    VaddVx: M_FUNCT6, f6(OP_V, 0b100, 0b00_0000), Layout::VecScalar;
    VaddVi: M_FUNCT6, f6(OP_V, 0b011, 0b00_0000), Layout::VecImm;
    VsubVv: M_FUNCT6, f6(OP_V, 0b000, 0b00_0010), Layout::VecVec;
    VsubVx: M_FUNCT6, f6(OP_V, 0b100, 0b00_0010), Layout::VecScalar;
    VandVv: M_FUNCT6, f6(OP_V, 0b000, 0b00_1001), Layout::VecVec;
    VandVx: M_FUNCT6, f6(OP_V, 0b100, 0b00_1001), Layout::VecScalar;
    VandVi: M_FUNCT6, f6(OP_V, 0b011, 0b00_1001), Layout::VecImm;
    VorVv: M_FUNCT6, f6(OP_V, 0b000, 0b00_1010), Layout::VecVec;
    VorVx: M_FUNCT6, f6(OP_V, 0b100, 0b00_1010), Layout::VecScalar;
    VorVi: M_FUNCT6, f6(OP_V, 0b011, 0b00_1010), Layout::VecImm;
    VxorVv: M_FUNCT6, f6(OP_V, 0b000, 0b00_1011), Layout::VecVec;
    VxorVx: M_FUNCT6, f6(OP_V, 0b100, 0b00_1011), Layout::VecScalar;
    VxorVi: M_FUNCT6, f6(OP_V, 0b011, 0b00_1011), Layout::VecImm;
    VmulVv: M_FUNCT6, f6(OP_V, 0b010, 0b10_0101), Layout::VecVec;
    VmulVx: M_FUNCT6, f6(OP_V, 0b110, 0b10_0101), Layout::VecScalar;
}

/// Every row of the 32-bit decode table.
pub fn rows() -> &'static [Row] {
    ROWS
}

/// Look up the row for `word`, honoring `xlen` availability.
pub fn lookup(word: u32, xlen: Xlen) -> Option<&'static Row> {
    ROWS.iter()
        .find(|row| row.matches(word) && row.mnemonic.available(xlen))
}

/// Decode one 32-bit word.
pub(crate) fn decode(word: u32, xlen: Xlen) -> Option<DecodedInstruction> {
    let row = lookup(word, xlen)?;
    if row.layout == Layout::Shift && !xlen.has_rv64() && bit(word, 25) != 0 {
        return None;
    }
    let rounding = if row.layout.has_rounding() {
        Some(RoundingMode::from_bits(bits(word, 14, 12))?)
    } else {
        None
    };

    let mut insn = DecodedInstruction::new(row.mnemonic, 4, xlen, word, row.attributes);
    insn.rounding = rounding;
    let xl = xlen.bits();
    let rd = bits(word, 11, 7);
    let rs1 = bits(word, 19, 15);
    let rs2 = bits(word, 24, 20);
    let rs3 = bits(word, 31, 27);
    let x = DecodedOperand::x;
    let f = DecodedOperand::f;
    let v = DecodedOperand::v;
    let imm = |shape| DecodedOperand::Imm(extract(shape, word));

    match row.layout {
        Layout::Upper => {
            insn.push(x(rd, xl, Write));
            insn.push(imm(ImmShape::U));
        }
        Layout::Jump => {
            insn.push(x(rd, xl, Write));
            insn.push(imm(ImmShape::J));
        }
        Layout::JumpReg | Layout::Load => {
            insn.push(x(rd, xl, Write));
            insn.push(x(rs1, xl, Read));
            insn.push(imm(ImmShape::I));
        }
        Layout::Branch => {
            insn.push(x(rs1, xl, Read));
            insn.push(x(rs2, xl, Read));
            insn.push(imm(ImmShape::B));
        }
        Layout::Store => {
            insn.push(x(rs2, xl, Read));
            insn.push(x(rs1, xl, Read));
            insn.push(imm(ImmShape::S));
        }
        Layout::RegImm(w) => {
            let w = w.bits(xlen);
            insn.push(x(rd, w, Write));
            insn.push(x(rs1, w, Read));
            insn.push(imm(ImmShape::I));
        }
        Layout::Shift => {
            insn.push(x(rd, xl, Write));
            insn.push(x(rs1, xl, Read));
            insn.push(imm(ImmShape::Shamt));
        }
        Layout::ShiftW => {
            insn.push(x(rd, 32, Write));
            insn.push(x(rs1, 32, Read));
            insn.push(imm(ImmShape::ShamtW));
        }
        Layout::Reg(w) => {
            let w = w.bits(xlen);
            insn.push(x(rd, w, Write));
            insn.push(x(rs1, w, Read));
            insn.push(x(rs2, w, Read));
        }
        Layout::Fence => {
            insn.push(DecodedOperand::Imm(i64::from(bits(word, 27, 24))));
            insn.push(DecodedOperand::Imm(i64::from(bits(word, 23, 20))));
        }
        Layout::Bare => {}
        Layout::Csr => {
            insn.push(x(rd, xl, Write));
            insn.push(imm(ImmShape::Csr));
            insn.push(x(rs1, xl, Read));
        }
        Layout::CsrImm => {
            insn.push(x(rd, xl, Write));
            insn.push(imm(ImmShape::Csr));
            insn.push(imm(ImmShape::Uimm5));
        }
        Layout::LoadReserved(w) => {
            insn.ordering = Some(ordering(word));
            insn.push(x(rd, w.bits(xlen), Write));
            insn.push(x(rs1, xl, Read));
        }
        Layout::Amo(w) => {
            let w = w.bits(xlen);
            insn.ordering = Some(ordering(word));
            insn.push(x(rd, w, Write));
            insn.push(x(rs2, w, Read));
            insn.push(x(rs1, xl, Read));
        }
        Layout::StoreConditional(w) => {
            insn.ordering = Some(ordering(word));
            insn.push(x(rd, xl, Write));
            insn.push(x(rs2, w.bits(xlen), Read));
            insn.push(x(rs1, xl, Read));
        }
        Layout::FLoad(w) => {
            insn.push(f(rd, w, Write));
            insn.push(x(rs1, xl, Read));
            insn.push(imm(ImmShape::I));
        }
        Layout::FStore(w) => {
            insn.push(f(rs2, w, Read));
            insn.push(x(rs1, xl, Read));
            insn.push(imm(ImmShape::S));
        }
        Layout::FFused(w) => {
            insn.push(f(rd, w, Write));
            insn.push(f(rs1, w, Read));
            insn.push(f(rs2, w, Read));
            insn.push(f(rs3, w, Read));
        }
        Layout::FArith(w) | Layout::FSelect(w) => {
            insn.push(f(rd, w, Write));
            insn.push(f(rs1, w, Read));
            insn.push(f(rs2, w, Read));
        }
        Layout::FUnary(w) => {
            insn.push(f(rd, w, Write));
            insn.push(f(rs1, w, Read));
        }
        Layout::FCompare(w) => {
            insn.push(x(rd, xl, Write));
            insn.push(f(rs1, w, Read));
            insn.push(f(rs2, w, Read));
        }
        Layout::FToX { x: xw, fp, .. } => {
            insn.push(x(rd, xw.bits(xlen), Write));
            insn.push(f(rs1, fp, Read));
        }
        Layout::XToF { fp, x: xw, .. } => {
            insn.push(f(rd, fp, Write));
            insn.push(x(rs1, xw.bits(xlen), Read));
        }
        Layout::FConvert { to, from } => {
            insn.push(f(rd, to, Write));
            insn.push(f(rs1, from, Read));
        }
        Layout::Vsetvli => {
            insn.push(x(rd, xl, Write));
            insn.push(x(rs1, xl, Read));
            insn.push(imm(ImmShape::Zimm11));
        }
        Layout::Vsetivli => {
            insn.push(x(rd, xl, Write));
            insn.push(imm(ImmShape::Uimm5));
            insn.push(imm(ImmShape::Zimm10));
        }
        Layout::Vsetvl => {
            insn.push(x(rd, xl, Write));
            insn.push(x(rs1, xl, Read));
            insn.push(x(rs2, xl, Read));
        }
        Layout::VLoad => {
            insn.mask = Some(vm(word));
            insn.push(v(rd, Write));
            insn.push(x(rs1, xl, Read));
        }
        Layout::VStore => {
            insn.mask = Some(vm(word));
            insn.push(v(rd, Read));
            insn.push(x(rs1, xl, Read));
        }
        Layout::VecVec => {
            insn.mask = Some(vm(word));
            insn.push(v(rd, Write));
            insn.push(v(rs2, Read));
            insn.push(v(rs1, Read));
        }
        Layout::VecScalar => {
            insn.mask = Some(vm(word));
            insn.push(v(rd, Write));
            insn.push(v(rs2, Read));
            insn.push(x(rs1, xl, Read));
        }
        Layout::VecImm => {
            insn.mask = Some(vm(word));
            insn.push(v(rd, Write));
            insn.push(v(rs2, Read));
            insn.push(imm(ImmShape::Simm5));
        }
    }
    Some(insn)
}

const fn ordering(word: u32) -> AtomicOrdering {
    AtomicOrdering::from_bits(bit(word, 26) != 0, bit(word, 25) != 0)
}

const fn vm(word: u32) -> VectorMask {
    VectorMask::from_vm_bit(bit(word, 25))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(word: u32, xlen: Xlen) -> DecodedInstruction {
        decode(word, xlen).unwrap()
    }

    #[test]
    fn rows_are_disjoint() {
        for (i, a) in ROWS.iter().enumerate() {
            assert_eq!(a.value & !a.mask, 0, "{}", a.mnemonic);
            for b in &ROWS[i + 1..] {
                let overlap = (a.value ^ b.value) & a.mask & b.mask == 0;
                assert!(!overlap, "{} overlaps {}", a.mnemonic, b.mnemonic);
            }
        }
    }

    #[test]
    fn jalr_and_loads_share_operand_shape() {
        // jalr ra, 16(a0) / ld ra, 16(a0)
        let j = dec(0x0105_00E7, Xlen::Rv64);
        let l = dec(0x0105_3083, Xlen::Rv64);
        assert_eq!(j.mnemonic, Mnemonic::Jalr);
        assert_eq!(l.mnemonic, Mnemonic::Ld);
        assert_eq!(j.operands(), l.operands());
        assert_eq!(j.operand(2), Some(&DecodedOperand::Imm(16)));
    }

    #[test]
    fn no_compressed_rows() {
        assert!(ROWS.iter().all(|r| !r.mnemonic.is_compressed()));
        assert!(ROWS.iter().all(|r| r.value & 0b11 == 0b11));
    }

    #[test]
    fn immediates() {
        // addi a0, a1, -1
        let i = dec(0xFFF5_8513, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::Addi);
        assert_eq!(i.operand(2), Some(&DecodedOperand::Imm(-1)));
        // sd ra, 8(sp)
        let i = dec(0x0011_3423, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::Sd);
        assert_eq!(
            i.operands(),
            &[
                DecodedOperand::x(1, 64, Read),
                DecodedOperand::x(2, 64, Read),
                DecodedOperand::Imm(8),
            ]
        );
        assert!(i.attributes.contains(Attributes::STORE));
        // beq x0, x0, -4
        let i = dec(0xFE00_0EE3, Xlen::Rv32);
        assert_eq!(i.mnemonic, Mnemonic::Beq);
        assert_eq!(i.operand(2), Some(&DecodedOperand::Imm(-4)));
        assert!(i.attributes.contains(Attributes::BRANCH));
    }

    #[test]
    fn word_ops_report_32_bits() {
        // addw a0, a1, a2
        let i = dec(0x00C5_853B, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::Addw);
        assert!(i.operands().iter().all(|o| o.width() == Some(32)));
        // add on RV64 is 64 bits wide
        let i = dec(0x00C5_8533, Xlen::Rv64);
        assert!(i.operands().iter().all(|o| o.width() == Some(64)));
    }

    #[test]
    fn rv64_only_rows_hidden_on_rv32() {
        assert!(decode(0x00C5_853B, Xlen::Rv32).is_none());
        assert!(decode(0x0011_3423, Xlen::Rv32).is_none());
    }

    #[test]
    fn rv32_shift_amount_limit() {
        // slli a0, a0, 32
        let w = 0x0205_1513;
        assert!(decode(w, Xlen::Rv32).is_none());
        assert_eq!(dec(w, Xlen::Rv64).operand(2), Some(&DecodedOperand::Imm(32)));
        // srai a0, a0, 3
        let i = dec(0x4035_5513, Xlen::Rv32);
        assert_eq!(i.mnemonic, Mnemonic::Srai);
        assert_eq!(i.operand(2), Some(&DecodedOperand::Imm(3)));
    }

    #[test]
    fn atomic_ordering() {
        let i = dec(0x1605_B52F, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::LrD);
        assert_eq!(i.ordering, Some(AtomicOrdering::AcqRel));
        assert_eq!(i.operands().len(), 2);
        let i = dec(0x00C5_A52F | 1 << 26, Xlen::Rv32);
        assert_eq!(i.mnemonic, Mnemonic::AmoaddW);
        assert_eq!(i.ordering, Some(AtomicOrdering::Acquire));
        assert!(i.attributes.contains(Attributes::ATOMIC));
    }

    #[test]
    fn rounding_field() {
        // fadd.s fa0, fa1, fa2, dyn
        let i = dec(0x00C5_F553, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::FaddS);
        assert_eq!(i.rounding, Some(RoundingMode::Dyn));
        assert!(i.attributes.contains(Attributes::FLOAT));
        // reserved rm = 5
        assert!(decode(0x00C5_D553, Xlen::Rv64).is_none());
        // fsgnj has no rm field
        let i = dec(0x20C5_8553, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::FsgnjS);
        assert_eq!(i.rounding, None);
        // fcvt.w.s a0, fa0, rtz
        let i = dec(0xC005_1553, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::FcvtWS);
        assert_eq!(i.rounding, Some(RoundingMode::Rtz));
        assert_eq!(i.operand(0).and_then(DecodedOperand::width), Some(32));
    }

    #[test]
    fn vector_rows() {
        let i = dec(0x0221_80D7, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::VaddVv);
        assert_eq!(i.mask, Some(VectorMask::Unmasked));
        assert_eq!(i.operand(0).and_then(DecodedOperand::width), Some(128));
        let i = dec(0x022F_B0D7, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::VaddVi);
        assert_eq!(i.operand(2), Some(&DecodedOperand::Imm(-1)));
        let i = dec(0x0D05_72D7, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::Vsetvli);
        assert_eq!(i.operand(2), Some(&DecodedOperand::Imm(0xD0)));
        assert_eq!(dec(0xCD02_72D7, Xlen::Rv64).mnemonic, Mnemonic::Vsetivli);
        assert_eq!(dec(0x80B5_72D7, Xlen::Rv64).mnemonic, Mnemonic::Vsetvl);
        let i = dec(0x0205_6087, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::Vle32V);
        assert!(i.attributes.contains(Attributes::LOAD | Attributes::VECTOR));
    }

    #[test]
    fn system_rows() {
        assert_eq!(dec(0x0000_0073, Xlen::Rv32).mnemonic, Mnemonic::Ecall);
        assert_eq!(dec(0x0010_0073, Xlen::Rv32).mnemonic, Mnemonic::Ebreak);
        assert!(decode(0x0020_0073, Xlen::Rv32).is_none());
        // fence rw, rw
        let i = dec(0x0330_000F, Xlen::Rv32);
        assert_eq!(i.mnemonic, Mnemonic::Fence);
        assert_eq!(i.operands(), &[DecodedOperand::Imm(3), DecodedOperand::Imm(3)]);
        // csrrs a0, fflags, x0
        let i = dec(0x0010_2573, Xlen::Rv64);
        assert_eq!(i.mnemonic, Mnemonic::Csrrs);
        assert_eq!(i.operand(1), Some(&DecodedOperand::Imm(1)));
        assert!(i.attributes.contains(Attributes::SYSTEM));
    }
}
