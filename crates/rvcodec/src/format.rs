//! Bit-field codec primitives.
//!
//! ## Instruction Formats
//!
//! ```text
//! R-type:  [funct7 | rs2 | rs1 | funct3 | rd  | opcode]
//! R4-type: [rs3 | fmt | rs2 | rs1 | rm  | rd  | opcode]
//! I-type:  [  imm[11:0]  | rs1 | funct3 | rd  | opcode]
//! S-type:  [imm[11:5]|rs2| rs1 | funct3 |imm[4:0]|opcode]
//! B-type:  [imm[12|10:5]|rs2|rs1|funct3|imm[4:1|11]|opcode]
//! U-type:  [      imm[31:12]             | rd  | opcode]
//! J-type:  [imm[20|10:1|11|19:12]        | rd  | opcode]
//! ```
//!
//! ## Compressed Formats (16-bit)
//!
//! ```text
//! CR:  [funct4 | rd/rs1 | rs2 | op]
//! CI:  [funct3 | imm | rd/rs1 | imm | op]
//! CSS: [funct3 | imm | rs2 | op]
//! CIW: [funct3 | imm | rd' | op]
//! CL:  [funct3 | imm | rs1' | imm | rd' | op]
//! CS:  [funct3 | imm | rs1' | imm | rs2'| op]
//! CA:  [funct6 | rd'/rs1' | funct2 | rs2' | op]
//! CB:  [funct3 | offset | rs1' | offset | op]
//! CJ:  [funct3 | jump target | op]
//! ```
//!
//! Every immediate layout is an [`ImmShape`]. [`pack`] scatters a value into
//! the shape's bit positions and [`extract`] gathers it back; for every
//! value accepted by [`ImmShape::fits`] the two are exact inverses.
//! `pack` masks to the shape's width and never validates, range checks
//! belong to the caller.

// ── Opcodes ─────────────────────────────────────────────────────────────

pub(crate) const OP_LUI: u32 = 0b011_0111;
pub(crate) const OP_AUIPC: u32 = 0b001_0111;
pub(crate) const OP_JAL: u32 = 0b110_1111;
pub(crate) const OP_JALR: u32 = 0b110_0111;
pub(crate) const OP_BRANCH: u32 = 0b110_0011;
pub(crate) const OP_LOAD: u32 = 0b000_0011;
pub(crate) const OP_STORE: u32 = 0b010_0011;
pub(crate) const OP_IMM: u32 = 0b001_0011;
pub(crate) const OP_REG: u32 = 0b011_0011;
pub(crate) const OP_IMM_W: u32 = 0b001_1011; // RV64I W-suffix immediate ops
pub(crate) const OP_REG_W: u32 = 0b011_1011; // RV64I W-suffix register ops
pub(crate) const OP_SYSTEM: u32 = 0b111_0011;
pub(crate) const OP_FENCE: u32 = 0b000_1111;
pub(crate) const OP_AMO: u32 = 0b010_1111;

// ── F/D extension opcodes ───────────────────────────────────────────────

pub(crate) const OP_LOAD_FP: u32 = 0b000_0111; // also vector loads
pub(crate) const OP_STORE_FP: u32 = 0b010_0111; // also vector stores
pub(crate) const OP_MADD: u32 = 0b100_0011;
pub(crate) const OP_MSUB: u32 = 0b100_0111;
pub(crate) const OP_NMSUB: u32 = 0b100_1011;
pub(crate) const OP_NMADD: u32 = 0b100_1111;
pub(crate) const OP_FP: u32 = 0b101_0011;

// ── V-extension opcode ──────────────────────────────────────────────────

pub(crate) const OP_V: u32 = 0b101_0111;

// ── C-extension quadrants (bits [1:0]) ──────────────────────────────────

pub(crate) const C_OP_Q0: u16 = 0b00;
pub(crate) const C_OP_Q1: u16 = 0b01;
pub(crate) const C_OP_Q2: u16 = 0b10;

// ── Field helpers ───────────────────────────────────────────────────────

/// Extract bits `[hi:lo]` of `word`.
#[inline]
pub(crate) const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & ((1u32 << (hi - lo + 1)) - 1)
}

/// Extract bit `n` of `word`.
#[inline]
pub(crate) const fn bit(word: u32, n: u32) -> u32 {
    (word >> n) & 1
}

/// Sign-extend the low `width` bits of `value`.
#[inline]
pub const fn sign_extend(value: u32, width: u32) -> i64 {
    let shift = 64 - width;
    (((value as u64) << shift) as i64) >> shift
}

/// Whether a half-word starts a 32-bit instruction (low bits `0b11`).
#[inline]
pub const fn is_full_width(first_halfword: u16) -> bool {
    first_halfword & 0b11 == 0b11
}

// ── Immediate shapes ────────────────────────────────────────────────────

/// Immediate bit layout of one instruction format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImmShape {
    /// I-type: signed imm[11:0] in bits 31:20.
    I,
    /// S-type: signed imm[11:5] in 31:25, imm[4:0] in 11:7.
    S,
    /// B-type: signed 13-bit offset, imm[12|10:5] in 31:25, imm[4:1|11] in 11:7.
    B,
    /// U-type: unsigned 20-bit upper immediate in bits 31:12.
    U,
    /// J-type: signed 21-bit offset, imm[20|10:1|11|19:12] in 31:12.
    J,
    /// Shift amount, unsigned 6 bits in 25:20.
    Shamt,
    /// Word shift amount, unsigned 5 bits in 24:20.
    ShamtW,
    /// CSR number, unsigned 12 bits in 31:20.
    Csr,
    /// Unsigned 5 bits in the rs1 field (19:15): CSR `zimm`, `vsetivli` AVL.
    Uimm5,
    /// Signed 5 bits in the rs1 field (19:15): vector `.vi` operand.
    Simm5,
    /// `vsetvli` vtype, unsigned 11 bits in 30:20.
    Zimm11,
    /// `vsetivli` vtype, unsigned 10 bits in 29:20.
    Zimm10,
    /// CI: signed imm[5] in bit 12, imm[4:0] in 6:2.
    Ci,
    /// CI shift amount: unsigned shamt[5] in bit 12, shamt[4:0] in 6:2.
    CiShamt,
    /// `c.lui`: signed nzimm[17] in bit 12, nzimm[16:12] in 6:2.
    CiLui,
    /// `c.addi16sp`: signed nzimm[9|4|6|8:7|5], multiple of 16.
    CiAddi16sp,
    /// `c.lwsp`/`c.flwsp`: unsigned uimm[5] in 12, uimm[4:2|7:6] in 6:2.
    CiLwsp,
    /// `c.ldsp`/`c.fldsp`: unsigned uimm[5] in 12, uimm[4:3|8:6] in 6:2.
    CiLdsp,
    /// `c.swsp`/`c.fswsp`: unsigned uimm[5:2|7:6] in 12:7.
    CssSwsp,
    /// `c.sdsp`/`c.fsdsp`: unsigned uimm[5:3|8:6] in 12:7.
    CssSdsp,
    /// `c.addi4spn`: unsigned nzuimm[5:4|9:6|2|3] in 12:5.
    Ciw,
    /// CL/CS word access: unsigned uimm[5:3] in 12:10, uimm[2|6] in 6:5.
    ClW,
    /// CL/CS double access: unsigned uimm[5:3] in 12:10, uimm[7:6] in 6:5.
    ClD,
    /// CB branch: signed offset[8|4:3] in 12:10, offset[7:6|2:1|5] in 6:2.
    Cb,
    /// CJ jump: signed offset[11|4|9:8|10|6|7|3:1|5] in 12:2.
    Cj,
}

impl ImmShape {
    /// Whether this shape belongs to a 16-bit encoding.
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            ImmShape::Ci
                | ImmShape::CiShamt
                | ImmShape::CiLui
                | ImmShape::CiAddi16sp
                | ImmShape::CiLwsp
                | ImmShape::CiLdsp
                | ImmShape::CssSwsp
                | ImmShape::CssSdsp
                | ImmShape::Ciw
                | ImmShape::ClW
                | ImmShape::ClD
                | ImmShape::Cb
                | ImmShape::Cj
        )
    }

    /// Whether extraction sign-extends.
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ImmShape::I
                | ImmShape::S
                | ImmShape::B
                | ImmShape::J
                | ImmShape::Simm5
                | ImmShape::Ci
                | ImmShape::CiLui
                | ImmShape::CiAddi16sp
                | ImmShape::Cb
                | ImmShape::Cj
        )
    }

    /// Width of the logical value in bits (including implicit low zeros).
    pub const fn width(self) -> u32 {
        match self {
            ImmShape::I | ImmShape::S | ImmShape::Csr => 12,
            ImmShape::B => 13,
            ImmShape::U => 20,
            ImmShape::J => 21,
            ImmShape::Shamt | ImmShape::Ci | ImmShape::CiShamt => 6,
            ImmShape::ShamtW | ImmShape::Uimm5 | ImmShape::Simm5 => 5,
            ImmShape::Zimm11 => 11,
            ImmShape::Zimm10 | ImmShape::CiAddi16sp | ImmShape::Ciw => 10,
            ImmShape::CiLwsp | ImmShape::CssSwsp | ImmShape::ClD => 8,
            ImmShape::CiLdsp | ImmShape::CssSdsp | ImmShape::Cb => 9,
            ImmShape::ClW => 7,
            ImmShape::Cj => 12,
            ImmShape::CiLui => 18,
        }
    }

    /// Required alignment of the value (its implicit low zero bits).
    pub const fn align(self) -> i64 {
        match self {
            ImmShape::B | ImmShape::J | ImmShape::Cb | ImmShape::Cj => 2,
            ImmShape::CiLwsp | ImmShape::CssSwsp | ImmShape::Ciw | ImmShape::ClW => 4,
            ImmShape::CiLdsp | ImmShape::CssSdsp | ImmShape::ClD => 8,
            ImmShape::CiAddi16sp => 16,
            ImmShape::CiLui => 4096,
            _ => 1,
        }
    }

    /// Inclusive `(min, max)` range of representable values.
    pub const fn range(self) -> (i64, i64) {
        let w = self.width();
        let a = self.align();
        if self.is_signed() {
            (-(1i64 << (w - 1)), (1i64 << (w - 1)) - a)
        } else {
            (0, (1i64 << w) - a)
        }
    }

    /// Whether `value` is representable: in range and suitably aligned.
    pub const fn fits(self, value: i64) -> bool {
        let (min, max) = self.range();
        value >= min && value <= max && value % self.align() == 0
    }

    /// Bits of the instruction word occupied by this immediate.
    pub const fn mask(self) -> u32 {
        match self {
            ImmShape::I | ImmShape::Csr => 0xFFF0_0000,
            ImmShape::S | ImmShape::B => 0xFE00_0F80,
            ImmShape::U | ImmShape::J => 0xFFFF_F000,
            ImmShape::Shamt => 0x03F0_0000,
            ImmShape::ShamtW => 0x01F0_0000,
            ImmShape::Uimm5 | ImmShape::Simm5 => 0x000F_8000,
            ImmShape::Zimm11 => 0x7FF0_0000,
            ImmShape::Zimm10 => 0x3FF0_0000,
            ImmShape::Ci
            | ImmShape::CiShamt
            | ImmShape::CiLui
            | ImmShape::CiAddi16sp
            | ImmShape::CiLwsp
            | ImmShape::CiLdsp => 0x107C,
            ImmShape::CssSwsp | ImmShape::CssSdsp => 0x1F80,
            ImmShape::Ciw => 0x1FE0,
            ImmShape::ClW | ImmShape::ClD => 0x1C60,
            ImmShape::Cb => 0x1C7C,
            ImmShape::Cj => 0x1FFC,
        }
    }
}

/// Scatter `imm` into the bit positions of `shape`.
///
/// The value is masked to the shape's width first; bits below the shape's
/// alignment are dropped.
pub const fn pack(shape: ImmShape, imm: i64) -> u32 {
    let w = shape.width();
    let v = ((imm as u64) & ((1u64 << w) - 1)) as u32;
    match shape {
        ImmShape::I | ImmShape::Csr => v << 20,
        ImmShape::S => (bits(v, 11, 5) << 25) | (bits(v, 4, 0) << 7),
        ImmShape::B => {
            (bit(v, 12) << 31) | (bits(v, 10, 5) << 25) | (bits(v, 4, 1) << 8) | (bit(v, 11) << 7)
        }
        ImmShape::U => v << 12,
        ImmShape::J => {
            (bit(v, 20) << 31)
                | (bits(v, 10, 1) << 21)
                | (bit(v, 11) << 20)
                | (bits(v, 19, 12) << 12)
        }
        ImmShape::Shamt | ImmShape::ShamtW | ImmShape::Zimm11 | ImmShape::Zimm10 => v << 20,
        ImmShape::Uimm5 | ImmShape::Simm5 => v << 15,
        ImmShape::Ci | ImmShape::CiShamt => (bit(v, 5) << 12) | (bits(v, 4, 0) << 2),
        ImmShape::CiLui => (bit(v, 17) << 12) | (bits(v, 16, 12) << 2),
        ImmShape::CiAddi16sp => {
            (bit(v, 9) << 12)
                | (bit(v, 4) << 6)
                | (bit(v, 6) << 5)
                | (bits(v, 8, 7) << 3)
                | (bit(v, 5) << 2)
        }
        ImmShape::CiLwsp => (bit(v, 5) << 12) | (bits(v, 4, 2) << 4) | (bits(v, 7, 6) << 2),
        ImmShape::CiLdsp => (bit(v, 5) << 12) | (bits(v, 4, 3) << 5) | (bits(v, 8, 6) << 2),
        ImmShape::CssSwsp => (bits(v, 5, 2) << 9) | (bits(v, 7, 6) << 7),
        ImmShape::CssSdsp => (bits(v, 5, 3) << 10) | (bits(v, 8, 6) << 7),
        ImmShape::Ciw => {
            (bits(v, 5, 4) << 11) | (bits(v, 9, 6) << 7) | (bit(v, 2) << 6) | (bit(v, 3) << 5)
        }
        ImmShape::ClW => (bits(v, 5, 3) << 10) | (bit(v, 2) << 6) | (bit(v, 6) << 5),
        ImmShape::ClD => (bits(v, 5, 3) << 10) | (bits(v, 7, 6) << 5),
        ImmShape::Cb => {
            (bit(v, 8) << 12)
                | (bits(v, 4, 3) << 10)
                | (bits(v, 7, 6) << 5)
                | (bits(v, 2, 1) << 3)
                | (bit(v, 5) << 2)
        }
        ImmShape::Cj => {
            (bit(v, 11) << 12)
                | (bit(v, 4) << 11)
                | (bits(v, 9, 8) << 9)
                | (bit(v, 10) << 8)
                | (bit(v, 6) << 7)
                | (bit(v, 7) << 6)
                | (bits(v, 3, 1) << 3)
                | (bit(v, 5) << 2)
        }
    }
}

/// Gather the immediate of `shape` out of `word`.
///
/// Signed shapes are sign-extended; unsigned shapes are zero-extended.
pub const fn extract(shape: ImmShape, word: u32) -> i64 {
    let raw = match shape {
        ImmShape::I | ImmShape::Csr => bits(word, 31, 20),
        ImmShape::S => (bits(word, 31, 25) << 5) | bits(word, 11, 7),
        ImmShape::B => {
            (bit(word, 31) << 12)
                | (bit(word, 7) << 11)
                | (bits(word, 30, 25) << 5)
                | (bits(word, 11, 8) << 1)
        }
        ImmShape::U => bits(word, 31, 12),
        ImmShape::J => {
            (bit(word, 31) << 20)
                | (bits(word, 19, 12) << 12)
                | (bit(word, 20) << 11)
                | (bits(word, 30, 21) << 1)
        }
        ImmShape::Shamt => bits(word, 25, 20),
        ImmShape::ShamtW => bits(word, 24, 20),
        ImmShape::Zimm11 => bits(word, 30, 20),
        ImmShape::Zimm10 => bits(word, 29, 20),
        ImmShape::Uimm5 | ImmShape::Simm5 => bits(word, 19, 15),
        ImmShape::Ci | ImmShape::CiShamt => (bit(word, 12) << 5) | bits(word, 6, 2),
        ImmShape::CiLui => (bit(word, 12) << 17) | (bits(word, 6, 2) << 12),
        ImmShape::CiAddi16sp => {
            (bit(word, 12) << 9)
                | (bits(word, 4, 3) << 7)
                | (bit(word, 5) << 6)
                | (bit(word, 2) << 5)
                | (bit(word, 6) << 4)
        }
        ImmShape::CiLwsp => (bits(word, 3, 2) << 6) | (bit(word, 12) << 5) | (bits(word, 6, 4) << 2),
        ImmShape::CiLdsp => (bits(word, 4, 2) << 6) | (bit(word, 12) << 5) | (bits(word, 6, 5) << 3),
        ImmShape::CssSwsp => (bits(word, 8, 7) << 6) | (bits(word, 12, 9) << 2),
        ImmShape::CssSdsp => (bits(word, 9, 7) << 6) | (bits(word, 12, 10) << 3),
        ImmShape::Ciw => {
            (bits(word, 10, 7) << 6)
                | (bits(word, 12, 11) << 4)
                | (bit(word, 5) << 3)
                | (bit(word, 6) << 2)
        }
        ImmShape::ClW => (bit(word, 5) << 6) | (bits(word, 12, 10) << 3) | (bit(word, 6) << 2),
        ImmShape::ClD => (bits(word, 6, 5) << 6) | (bits(word, 12, 10) << 3),
        ImmShape::Cb => {
            (bit(word, 12) << 8)
                | (bits(word, 6, 5) << 6)
                | (bit(word, 2) << 5)
                | (bits(word, 11, 10) << 3)
                | (bits(word, 4, 3) << 1)
        }
        ImmShape::Cj => {
            (bit(word, 12) << 11)
                | (bit(word, 8) << 10)
                | (bits(word, 10, 9) << 8)
                | (bit(word, 6) << 7)
                | (bit(word, 7) << 6)
                | (bit(word, 2) << 5)
                | (bit(word, 11) << 4)
                | (bits(word, 5, 3) << 1)
        }
    };
    if shape.is_signed() {
        sign_extend(raw, shape.width())
    } else {
        raw as i64
    }
}

// ── 32-bit word builders ────────────────────────────────────────────────

/// Encode an R-type instruction.
#[inline]
pub(crate) const fn r_type(opcode: u32, rd: u32, funct3: u32, rs1: u32, rs2: u32, funct7: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

/// Encode an R4-type (fused multiply-add) instruction.
///
/// Format: `[rs3 | fmt | rs2 | rs1 | rm | rd | opcode]`
#[inline]
pub(crate) const fn r4_type(opcode: u32, rd: u32, rm: u32, rs1: u32, rs2: u32, fmt: u32, rs3: u32) -> u32 {
    (rs3 << 27) | (fmt << 25) | (rs2 << 20) | (rs1 << 15) | (rm << 12) | (rd << 7) | opcode
}

/// Encode an I-type instruction.
#[inline]
pub(crate) const fn i_type(opcode: u32, rd: u32, funct3: u32, rs1: u32, imm: i64) -> u32 {
    pack(ImmShape::I, imm) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

/// Encode an S-type instruction.
#[inline]
pub(crate) const fn s_type(opcode: u32, funct3: u32, rs1: u32, rs2: u32, imm: i64) -> u32 {
    pack(ImmShape::S, imm) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | opcode
}

/// Encode a B-type instruction.
#[inline]
pub(crate) const fn b_type(funct3: u32, rs1: u32, rs2: u32, imm: i64) -> u32 {
    pack(ImmShape::B, imm) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | OP_BRANCH
}

/// Encode a U-type instruction from the raw 20-bit upper immediate.
#[inline]
pub(crate) const fn u_type(opcode: u32, rd: u32, imm20: i64) -> u32 {
    pack(ImmShape::U, imm20) | (rd << 7) | opcode
}

/// Encode a J-type instruction.
#[inline]
pub(crate) const fn j_type(rd: u32, imm: i64) -> u32 {
    pack(ImmShape::J, imm) | (rd << 7) | OP_JAL
}

/// Encode an AMO (atomic memory operation) instruction.
///
/// Format: `[funct5 | aq | rl | rs2 | rs1 | funct3 | rd | opcode]`
#[inline]
pub(crate) const fn amo_type(funct5: u32, aq: bool, rl: bool, rs2: u32, rs1: u32, funct3: u32, rd: u32) -> u32 {
    (funct5 << 27)
        | ((aq as u32) << 26)
        | ((rl as u32) << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (funct3 << 12)
        | (rd << 7)
        | OP_AMO
}

// ── 16-bit word builders ────────────────────────────────────────────────

/// Encode a CR-type compressed instruction.
///   `[funct4(4) | rd/rs1(5) | rs2(5) | op(2)]`
#[inline]
pub(crate) const fn cr_type(funct4: u16, rd_rs1: u16, rs2: u16, op: u16) -> u16 {
    (funct4 << 12) | (rd_rs1 << 7) | (rs2 << 2) | op
}

/// Encode a CI-type compressed instruction with an already-packed immediate.
///   `[funct3(3) | imm(1) | rd/rs1(5) | imm(5) | op(2)]`
#[inline]
pub(crate) const fn ci_type(funct3: u16, rd_rs1: u16, packed_imm: u32, op: u16) -> u16 {
    (funct3 << 13) | (rd_rs1 << 7) | packed_imm as u16 | op
}

/// Encode a CSS-type compressed instruction (stack-relative store).
///   `[funct3(3) | imm(6) | rs2(5) | op(2)]`
#[inline]
pub(crate) const fn css_type(funct3: u16, packed_imm: u32, rs2: u16, op: u16) -> u16 {
    (funct3 << 13) | packed_imm as u16 | (rs2 << 2) | op
}

/// Encode a CIW-type compressed instruction (wide immediate).
///   `[funct3(3) | imm(8) | rd'(3) | op(2)]`
#[inline]
pub(crate) const fn ciw_type(funct3: u16, packed_imm: u32, rd_p: u16, op: u16) -> u16 {
    (funct3 << 13) | packed_imm as u16 | ((rd_p & 7) << 2) | op
}

/// Encode a CL- or CS-type compressed instruction (load/store base+offset).
///   `[funct3(3) | imm(3) | rs1'(3) | imm(2) | rd'/rs2'(3) | op(2)]`
#[inline]
pub(crate) const fn cls_type(funct3: u16, rs1_p: u16, packed_imm: u32, r_p: u16, op: u16) -> u16 {
    (funct3 << 13) | packed_imm as u16 | ((rs1_p & 7) << 7) | ((r_p & 7) << 2) | op
}

/// Encode a CA-type compressed instruction (register arithmetic).
///   `[funct6(6) | rd'/rs1'(3) | funct2(2) | rs2'(3) | op(2)]`
#[inline]
pub(crate) const fn ca_type(funct6: u16, rd_rs1_p: u16, funct2: u16, rs2_p: u16, op: u16) -> u16 {
    (funct6 << 10) | ((rd_rs1_p & 7) << 7) | ((funct2 & 3) << 5) | ((rs2_p & 7) << 2) | op
}

/// Encode a CB-type compressed branch.
#[inline]
pub(crate) const fn cb_type(funct3: u16, rs1_p: u16, offset: i64) -> u16 {
    (funct3 << 13) | pack(ImmShape::Cb, offset) as u16 | ((rs1_p & 7) << 7) | C_OP_Q1
}

/// Encode a CB-type immediate ALU op (`c.srli`/`c.srai`/`c.andi`).
///   `[100 | imm[5] | funct2 | rd' | imm[4:0] | 01]`
#[inline]
pub(crate) const fn cb_alu(funct2: u16, rd_p: u16, packed_imm: u32) -> u16 {
    (0b100 << 13) | packed_imm as u16 | ((funct2 & 3) << 10) | ((rd_p & 7) << 7) | C_OP_Q1
}

/// Encode a CJ-type compressed jump.
#[inline]
pub(crate) const fn cj_type(funct3: u16, offset: i64) -> u16 {
    (funct3 << 13) | pack(ImmShape::Cj, offset) as u16 | C_OP_Q1
}
