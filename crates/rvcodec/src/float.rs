//! F and D extensions.
//!
//! Operations that round take an explicit [`RoundingMode`];
//! [`RoundingMode::Dyn`] defers to the `frm` CSR.

use crate::assembler::{check_imm, AuipcTarget, Assembler};
use crate::error::EncodeError;
use crate::format::{
    i_type, r4_type, r_type, s_type, ImmShape, OP_FP, OP_LOAD_FP, OP_MADD, OP_MSUB, OP_NMADD,
    OP_NMSUB, OP_STORE_FP,
};
use crate::ir::{Fpr, Gpr, RoundingMode};
use crate::label::Literal;
use crate::mnemonic::Mnemonic;

const FMT_S: u32 = 0b00;
const FMT_D: u32 = 0b01;

impl Assembler {
    fn fp_op(
        &mut self,
        m: Mnemonic,
        funct7: u32,
        funct3: u32,
        rd: u32,
        rs1: u32,
        rs2: u32,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        self.emit_word(r_type(OP_FP, rd, funct3, rs1, rs2, funct7))
    }

    fn fp_fused(
        &mut self,
        m: Mnemonic,
        opcode: u32,
        fmt: u32,
        rd: Fpr,
        rs1: Fpr,
        rs2: Fpr,
        rs3: Fpr,
        rm: RoundingMode,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        self.emit_word(r4_type(opcode, rd.num(), rm.bits(), rs1.num(), rs2.num(), fmt, rs3.num()))
    }

    fn fp_load(&mut self, m: Mnemonic, funct3: u32, rd: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.require(m)?;
        check_imm(m, ImmShape::I, i64::from(offset))?;
        self.emit_word(i_type(OP_LOAD_FP, rd.num(), funct3, base.num(), i64::from(offset)))
    }

    fn fp_store(&mut self, m: Mnemonic, funct3: u32, rs2: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.require(m)?;
        check_imm(m, ImmShape::S, i64::from(offset))?;
        self.emit_word(s_type(OP_STORE_FP, funct3, base.num(), rs2.num(), i64::from(offset)))
    }

    // ── Loads and stores ─────────────────────────────────────

    /// `flw rd, offset(base)`.
    pub fn flw(&mut self, rd: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.fp_load(Mnemonic::Flw, 0b010, rd, base, offset)
    }

    /// `fld rd, offset(base)`.
    pub fn fld(&mut self, rd: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.fp_load(Mnemonic::Fld, 0b011, rd, base, offset)
    }

    /// `fsw rs2, offset(base)`.
    pub fn fsw(&mut self, rs2: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.fp_store(Mnemonic::Fsw, 0b010, rs2, base, offset)
    }

    /// `fsd rs2, offset(base)`.
    pub fn fsd(&mut self, rs2: Fpr, base: Gpr, offset: i32) -> Result<(), EncodeError> {
        self.fp_store(Mnemonic::Fsd, 0b011, rs2, base, offset)
    }

    /// `auipc tmp, hi; fld rd, lo(tmp)` loading an 8-byte literal.
    pub fn load_literal_fp(&mut self, rd: Fpr, literal: Literal, tmp: Gpr) -> Result<(), EncodeError> {
        self.require(Mnemonic::Fld)?;
        self.emit_auipc_pair(AuipcTarget::Literal(literal), tmp, |lo| {
            i_type(OP_LOAD_FP, rd.num(), 0b011, tmp.num(), lo)
        })
    }

    // ── Moves between register files ─────────────────────────

    /// `fmv.x.w rd, rs1`.
    pub fn fmv_x_w(&mut self, rd: Gpr, rs1: Fpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FmvXW, 0b111_0000, 0b000, rd.num(), rs1.num(), 0)
    }

    /// `fmv.w.x rd, rs1`.
    pub fn fmv_w_x(&mut self, rd: Fpr, rs1: Gpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FmvWX, 0b111_1000, 0b000, rd.num(), rs1.num(), 0)
    }

    /// `fmv.x.d rd, rs1` (RV64).
    pub fn fmv_x_d(&mut self, rd: Gpr, rs1: Fpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FmvXD, 0b111_0001, 0b000, rd.num(), rs1.num(), 0)
    }

    /// `fmv.d.x rd, rs1` (RV64).
    pub fn fmv_d_x(&mut self, rd: Fpr, rs1: Gpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FmvDX, 0b111_1001, 0b000, rd.num(), rs1.num(), 0)
    }

    /// `fcvt.s.d rd, rs1, rm`.
    pub fn fcvt_s_d(&mut self, rd: Fpr, rs1: Fpr, rm: RoundingMode) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FcvtSD, 0b010_0000, rm.bits(), rd.num(), rs1.num(), 1)
    }

    /// `fcvt.d.s rd, rs1`. Widening is exact; the rounding field is zero.
    pub fn fcvt_d_s(&mut self, rd: Fpr, rs1: Fpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FcvtDS, 0b010_0001, 0, rd.num(), rs1.num(), 0)
    }

    // ── Pseudo-instructions ──────────────────────────────────

    /// `fmv.s rd, rs` (`fsgnj.s rd, rs, rs`).
    pub fn fmv_s(&mut self, rd: Fpr, rs: Fpr) -> Result<(), EncodeError> {
        self.fsgnj_s(rd, rs, rs)
    }

    /// `fabs.s rd, rs` (`fsgnjx.s rd, rs, rs`).
    pub fn fabs_s(&mut self, rd: Fpr, rs: Fpr) -> Result<(), EncodeError> {
        self.fsgnjx_s(rd, rs, rs)
    }

    /// `fneg.s rd, rs` (`fsgnjn.s rd, rs, rs`).
    pub fn fneg_s(&mut self, rd: Fpr, rs: Fpr) -> Result<(), EncodeError> {
        self.fsgnjn_s(rd, rs, rs)
    }

    /// `fmv.d rd, rs` (`fsgnj.d rd, rs, rs`).
    pub fn fmv_d(&mut self, rd: Fpr, rs: Fpr) -> Result<(), EncodeError> {
        self.fsgnj_d(rd, rs, rs)
    }

    /// `fabs.d rd, rs` (`fsgnjx.d rd, rs, rs`).
    pub fn fabs_d(&mut self, rd: Fpr, rs: Fpr) -> Result<(), EncodeError> {
        self.fsgnjx_d(rd, rs, rs)
    }

    /// `fneg.d rd, rs` (`fsgnjn.d rd, rs, rs`).
    pub fn fneg_d(&mut self, rd: Fpr, rs: Fpr) -> Result<(), EncodeError> {
        self.fsgnjn_d(rd, rs, rs)
    }
}

/// `op rd, rs1, rs2, rs3, rm` on the fused multiply-add opcodes.
macro_rules! fused_ops {
    ($( $name:ident => $m:ident, $opcode:expr, $fmt:expr; )*) => {
        impl Assembler {
            $(
                #[doc = concat!("`", stringify!($name), " rd, rs1, rs2, rs3, rm`.")]
                pub fn $name(
                    &mut self,
                    rd: Fpr,
                    rs1: Fpr,
                    rs2: Fpr,
                    rs3: Fpr,
                    rm: RoundingMode,
                ) -> Result<(), EncodeError> {
                    self.fp_fused(Mnemonic::$m, $opcode, $fmt, rd, rs1, rs2, rs3, rm)
                }
            )*
        }
    };
}

/// `op rd, rs1, rs2, rm` with rounding.
macro_rules! rounded_ops {
    ($( $name:ident => $m:ident, $funct7:expr; )*) => {
        impl Assembler {
            $(
                #[doc = concat!("`", stringify!($name), " rd, rs1, rs2, rm`.")]
                pub fn $name(&mut self, rd: Fpr, rs1: Fpr, rs2: Fpr, rm: RoundingMode) -> Result<(), EncodeError> {
                    self.fp_op(Mnemonic::$m, $funct7, rm.bits(), rd.num(), rs1.num(), rs2.num())
                }
            )*
        }
    };
}

/// `op rd, rs1, rs2` where funct3 selects the operation.
macro_rules! select_ops {
    ($( $name:ident => $m:ident, $funct7:expr, $funct3:expr; )*) => {
        impl Assembler {
            $(
                #[doc = concat!("`", stringify!($name), " rd, rs1, rs2`.")]
                pub fn $name(&mut self, rd: Fpr, rs1: Fpr, rs2: Fpr) -> Result<(), EncodeError> {
                    self.fp_op(Mnemonic::$m, $funct7, $funct3, rd.num(), rs1.num(), rs2.num())
                }
            )*
        }
    };
}

/// Comparisons writing an integer register.
macro_rules! compare_ops {
    ($( $name:ident => $m:ident, $funct7:expr, $funct3:expr; )*) => {
        impl Assembler {
            $(
                #[doc = concat!("`", stringify!($name), " rd, rs1, rs2`.")]
                pub fn $name(&mut self, rd: Gpr, rs1: Fpr, rs2: Fpr) -> Result<(), EncodeError> {
                    self.fp_op(Mnemonic::$m, $funct7, $funct3, rd.num(), rs1.num(), rs2.num())
                }
            )*
        }
    };
}

/// Conversions; `$rd`/`$rs` pick the register files.
macro_rules! convert_ops {
    ($( $name:ident => $m:ident, $funct7:expr, $rs2:expr, $rd:ty, $rs:ty; )*) => {
        impl Assembler {
            $(
                #[doc = concat!("`", stringify!($name), " rd, rs1, rm`.")]
                pub fn $name(&mut self, rd: $rd, rs1: $rs, rm: RoundingMode) -> Result<(), EncodeError> {
                    self.fp_op(Mnemonic::$m, $funct7, rm.bits(), rd.num(), rs1.num(), $rs2)
                }
            )*
        }
    };
}

fused_ops! {
    fmadd_s => FmaddS, OP_MADD, FMT_S;
    fmsub_s => FmsubS, OP_MSUB, FMT_S;
    fnmsub_s => FnmsubS, OP_NMSUB, FMT_S;
    fnmadd_s => FnmaddS, OP_NMADD, FMT_S;
    fmadd_d => FmaddD, OP_MADD, FMT_D;
    fmsub_d => FmsubD, OP_MSUB, FMT_D;
    fnmsub_d => FnmsubD, OP_NMSUB, FMT_D;
    fnmadd_d => FnmaddD, OP_NMADD, FMT_D;
}

rounded_ops! {
    fadd_s => FaddS, 0b000_0000;
    fsub_s => FsubS, 0b000_0100;
    fmul_s => FmulS, 0b000_1000;
    fdiv_s => FdivS, 0b000_1100;
    fadd_d => FaddD, 0b000_0001;
    fsub_d => FsubD, 0b000_0101;
    fmul_d => FmulD, 0b000_1001;
    fdiv_d => FdivD, 0b000_1101;
}

select_ops! {
    fsgnj_s => FsgnjS, 0b001_0000, 0b000;
    fsgnjn_s => FsgnjnS, 0b001_0000, 0b001;
    fsgnjx_s => FsgnjxS, 0b001_0000, 0b010;
    fmin_s => FminS, 0b001_0100, 0b000;
    fmax_s => FmaxS, 0b001_0100, 0b001;
    fsgnj_d => FsgnjD, 0b001_0001, 0b000;
    fsgnjn_d => FsgnjnD, 0b001_0001, 0b001;
    fsgnjx_d => FsgnjxD, 0b001_0001, 0b010;
    fmin_d => FminD, 0b001_0101, 0b000;
    fmax_d => FmaxD, 0b001_0101, 0b001;
}

compare_ops! {
    feq_s => FeqS, 0b101_0000, 0b010;
    flt_s => FltS, 0b101_0000, 0b001;
    fle_s => FleS, 0b101_0000, 0b000;
    feq_d => FeqD, 0b101_0001, 0b010;
    flt_d => FltD, 0b101_0001, 0b001;
    fle_d => FleD, 0b101_0001, 0b000;
}

convert_ops! {
    fsqrt_s => FsqrtS, 0b010_1100, 0, Fpr, Fpr;
    fsqrt_d => FsqrtD, 0b010_1101, 0, Fpr, Fpr;
    fcvt_w_s => FcvtWS, 0b110_0000, 0, Gpr, Fpr;
    fcvt_wu_s => FcvtWuS, 0b110_0000, 1, Gpr, Fpr;
    fcvt_l_s => FcvtLS, 0b110_0000, 2, Gpr, Fpr;
    fcvt_lu_s => FcvtLuS, 0b110_0000, 3, Gpr, Fpr;
    fcvt_s_w => FcvtSW, 0b110_1000, 0, Fpr, Gpr;
    fcvt_s_wu => FcvtSWu, 0b110_1000, 1, Fpr, Gpr;
    fcvt_s_l => FcvtSL, 0b110_1000, 2, Fpr, Gpr;
    fcvt_s_lu => FcvtSLu, 0b110_1000, 3, Fpr, Gpr;
    fcvt_w_d => FcvtWD, 0b110_0001, 0, Gpr, Fpr;
    fcvt_wu_d => FcvtWuD, 0b110_0001, 1, Gpr, Fpr;
    fcvt_l_d => FcvtLD, 0b110_0001, 2, Gpr, Fpr;
    fcvt_lu_d => FcvtLuD, 0b110_0001, 3, Gpr, Fpr;
    fcvt_d_w => FcvtDW, 0b110_1001, 0, Fpr, Gpr;
    fcvt_d_wu => FcvtDWu, 0b110_1001, 1, Fpr, Gpr;
    fcvt_d_l => FcvtDL, 0b110_1001, 2, Fpr, Gpr;
    fcvt_d_lu => FcvtDLu, 0b110_1001, 3, Fpr, Gpr;
}

impl Assembler {
    /// `fclass.s rd, rs1`.
    pub fn fclass_s(&mut self, rd: Gpr, rs1: Fpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FclassS, 0b111_0000, 0b001, rd.num(), rs1.num(), 0)
    }

    /// `fclass.d rd, rs1`.
    pub fn fclass_d(&mut self, rd: Gpr, rs1: Fpr) -> Result<(), EncodeError> {
        self.fp_op(Mnemonic::FclassD, 0b111_0001, 0b001, rd.num(), rs1.num(), 0)
    }
}
