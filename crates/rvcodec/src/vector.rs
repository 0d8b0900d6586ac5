//! V extension subset: configuration, unit-stride loads/stores and basic
//! integer arithmetic.

use crate::assembler::{check_imm, invalid, Assembler};
use crate::error::EncodeError;
use crate::format::{pack, ImmShape, OP_LOAD_FP, OP_STORE_FP, OP_V};
use crate::ir::{Gpr, VectorMask, Vr, Vtype};
use crate::mnemonic::Mnemonic;

/// funct3 of `vset{i}vl{i}`.
const OPCFG: u32 = 0b111;
const OPIVV: u32 = 0b000;
const OPMVV: u32 = 0b010;
const OPIVI: u32 = 0b011;
const OPIVX: u32 = 0b100;
const OPMVX: u32 = 0b110;

/// Memory `width` field for an element size in bits.
const fn mem_width(eew: u32) -> u32 {
    match eew {
        8 => 0b000,
        16 => 0b101,
        32 => 0b110,
        _ => 0b111,
    }
}

#[inline]
const fn v_arith(funct6: u32, vm: u32, vs2: u32, src: u32, funct3: u32, vd: u32) -> u32 {
    (funct6 << 26) | (vm << 25) | (vs2 << 20) | (src << 15) | (funct3 << 12) | (vd << 7) | OP_V
}

impl Assembler {
    /// A masked instruction cannot write `v0`, which holds the mask.
    fn check_mask_overlap(m: Mnemonic, vd: Vr, mask: VectorMask) -> Result<(), EncodeError> {
        if mask == VectorMask::Masked && vd.index() == 0 {
            return Err(invalid(m, "masked destination must not be v0"));
        }
        Ok(())
    }

    fn v_op(
        &mut self,
        m: Mnemonic,
        funct6: u32,
        funct3: u32,
        vd: Vr,
        vs2: Vr,
        src: u32,
        mask: VectorMask,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        Self::check_mask_overlap(m, vd, mask)?;
        self.emit_word(v_arith(funct6, mask.vm_bit(), vs2.num(), src, funct3, vd.num()))
    }

    fn v_op_imm(
        &mut self,
        m: Mnemonic,
        funct6: u32,
        vd: Vr,
        vs2: Vr,
        imm: i32,
        mask: VectorMask,
    ) -> Result<(), EncodeError> {
        check_imm(m, ImmShape::Simm5, i64::from(imm))?;
        let src = pack(ImmShape::Simm5, i64::from(imm)) >> 15;
        self.v_op(m, funct6, OPIVI, vd, vs2, src, mask)
    }

    fn v_mem(
        &mut self,
        m: Mnemonic,
        opcode: u32,
        eew: u32,
        vreg: Vr,
        base: Gpr,
        mask: VectorMask,
    ) -> Result<(), EncodeError> {
        self.require(m)?;
        if opcode == OP_LOAD_FP {
            Self::check_mask_overlap(m, vreg, mask)?;
        }
        let word = (mask.vm_bit() << 25)
            | (base.num() << 15)
            | (mem_width(eew) << 12)
            | (vreg.num() << 7)
            | opcode;
        self.emit_word(word)
    }

    // ── Configuration ────────────────────────────────────────

    /// `vsetvli rd, rs1, vtype`.
    pub fn vsetvli(&mut self, rd: Gpr, rs1: Gpr, vtype: Vtype) -> Result<(), EncodeError> {
        let m = Mnemonic::Vsetvli;
        self.require(m)?;
        let zimm = i64::from(vtype.bits());
        check_imm(m, ImmShape::Zimm11, zimm)?;
        self.emit_word(
            pack(ImmShape::Zimm11, zimm) | (rs1.num() << 15) | (OPCFG << 12) | (rd.num() << 7) | OP_V,
        )
    }

    /// `vsetivli rd, avl, vtype` with an immediate AVL in `0..32`.
    pub fn vsetivli(&mut self, rd: Gpr, avl: u8, vtype: Vtype) -> Result<(), EncodeError> {
        let m = Mnemonic::Vsetivli;
        self.require(m)?;
        check_imm(m, ImmShape::Uimm5, i64::from(avl))?;
        let zimm = i64::from(vtype.bits());
        check_imm(m, ImmShape::Zimm10, zimm)?;
        self.emit_word(
            (0b11 << 30)
                | pack(ImmShape::Zimm10, zimm)
                | pack(ImmShape::Uimm5, i64::from(avl))
                | (OPCFG << 12)
                | (rd.num() << 7)
                | OP_V,
        )
    }

    /// `vsetvl rd, rs1, rs2`.
    pub fn vsetvl(&mut self, rd: Gpr, rs1: Gpr, rs2: Gpr) -> Result<(), EncodeError> {
        self.require(Mnemonic::Vsetvl)?;
        self.emit_word(
            (1 << 31) | (rs2.num() << 20) | (rs1.num() << 15) | (OPCFG << 12) | (rd.num() << 7) | OP_V,
        )
    }

    // ── Unit-stride memory ───────────────────────────────────

    /// `vle8.v vd, (rs1)`.
    pub fn vle8_v(&mut self, vd: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vle8V, OP_LOAD_FP, 8, vd, rs1, mask)
    }

    /// `vle16.v vd, (rs1)`.
    pub fn vle16_v(&mut self, vd: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vle16V, OP_LOAD_FP, 16, vd, rs1, mask)
    }

    /// `vle32.v vd, (rs1)`.
    pub fn vle32_v(&mut self, vd: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vle32V, OP_LOAD_FP, 32, vd, rs1, mask)
    }

    /// `vle64.v vd, (rs1)`.
    pub fn vle64_v(&mut self, vd: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vle64V, OP_LOAD_FP, 64, vd, rs1, mask)
    }

    /// `vse8.v vs3, (rs1)`.
    pub fn vse8_v(&mut self, vs3: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vse8V, OP_STORE_FP, 8, vs3, rs1, mask)
    }

    /// `vse16.v vs3, (rs1)`.
    pub fn vse16_v(&mut self, vs3: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vse16V, OP_STORE_FP, 16, vs3, rs1, mask)
    }

    /// `vse32.v vs3, (rs1)`.
    pub fn vse32_v(&mut self, vs3: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vse32V, OP_STORE_FP, 32, vs3, rs1, mask)
    }

    /// `vse64.v vs3, (rs1)`.
    pub fn vse64_v(&mut self, vs3: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
        self.v_mem(Mnemonic::Vse64V, OP_STORE_FP, 64, vs3, rs1, mask)
    }
}

/// Vector-vector, vector-scalar and vector-immediate forms of one
/// operation. Operand order follows the assembler: `vd, vs2, vs1/rs1/imm`.
macro_rules! v_arith_ops {
    (
        $(
            $funct6:expr,
            vv: $vv:ident => $mvv:ident, $fvv:expr,
            vx: $vx:ident => $mvx:ident, $fvx:expr
            $(, vi: $vi:ident => $mvi:ident)?;
        )*
    ) => {
        impl Assembler {
            $(
                #[doc = concat!("`", stringify!($vv), " vd, vs2, vs1`.")]
                pub fn $vv(&mut self, vd: Vr, vs2: Vr, vs1: Vr, mask: VectorMask) -> Result<(), EncodeError> {
                    self.v_op(Mnemonic::$mvv, $funct6, $fvv, vd, vs2, vs1.num(), mask)
                }

                #[doc = concat!("`", stringify!($vx), " vd, vs2, rs1`.")]
                pub fn $vx(&mut self, vd: Vr, vs2: Vr, rs1: Gpr, mask: VectorMask) -> Result<(), EncodeError> {
                    self.v_op(Mnemonic::$mvx, $funct6, $fvx, vd, vs2, rs1.num(), mask)
                }

                $(
                    #[doc = concat!("`", stringify!($vi), " vd, vs2, imm` with `imm` in `-16..=15`.")]
                    pub fn $vi(&mut self, vd: Vr, vs2: Vr, imm: i32, mask: VectorMask) -> Result<(), EncodeError> {
                        self.v_op_imm(Mnemonic::$mvi, $funct6, vd, vs2, imm, mask)
                    }
                )?
            )*
        }
    };
}

v_arith_ops! {
    0b000000, vv: vadd_vv => VaddVv, OPIVV, vx: vadd_vx => VaddVx, OPIVX, vi: vadd_vi => VaddVi;
    0b000010, vv: vsub_vv => VsubVv, OPIVV, vx: vsub_vx => VsubVx, OPIVX;
    0b001001, vv: vand_vv => VandVv, OPIVV, vx: vand_vx => VandVx, OPIVX, vi: vand_vi => VandVi;
    0b001010, vv: vor_vv => VorVv, OPIVV, vx: vor_vx => VorVx, OPIVX, vi: vor_vi => VorVi;
    0b001011, vv: vxor_vv => VxorVv, OPIVV, vx: vxor_vx => VxorVx, OPIVX, vi: vxor_vi => VxorVi;
    0b100101, vv: vmul_vv => VmulVv, OPMVV, vx: vmul_vx => VmulVx, OPMVX;
}
