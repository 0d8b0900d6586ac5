//! The closed set of instruction mnemonics and their extension tags.

use core::fmt;

use crate::ir::Xlen;

/// ISA extension an instruction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extension {
    /// Base integer ISA (RV32I/RV64I).
    I,
    /// Integer multiply/divide.
    M,
    /// Atomics.
    A,
    /// Single-precision floating point.
    F,
    /// Double-precision floating point.
    D,
    /// Compressed instructions.
    C,
    /// Vector instructions.
    V,
    /// Control and status register access.
    Zicsr,
    /// Instruction-fetch fence.
    Zifencei,
}

impl Extension {
    /// Canonical extension name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Extension::I => "I",
            Extension::M => "M",
            Extension::A => "A",
            Extension::F => "F",
            Extension::D => "D",
            Extension::C => "C",
            Extension::V => "V",
            Extension::Zicsr => "Zicsr",
            Extension::Zifencei => "Zifencei",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! mnemonics {
    ($($variant:ident => $name:literal, $ext:ident;)*) => {
        /// Instruction mnemonic.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Mnemonic {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
        }

        impl Mnemonic {
            /// Every mnemonic, in declaration order.
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$variant,)*];

            /// Lower-case assembler name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Mnemonic::$variant => $name,)*
                }
            }

            /// Extension the instruction belongs to.
            pub const fn extension(self) -> Extension {
                match self {
                    $(Mnemonic::$variant => Extension::$ext,)*
                }
            }
        }
    };
}

mnemonics! {
    // RV32I
    Lui => "lui", I;
    Auipc => "auipc", I;
    Jal => "jal", I;
    Jalr => "jalr", I;
    Beq => "beq", I;
    Bne => "bne", I;
    Blt => "blt", I;
    Bge => "bge", I;
    Bltu => "bltu", I;
    Bgeu => "bgeu", I;
    Lb => "lb", I;
    Lh => "lh", I;
    Lw => "lw", I;
    Lbu => "lbu", I;
    Lhu => "lhu", I;
    Sb => "sb", I;
    Sh => "sh", I;
    Sw => "sw", I;
    Addi => "addi", I;
    Slti => "slti", I;
    Sltiu => "sltiu", I;
    Xori => "xori", I;
    Ori => "ori", I;
    Andi => "andi", I;
    Slli => "slli", I;
    Srli => "srli", I;
    Srai => "srai", I;
    Add => "add", I;
    Sub => "sub", I;
    Sll => "sll", I;
    Slt => "slt", I;
    Sltu => "sltu", I;
    Xor => "xor", I;
    Srl => "srl", I;
    Sra => "sra", I;
    Or => "or", I;
    And => "and", I;
    Fence => "fence", I;
    Ecall => "ecall", I;
    Ebreak => "ebreak", I;
    // RV64I
    Lwu => "lwu", I;
    Ld => "ld", I;
    Sd => "sd", I;
    Addiw => "addiw", I;
    Slliw => "slliw", I;
    Srliw => "srliw", I;
    Sraiw => "sraiw", I;
    Addw => "addw", I;
    Subw => "subw", I;
    Sllw => "sllw", I;
    Srlw => "srlw", I;
    Sraw => "sraw", I;
    // Zifencei / Zicsr
    FenceI => "fence.i", Zifencei;
    Csrrw => "csrrw", Zicsr;
    Csrrs => "csrrs", Zicsr;
    Csrrc => "csrrc", Zicsr;
    Csrrwi => "csrrwi", Zicsr;
    Csrrsi => "csrrsi", Zicsr;
    Csrrci => "csrrci", Zicsr;
    // M
    Mul => "mul", M;
    Mulh => "mulh", M;
    Mulhsu => "mulhsu", M;
    Mulhu => "mulhu", M;
    Div => "div", M;
    Divu => "divu", M;
    Rem => "rem", M;
    Remu => "remu", M;
    Mulw => "mulw", M;
    Divw => "divw", M;
    Divuw => "divuw", M;
    Remw => "remw", M;
    Remuw => "remuw", M;
    // A
    LrW => "lr.w", A;
    ScW => "sc.w", A;
    AmoswapW => "amoswap.w", A;
    AmoaddW => "amoadd.w", A;
    AmoxorW => "amoxor.w", A;
    AmoandW => "amoand.w", A;
    AmoorW => "amoor.w", A;
    AmominW => "amomin.w", A;
    AmomaxW => "amomax.w", A;
    AmominuW => "amominu.w", A;
    AmomaxuW => "amomaxu.w", A;
    LrD => "lr.d", A;
    ScD => "sc.d", A;
    AmoswapD => "amoswap.d", A;
    AmoaddD => "amoadd.d", A;
    AmoxorD => "amoxor.d", A;
    AmoandD => "amoand.d", A;
    AmoorD => "amoor.d", A;
    AmominD => "amomin.d", A;
    AmomaxD => "amomax.d", A;
    AmominuD => "amominu.d", A;
    AmomaxuD => "amomaxu.d", A;
    // F
    Flw => "flw", F;
    Fsw => "fsw", F;
    FmaddS => "fmadd.s", F;
    FmsubS => "fmsub.s", F;
    FnmsubS => "fnmsub.s", F;
    FnmaddS => "fnmadd.s", F;
    FaddS => "fadd.s", F;
    FsubS => "fsub.s", F;
    FmulS => "fmul.s", F;
    FdivS => "fdiv.s", F;
    FsqrtS => "fsqrt.s", F;
    FsgnjS => "fsgnj.s", F;
    FsgnjnS => "fsgnjn.s", F;
    FsgnjxS => "fsgnjx.s", F;
    FminS => "fmin.s", F;
    FmaxS => "fmax.s", F;
    FcvtWS => "fcvt.w.s", F;
    FcvtWuS => "fcvt.wu.s", F;
    FmvXW => "fmv.x.w", F;
    FeqS => "feq.s", F;
    FltS => "flt.s", F;
    FleS => "fle.s", F;
    FclassS => "fclass.s", F;
    FcvtSW => "fcvt.s.w", F;
    FcvtSWu => "fcvt.s.wu", F;
    FmvWX => "fmv.w.x", F;
    FcvtLS => "fcvt.l.s", F;
    FcvtLuS => "fcvt.lu.s", F;
    FcvtSL => "fcvt.s.l", F;
    FcvtSLu => "fcvt.s.lu", F;
    // D
    Fld => "fld", D;
    Fsd => "fsd", D;
    FmaddD => "fmadd.d", D;
    FmsubD => "fmsub.d", D;
    FnmsubD => "fnmsub.d", D;
    FnmaddD => "fnmadd.d", D;
    FaddD => "fadd.d", D;
    FsubD => "fsub.d", D;
    FmulD => "fmul.d", D;
    FdivD => "fdiv.d", D;
    FsqrtD => "fsqrt.d", D;
    FsgnjD => "fsgnj.d", D;
    FsgnjnD => "fsgnjn.d", D;
    FsgnjxD => "fsgnjx.d", D;
    FminD => "fmin.d", D;
    FmaxD => "fmax.d", D;
    FcvtSD => "fcvt.s.d", D;
    FcvtDS => "fcvt.d.s", D;
    FeqD => "feq.d", D;
    FltD => "flt.d", D;
    FleD => "fle.d", D;
    FclassD => "fclass.d", D;
    FcvtWD => "fcvt.w.d", D;
    FcvtWuD => "fcvt.wu.d", D;
    FcvtDW => "fcvt.d.w", D;
    FcvtDWu => "fcvt.d.wu", D;
    FcvtLD => "fcvt.l.d", D;
    FcvtLuD => "fcvt.lu.d", D;
    FmvXD => "fmv.x.d", D;
    FcvtDL => "fcvt.d.l", D;
    FcvtDLu => "fcvt.d.lu", D;
    FmvDX => "fmv.d.x", D;
    // C
    CAddi4spn => "c.addi4spn", C;
    CFld => "c.fld", C;
    CLw => "c.lw", C;
    CFlw => "c.flw", C;
    CLd => "c.ld", C;
    CFsd => "c.fsd", C;
    CSw => "c.sw", C;
    CFsw => "c.fsw", C;
    CSd => "c.sd", C;
    CNop => "c.nop", C;
    CAddi => "c.addi", C;
    CJal => "c.jal", C;
    CAddiw => "c.addiw", C;
    CLi => "c.li", C;
    CAddi16sp => "c.addi16sp", C;
    CLui => "c.lui", C;
    CSrli => "c.srli", C;
    CSrai => "c.srai", C;
    CAndi => "c.andi", C;
    CSub => "c.sub", C;
    CXor => "c.xor", C;
    COr => "c.or", C;
    CAnd => "c.and", C;
    CSubw => "c.subw", C;
    CAddw => "c.addw", C;
    CJ => "c.j", C;
    CBeqz => "c.beqz", C;
    CBnez => "c.bnez", C;
    CSlli => "c.slli", C;
    CFldsp => "c.fldsp", C;
    CLwsp => "c.lwsp", C;
    CFlwsp => "c.flwsp", C;
    CLdsp => "c.ldsp", C;
    CJr => "c.jr", C;
    CMv => "c.mv", C;
    CEbreak => "c.ebreak", C;
    CJalr => "c.jalr", C;
    CAdd => "c.add", C;
    CFsdsp => "c.fsdsp", C;
    CSwsp => "c.swsp", C;
    CFswsp => "c.fswsp", C;
    CSdsp => "c.sdsp", C;
    // V
    Vsetvli => "vsetvli", V;
    Vsetivli => "vsetivli", V;
    Vsetvl => "vsetvl", V;
    Vle8V => "vle8.v", V;
    Vle16V => "vle16.v", V;
    Vle32V => "vle32.v", V;
    Vle64V => "vle64.v", V;
    Vse8V => "vse8.v", V;
    Vse16V => "vse16.v", V;
    Vse32V => "vse32.v", V;
    Vse64V => "vse64.v", V;
    VaddVv => "vadd.vv", V;
    VaddVx => "vadd.vx", V;
    VaddVi => "vadd.vi", V;
    VsubVv => "vsub.vv", V;
    VsubVx => "vsub.vx", V;
    VandVv => "vand.vv", V;
    VandVx => "vand.vx", V;
    VandVi => "vand.vi", V;
    VorVv => "vor.vv", V;
    VorVx => "vor.vx", V;
    VorVi => "vor.vi", V;
    VxorVv => "vxor.vv", V;
    VxorVx => "vxor.vx", V;
    VxorVi => "vxor.vi", V;
    VmulVv => "vmul.vv", V;
    VmulVx => "vmul.vx", V;
}

impl Mnemonic {
    /// Look a mnemonic up by its assembler name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == name)
    }

    /// Whether the instruction exists at the given register width.
    pub const fn available(self, xlen: Xlen) -> bool {
        use Mnemonic::*;
        match self {
            Lwu | Ld | Sd | Addiw | Slliw | Srliw | Sraiw | Addw | Subw | Sllw | Srlw | Sraw
            | Mulw | Divw | Divuw | Remw | Remuw | LrD | ScD | AmoswapD | AmoaddD | AmoxorD
            | AmoandD | AmoorD | AmominD | AmomaxD | AmominuD | AmomaxuD | FcvtLS | FcvtLuS
            | FcvtSL | FcvtSLu | FcvtLD | FcvtLuD | FmvXD | FcvtDL | FcvtDLu | FmvDX | CLd
            | CSd | CAddiw | CSubw | CAddw | CLdsp | CSdsp => xlen.has_rv64(),
            CJal | CFlw | CFsw | CFlwsp | CFswsp => matches!(xlen, Xlen::Rv32),
            _ => true,
        }
    }

    /// Whether this is a 16-bit compressed form.
    pub const fn is_compressed(self) -> bool {
        matches!(self.extension(), Extension::C)
    }

    /// Canonical 32-bit mnemonic a compressed form expands to.
    ///
    /// Non-compressed mnemonics map to themselves.
    pub const fn expanded(self) -> Mnemonic {
        use Mnemonic::*;
        match self {
            CAddi4spn | CNop | CAddi | CLi | CAddi16sp => Addi,
            CFld | CFldsp => Fld,
            CLw | CLwsp => Lw,
            CFlw | CFlwsp => Flw,
            CLd | CLdsp => Ld,
            CFsd | CFsdsp => Fsd,
            CSw | CSwsp => Sw,
            CFsw | CFswsp => Fsw,
            CSd | CSdsp => Sd,
            CJal | CJ => Jal,
            CAddiw => Addiw,
            CLui => Lui,
            CSrli => Srli,
            CSrai => Srai,
            CAndi => Andi,
            CSub => Sub,
            CXor => Xor,
            COr => Or,
            CAnd => And,
            CSubw => Subw,
            CAddw => Addw,
            CBeqz => Beq,
            CBnez => Bne,
            CSlli => Slli,
            CJr | CJalr => Jalr,
            CMv | CAdd => Add,
            CEbreak => Ebreak,
            other => other,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
