//! Operand model: registers, architecture width, and instruction modifiers.
//!
//! Everything in this module is a small `Copy` value type. Registers carry
//! only an index; how many bits an operand spans is a property of the
//! instruction that uses it, not of the register itself.

use core::fmt;
use core::ops::BitOr;

// ── Architecture width ──────────────────────────────────────────────────

/// Base integer register width (`XLEN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Xlen {
    /// RV32: 32-bit integer registers.
    Rv32,
    /// RV64: 64-bit integer registers.
    #[default]
    Rv64,
    /// RV128: 128-bit integer registers (decode context only).
    Rv128,
}

impl Xlen {
    /// Register width in bits.
    #[inline]
    pub const fn bits(self) -> u16 {
        match self {
            Xlen::Rv32 => 32,
            Xlen::Rv64 => 64,
            Xlen::Rv128 => 128,
        }
    }

    /// Largest legal shift amount for a full-width shift.
    #[inline]
    pub const fn max_shamt(self) -> u32 {
        self.bits() as u32 - 1
    }

    /// Whether RV64-only instructions (`ld`, `addiw`, `c.addiw`, …) exist.
    #[inline]
    pub const fn has_rv64(self) -> bool {
        !matches!(self, Xlen::Rv32)
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Xlen::Rv32 => write!(f, "RV32"),
            Xlen::Rv64 => write!(f, "RV64"),
            Xlen::Rv128 => write!(f, "RV128"),
        }
    }
}

// ── Registers ───────────────────────────────────────────────────────────

/// Register file a register index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegKind {
    /// Integer register `x0`–`x31`.
    Gpr,
    /// Floating-point register `f0`–`f31`.
    Fpr,
    /// Vector register `v0`–`v31`.
    Vr,
}

macro_rules! register_type {
    ($(#[$doc:meta])* $name:ident, $kind:expr, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(u8);

        impl $name {
            /// Create a register from its index.
            ///
            /// # Panics
            ///
            /// Panics if `index >= 32`.
            #[inline]
            pub const fn new(index: u8) -> Self {
                assert!(index < 32, "register index out of range (0..32)");
                Self(index)
            }

            /// Create a register from its index, or `None` if `index >= 32`.
            #[inline]
            pub const fn try_new(index: u8) -> Option<Self> {
                if index < 32 {
                    Some(Self(index))
                } else {
                    None
                }
            }

            /// Register index (0–31).
            #[inline]
            pub const fn index(self) -> u8 {
                self.0
            }

            /// Index as a `u32` for field insertion.
            #[inline]
            pub(crate) const fn num(self) -> u32 {
                self.0 as u32
            }

            /// 3-bit index in the compressed register subset (8–15),
            /// or `None` when the register is outside it.
            #[inline]
            pub const fn compact(self) -> Option<u8> {
                if self.0 >= 8 && self.0 <= 15 {
                    Some(self.0 - 8)
                } else {
                    None
                }
            }

            /// Whether the register is in the compressed subset (8–15).
            #[inline]
            pub const fn is_compact(self) -> bool {
                self.compact().is_some()
            }

            /// Kind-erased form of this register.
            #[inline]
            pub const fn erase(self) -> Register {
                Register {
                    kind: $kind,
                    index: self.0,
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<$name> for Register {
            #[inline]
            fn from(r: $name) -> Register {
                r.erase()
            }
        }
    };
}

register_type!(
    /// General-purpose integer register.
    Gpr,
    RegKind::Gpr,
    "x"
);
register_type!(
    /// Floating-point register.
    Fpr,
    RegKind::Fpr,
    "f"
);
register_type!(
    /// Vector register.
    Vr,
    RegKind::Vr,
    "v"
);

impl Gpr {
    /// Whether this is the hard-wired zero register.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// A register of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    /// Register file.
    pub kind: RegKind,
    /// Index within the register file (0–31).
    pub index: u8,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            RegKind::Gpr => 'x',
            RegKind::Fpr => 'f',
            RegKind::Vr => 'v',
        };
        write!(f, "{}{}", prefix, self.index)
    }
}

/// Register constants: architectural (`X5`, `F10`, `V3`) and ABI names.
pub mod regs {
    use super::{Fpr, Gpr, Vr};

    macro_rules! consts {
        ($ty:ident: $($name:ident = $n:expr),* $(,)?) => {
            $(
                #[allow(missing_docs)]
                pub const $name: $ty = $ty::new($n);
            )*
        };
    }

    consts!(Gpr:
        X0 = 0, X1 = 1, X2 = 2, X3 = 3, X4 = 4, X5 = 5, X6 = 6, X7 = 7,
        X8 = 8, X9 = 9, X10 = 10, X11 = 11, X12 = 12, X13 = 13, X14 = 14, X15 = 15,
        X16 = 16, X17 = 17, X18 = 18, X19 = 19, X20 = 20, X21 = 21, X22 = 22, X23 = 23,
        X24 = 24, X25 = 25, X26 = 26, X27 = 27, X28 = 28, X29 = 29, X30 = 30, X31 = 31,
    );

    consts!(Gpr:
        ZERO = 0, RA = 1, SP = 2, GP = 3, TP = 4, T0 = 5, T1 = 6, T2 = 7,
        S0 = 8, FP = 8, S1 = 9, A0 = 10, A1 = 11, A2 = 12, A3 = 13, A4 = 14, A5 = 15,
        A6 = 16, A7 = 17, S2 = 18, S3 = 19, S4 = 20, S5 = 21, S6 = 22, S7 = 23,
        S8 = 24, S9 = 25, S10 = 26, S11 = 27, T3 = 28, T4 = 29, T5 = 30, T6 = 31,
    );

    consts!(Fpr:
        F0 = 0, F1 = 1, F2 = 2, F3 = 3, F4 = 4, F5 = 5, F6 = 6, F7 = 7,
        F8 = 8, F9 = 9, F10 = 10, F11 = 11, F12 = 12, F13 = 13, F14 = 14, F15 = 15,
        F16 = 16, F17 = 17, F18 = 18, F19 = 19, F20 = 20, F21 = 21, F22 = 22, F23 = 23,
        F24 = 24, F25 = 25, F26 = 26, F27 = 27, F28 = 28, F29 = 29, F30 = 30, F31 = 31,
    );

    consts!(Fpr:
        FT0 = 0, FT1 = 1, FT2 = 2, FT3 = 3, FT4 = 4, FT5 = 5, FT6 = 6, FT7 = 7,
        FS0 = 8, FS1 = 9, FA0 = 10, FA1 = 11, FA2 = 12, FA3 = 13, FA4 = 14, FA5 = 15,
        FA6 = 16, FA7 = 17, FS2 = 18, FS3 = 19, FS4 = 20, FS5 = 21, FS6 = 22, FS7 = 23,
        FS8 = 24, FS9 = 25, FS10 = 26, FS11 = 27, FT8 = 28, FT9 = 29, FT10 = 30, FT11 = 31,
    );

    consts!(Vr:
        V0 = 0, V1 = 1, V2 = 2, V3 = 3, V4 = 4, V5 = 5, V6 = 6, V7 = 7,
        V8 = 8, V9 = 9, V10 = 10, V11 = 11, V12 = 12, V13 = 13, V14 = 14, V15 = 15,
        V16 = 16, V17 = 17, V18 = 18, V19 = 19, V20 = 20, V21 = 21, V22 = 22, V23 = 23,
        V24 = 24, V25 = 25, V26 = 26, V27 = 27, V28 = 28, V29 = 29, V30 = 30, V31 = 31,
    );
}

// ── Atomic ordering ─────────────────────────────────────────────────────

/// Memory ordering of an A-extension instruction (`aq`/`rl` bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AtomicOrdering {
    /// No ordering constraint (`aq=0 rl=0`).
    #[default]
    Relaxed,
    /// Release semantics (`rl=1`).
    Release,
    /// Acquire semantics (`aq=1`).
    Acquire,
    /// Sequentially consistent (`aq=1 rl=1`).
    AcqRel,
}

impl AtomicOrdering {
    /// The `aq` bit.
    #[inline]
    pub const fn aq(self) -> bool {
        matches!(self, AtomicOrdering::Acquire | AtomicOrdering::AcqRel)
    }

    /// The `rl` bit.
    #[inline]
    pub const fn rl(self) -> bool {
        matches!(self, AtomicOrdering::Release | AtomicOrdering::AcqRel)
    }

    /// Rebuild from the `aq`/`rl` bit pair.
    #[inline]
    pub const fn from_bits(aq: bool, rl: bool) -> Self {
        match (aq, rl) {
            (false, false) => AtomicOrdering::Relaxed,
            (false, true) => AtomicOrdering::Release,
            (true, false) => AtomicOrdering::Acquire,
            (true, true) => AtomicOrdering::AcqRel,
        }
    }

    /// Assembler suffix (`""`, `".rl"`, `".aq"`, `".aqrl"`).
    pub const fn suffix(self) -> &'static str {
        match self {
            AtomicOrdering::Relaxed => "",
            AtomicOrdering::Release => ".rl",
            AtomicOrdering::Acquire => ".aq",
            AtomicOrdering::AcqRel => ".aqrl",
        }
    }
}

// ── Floating-point rounding mode ────────────────────────────────────────

/// Floating-point rounding mode (`rm` field, bits 14:12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    Rne,
    /// Round towards zero.
    Rtz,
    /// Round down (towards −∞).
    Rdn,
    /// Round up (towards +∞).
    Rup,
    /// Round to nearest, ties to max magnitude.
    Rmm,
    /// Use the dynamic mode held in `frm`.
    #[default]
    Dyn,
}

impl RoundingMode {
    /// Encoded 3-bit value.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            RoundingMode::Rne => 0b000,
            RoundingMode::Rtz => 0b001,
            RoundingMode::Rdn => 0b010,
            RoundingMode::Rup => 0b011,
            RoundingMode::Rmm => 0b100,
            RoundingMode::Dyn => 0b111,
        }
    }

    /// Decode a 3-bit value; `0b101` and `0b110` are reserved.
    #[inline]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits & 0b111 {
            0b000 => RoundingMode::Rne,
            0b001 => RoundingMode::Rtz,
            0b010 => RoundingMode::Rdn,
            0b011 => RoundingMode::Rup,
            0b100 => RoundingMode::Rmm,
            0b111 => RoundingMode::Dyn,
            _ => return None,
        })
    }

    /// Lower-case assembler name.
    pub const fn as_str(self) -> &'static str {
        match self {
            RoundingMode::Rne => "rne",
            RoundingMode::Rtz => "rtz",
            RoundingMode::Rdn => "rdn",
            RoundingMode::Rup => "rup",
            RoundingMode::Rmm => "rmm",
            RoundingMode::Dyn => "dyn",
        }
    }
}

// ── Vector modifiers ────────────────────────────────────────────────────

/// Vector mask selection (`vm` bit 25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VectorMask {
    /// Operate on all elements (`vm=1`).
    #[default]
    Unmasked,
    /// Operate only where `v0.t` is set (`vm=0`).
    Masked,
}

impl VectorMask {
    /// Encoded `vm` bit.
    #[inline]
    pub const fn vm_bit(self) -> u32 {
        match self {
            VectorMask::Unmasked => 1,
            VectorMask::Masked => 0,
        }
    }

    /// Rebuild from the `vm` bit.
    #[inline]
    pub const fn from_vm_bit(bit: u32) -> Self {
        if bit & 1 == 1 {
            VectorMask::Unmasked
        } else {
            VectorMask::Masked
        }
    }
}

/// Selected element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sew {
    /// 8-bit elements.
    E8,
    /// 16-bit elements.
    E16,
    /// 32-bit elements.
    E32,
    /// 64-bit elements.
    E64,
}

/// Register group multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lmul {
    /// LMUL = 1.
    M1,
    /// LMUL = 2.
    M2,
    /// LMUL = 4.
    M4,
    /// LMUL = 8.
    M8,
    /// LMUL = 1/8.
    Mf8,
    /// LMUL = 1/4.
    Mf4,
    /// LMUL = 1/2.
    Mf2,
}

/// Vector type configuration written by `vsetvli`/`vsetivli`.
///
/// Field layout of the encoded immediate (bits [7:0]):
/// `[7]` vma, `[6]` vta, `[5:3]` vsew, `[2:0]` vlmul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vtype {
    /// Element width.
    pub sew: Sew,
    /// Group multiplier.
    pub lmul: Lmul,
    /// Tail agnostic (`ta`) when true, tail undisturbed (`tu`) otherwise.
    pub tail_agnostic: bool,
    /// Mask agnostic (`ma`) when true, mask undisturbed (`mu`) otherwise.
    pub mask_agnostic: bool,
}

impl Vtype {
    /// Convenience constructor.
    pub const fn new(sew: Sew, lmul: Lmul, tail_agnostic: bool, mask_agnostic: bool) -> Self {
        Self {
            sew,
            lmul,
            tail_agnostic,
            mask_agnostic,
        }
    }

    /// Encoded 8-bit vtype immediate.
    pub const fn bits(self) -> u32 {
        let sew = match self.sew {
            Sew::E8 => 0,
            Sew::E16 => 1,
            Sew::E32 => 2,
            Sew::E64 => 3,
        };
        let lmul = match self.lmul {
            Lmul::M1 => 0,
            Lmul::M2 => 1,
            Lmul::M4 => 2,
            Lmul::M8 => 3,
            Lmul::Mf8 => 5,
            Lmul::Mf4 => 6,
            Lmul::Mf2 => 7,
        };
        ((self.mask_agnostic as u32) << 7) | ((self.tail_agnostic as u32) << 6) | (sew << 3) | lmul
    }

    /// Decode an 8-bit vtype immediate. Reserved SEW/LMUL encodings and any
    /// set bit above bit 7 yield `None`.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits >> 8 != 0 {
            return None;
        }
        let sew = match (bits >> 3) & 7 {
            0 => Sew::E8,
            1 => Sew::E16,
            2 => Sew::E32,
            3 => Sew::E64,
            _ => return None,
        };
        let lmul = match bits & 7 {
            0 => Lmul::M1,
            1 => Lmul::M2,
            2 => Lmul::M4,
            3 => Lmul::M8,
            5 => Lmul::Mf8,
            6 => Lmul::Mf4,
            7 => Lmul::Mf2,
            _ => return None,
        };
        Some(Self {
            sew,
            lmul,
            tail_agnostic: (bits >> 6) & 1 == 1,
            mask_agnostic: (bits >> 7) & 1 == 1,
        })
    }
}

// ── Fence sets ──────────────────────────────────────────────────────────

/// Predecessor/successor set of a `fence` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FenceSet(u8);

impl FenceSet {
    /// Device input.
    pub const I: FenceSet = FenceSet(1 << 3);
    /// Device output.
    pub const O: FenceSet = FenceSet(1 << 2);
    /// Memory reads.
    pub const R: FenceSet = FenceSet(1 << 1);
    /// Memory writes.
    pub const W: FenceSet = FenceSet(1 << 0);
    /// Memory reads and writes.
    pub const RW: FenceSet = FenceSet(0b0011);
    /// Everything.
    pub const IORW: FenceSet = FenceSet(0b1111);

    /// Build from raw bits; only the low 4 bits are kept.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        FenceSet(bits & 0xF)
    }

    /// Raw 4-bit value.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }
}

impl BitOr for FenceSet {
    type Output = FenceSet;
    fn bitor(self, rhs: FenceSet) -> FenceSet {
        FenceSet(self.0 | rhs.0)
    }
}

// ── CSR numbers ────────────────────────────────────────────────────────

/// Well-known CSR addresses used by the pseudo-instructions.
pub mod csr {
    /// Floating-point accrued exceptions.
    pub const FFLAGS: u16 = 0x001;
    /// Floating-point dynamic rounding mode.
    pub const FRM: u16 = 0x002;
    /// Floating-point control and status (`frm` + `fflags`).
    pub const FCSR: u16 = 0x003;
    /// Vector start index.
    pub const VSTART: u16 = 0x008;
    /// Cycle counter.
    pub const CYCLE: u16 = 0xC00;
    /// Wall-clock timer.
    pub const TIME: u16 = 0xC01;
    /// Instructions retired.
    pub const INSTRET: u16 = 0xC02;
    /// Vector length.
    pub const VL: u16 = 0xC20;
    /// Vector type.
    pub const VTYPE: u16 = 0xC21;
    /// Vector register length in bytes.
    pub const VLENB: u16 = 0xC22;
}
