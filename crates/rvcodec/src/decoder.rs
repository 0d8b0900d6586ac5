//! Instruction decoder: length determination, classification and operand
//! reconstruction.
//!
//! 32-bit words are classified by [`crate::decode_table`]; 16-bit words by
//! a quadrant dispatch. Both produce the same [`DecodedInstruction`] record.

use core::fmt;
use core::ops::BitOr;

use crate::decode_compressed;
use crate::decode_table;
use crate::error::DecodeError;
use crate::format::is_full_width;
use crate::ir::{AtomicOrdering, Fpr, Gpr, RoundingMode, VectorMask, Vr, Xlen};
use crate::mnemonic::{Extension, Mnemonic};

/// Upper bound on the operands of one decoded instruction.
pub const MAX_OPERANDS: usize = 4;

/// Width reported for vector register operands (the minimum VLEN).
pub const VLEN_MIN: u16 = 128;

/// Whether an operand is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// Source operand.
    Read,
    /// Destination operand.
    Write,
}

/// One decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodedOperand {
    /// General-purpose register.
    Gpr {
        /// Register.
        reg: Gpr,
        /// Bits the instruction uses.
        width: u16,
        /// Read or write.
        access: Access,
    },
    /// Floating-point register.
    Fpr {
        /// Register.
        reg: Fpr,
        /// 32 for single, 64 for double precision.
        width: u16,
        /// Read or write.
        access: Access,
    },
    /// Vector register.
    Vr {
        /// Register.
        reg: Vr,
        /// [`VLEN_MIN`].
        width: u16,
        /// Read or write.
        access: Access,
    },
    /// Immediate, already sign- or zero-extended.
    Imm(i64),
    /// Unused slot.
    #[default]
    None,
}

impl DecodedOperand {
    pub(crate) const fn x(num: u32, width: u16, access: Access) -> Self {
        DecodedOperand::Gpr {
            reg: Gpr::new((num & 0x1F) as u8),
            width,
            access,
        }
    }

    pub(crate) const fn f(num: u32, width: u16, access: Access) -> Self {
        DecodedOperand::Fpr {
            reg: Fpr::new((num & 0x1F) as u8),
            width,
            access,
        }
    }

    pub(crate) const fn v(num: u32, access: Access) -> Self {
        DecodedOperand::Vr {
            reg: Vr::new((num & 0x1F) as u8),
            width: VLEN_MIN,
            access,
        }
    }

    /// Access direction, `None` for immediates and empty slots.
    pub const fn access(&self) -> Option<Access> {
        match *self {
            DecodedOperand::Gpr { access, .. }
            | DecodedOperand::Fpr { access, .. }
            | DecodedOperand::Vr { access, .. } => Some(access),
            _ => None,
        }
    }

    /// Operand width in bits, `None` for immediates and empty slots.
    pub const fn width(&self) -> Option<u16> {
        match *self {
            DecodedOperand::Gpr { width, .. }
            | DecodedOperand::Fpr { width, .. }
            | DecodedOperand::Vr { width, .. } => Some(width),
            _ => None,
        }
    }

    /// The immediate value, if this is one.
    pub const fn imm(&self) -> Option<i64> {
        match *self {
            DecodedOperand::Imm(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this is a register of any kind.
    pub const fn is_register(&self) -> bool {
        matches!(
            self,
            DecodedOperand::Gpr { .. } | DecodedOperand::Fpr { .. } | DecodedOperand::Vr { .. }
        )
    }
}

/// Instruction class flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes(u16);

impl Attributes {
    /// No flags.
    pub const NONE: Attributes = Attributes(0);
    /// Conditional branch.
    pub const BRANCH: Attributes = Attributes(1 << 0);
    /// Unconditional jump.
    pub const JUMP: Attributes = Attributes(1 << 1);
    /// Reads memory.
    pub const LOAD: Attributes = Attributes(1 << 2);
    /// Writes memory.
    pub const STORE: Attributes = Attributes(1 << 3);
    /// Atomic memory operation.
    pub const ATOMIC: Attributes = Attributes(1 << 4);
    /// 16-bit encoding.
    pub const COMPRESSED: Attributes = Attributes(1 << 5);
    /// Floating-point instruction.
    pub const FLOAT: Attributes = Attributes(1 << 6);
    /// Vector instruction.
    pub const VECTOR: Attributes = Attributes(1 << 7);
    /// System, CSR or fence instruction.
    pub const SYSTEM: Attributes = Attributes(1 << 8);

    /// Whether every flag in `other` is set.
    #[inline]
    pub const fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    /// Combine two sets.
    #[inline]
    pub const fn union(self, other: Attributes) -> Attributes {
        Attributes(self.0 | other.0)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether no flag is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Attributes {
    type Output = Attributes;
    fn bitor(self, rhs: Attributes) -> Attributes {
        self.union(rhs)
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedInstruction {
    /// Mnemonic; compressed encodings report their `c.*` name.
    pub mnemonic: Mnemonic,
    /// Extension of [`Self::mnemonic`].
    pub extension: Extension,
    /// Encoded length in bytes (2 or 4).
    pub len: u8,
    /// Register width the instruction was decoded for.
    pub xlen: Xlen,
    /// Class flags.
    pub attributes: Attributes,
    /// Raw instruction bits (zero-extended for 16-bit encodings).
    pub raw: u32,
    /// `aq`/`rl` bits of atomics.
    pub ordering: Option<AtomicOrdering>,
    /// `rm` field, for instructions that have one.
    pub rounding: Option<RoundingMode>,
    /// `vm` bit of masked vector instructions.
    pub mask: Option<VectorMask>,
    operands: [DecodedOperand; MAX_OPERANDS],
    operand_count: u8,
}

impl DecodedInstruction {
    pub(crate) fn new(mnemonic: Mnemonic, len: u8, xlen: Xlen, raw: u32, attributes: Attributes) -> Self {
        Self {
            mnemonic,
            extension: mnemonic.extension(),
            len,
            xlen,
            attributes,
            raw,
            ordering: None,
            rounding: None,
            mask: None,
            operands: [DecodedOperand::None; MAX_OPERANDS],
            operand_count: 0,
        }
    }

    /// Append an operand; slots past [`MAX_OPERANDS`] are dropped.
    pub(crate) fn push(&mut self, op: DecodedOperand) {
        if let Some(slot) = self.operands.get_mut(usize::from(self.operand_count)) {
            *slot = op;
            self.operand_count += 1;
        }
    }

    /// The operands, in assembler order.
    pub fn operands(&self) -> &[DecodedOperand] {
        &self.operands[..usize::from(self.operand_count)]
    }

    /// Operand `i`, or `None` past the end.
    pub fn operand(&self, i: usize) -> Option<&DecodedOperand> {
        self.operands().get(i)
    }

    /// Whether this came from a 16-bit encoding.
    pub const fn is_compressed(&self) -> bool {
        self.len == 2
    }
}

impl fmt::Display for DecodedInstruction {
    /// Mnemonic followed by raw operands; not an assembler syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic.as_str())?;
        for (i, op) in self.operands().iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            match op {
                DecodedOperand::Gpr { reg, .. } => write!(f, "x{}", reg.index())?,
                DecodedOperand::Fpr { reg, .. } => write!(f, "f{}", reg.index())?,
                DecodedOperand::Vr { reg, .. } => write!(f, "v{}", reg.index())?,
                DecodedOperand::Imm(v) => write!(f, "{v}")?,
                DecodedOperand::None => {}
            }
        }
        Ok(())
    }
}

/// Stateless decoder for one register width.
///
/// # Examples
///
/// ```rust
/// use rvcodec::{Decoder, Mnemonic, Xlen};
///
/// let decoder = Decoder::new(Xlen::Rv64);
/// let insn = decoder.decode(&[0xB3, 0x00, 0x31, 0x00])?;
/// assert_eq!(insn.mnemonic, Mnemonic::Add);
/// assert_eq!(insn.len, 4);
/// # Ok::<(), rvcodec::DecodeError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decoder {
    xlen: Xlen,
}

impl Decoder {
    /// Create a decoder for `xlen`.
    pub const fn new(xlen: Xlen) -> Self {
        Self { xlen }
    }

    /// Configured register width.
    pub const fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// Decode the instruction at the start of `bytes`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfLength`] when `bytes` is shorter than the
    /// instruction, [`DecodeError::UnknownInstruction`] when no encoding
    /// matches.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedInstruction, DecodeError> {
        let (&b0, &b1) = match bytes {
            [b0, b1, ..] => (b0, b1),
            _ => {
                return Err(DecodeError::OutOfLength {
                    needed: 2,
                    available: bytes.len(),
                })
            }
        };
        let first = u16::from_le_bytes([b0, b1]);
        if !is_full_width(first) {
            return decode_compressed::decode(first, self.xlen).ok_or(DecodeError::UnknownInstruction {
                raw: u32::from(first),
            });
        }
        if first & 0b1_1111 == 0b1_1111 {
            // 48-bit and longer encodings
            return Err(DecodeError::UnknownInstruction {
                raw: u32::from(first),
            });
        }
        let word = match bytes {
            [a, b, c, d, ..] => u32::from_le_bytes([*a, *b, *c, *d]),
            _ => {
                return Err(DecodeError::OutOfLength {
                    needed: 4,
                    available: bytes.len(),
                })
            }
        };
        decode_table::decode(word, self.xlen).ok_or(DecodeError::UnknownInstruction { raw: word })
    }

    /// Decode from an optional source.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidBuffer`] for `None`, otherwise as
    /// [`Self::decode`].
    pub fn decode_buffer(&self, bytes: Option<&[u8]>) -> Result<DecodedInstruction, DecodeError> {
        bytes.map_or(Err(DecodeError::InvalidBuffer), |b| self.decode(b))
    }

    /// Walk `bytes` linearly.
    ///
    /// Unknown encodings advance by 2 bytes; a truncated instruction at the
    /// end is reported once and ends the walk.
    pub fn iter<'a>(&self, bytes: &'a [u8]) -> DecodeIter<'a> {
        DecodeIter {
            decoder: *self,
            bytes,
            offset: 0,
            done: false,
        }
    }
}

/// Iterator returned by [`Decoder::iter`], yielding `(offset, result)`.
#[derive(Debug, Clone)]
pub struct DecodeIter<'a> {
    decoder: Decoder,
    bytes: &'a [u8],
    offset: usize,
    done: bool,
}

impl Iterator for DecodeIter<'_> {
    type Item = (usize, Result<DecodedInstruction, DecodeError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = self.bytes.get(self.offset..).filter(|r| !r.is_empty())?;
        let at = self.offset;
        let result = self.decoder.decode(rest);
        match &result {
            Ok(insn) => self.offset += usize::from(insn.len),
            Err(DecodeError::OutOfLength { .. }) => self.done = true,
            Err(_) => self.offset += 2,
        }
        Some((at, result))
    }
}

/// Decode the instruction at the start of `bytes` for `xlen`.
///
/// # Examples
///
/// ```rust
/// use rvcodec::{decode, Access, DecodedOperand, Mnemonic, Xlen};
///
/// // add x7, x15, x31
/// let insn = decode(&0x01F783B3u32.to_le_bytes(), Xlen::Rv32)?;
/// assert_eq!(insn.mnemonic, Mnemonic::Add);
/// assert_eq!(insn.operands()[0].access(), Some(Access::Write));
/// assert_eq!(insn.operands()[2].width(), Some(32));
/// # Ok::<(), rvcodec::DecodeError>(())
/// ```
pub fn decode(bytes: &[u8], xlen: Xlen) -> Result<DecodedInstruction, DecodeError> {
    Decoder::new(xlen).decode(bytes)
}
