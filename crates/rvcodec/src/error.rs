//! Error types for encoding, label resolution, and decoding.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::ir::Xlen;

/// Encoding or label-resolution error.
///
/// Every variant describes a violated contract: the failing operation
/// returns immediately and leaves the output buffer untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeError {
    /// Instruction is not available for the configured architecture width.
    UnsupportedInstruction {
        /// The mnemonic that was requested.
        mnemonic: String,
        /// The configured width.
        xlen: Xlen,
    },

    /// Invalid operand combination for the instruction.
    InvalidOperands {
        /// The mnemonic being encoded.
        mnemonic: String,
        /// Description of why the operands are invalid.
        detail: String,
    },

    /// Immediate value exceeds the allowed range.
    ImmediateOverflow {
        /// The mnemonic being encoded.
        mnemonic: String,
        /// The immediate value that overflowed.
        value: i64,
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
    },

    /// Immediate value is not a multiple of the required alignment.
    MisalignedImmediate {
        /// The mnemonic being encoded.
        mnemonic: String,
        /// The misaligned value.
        value: i64,
        /// Required alignment in bytes.
        align: i64,
    },

    /// Label handle does not belong to this assembler.
    UnknownLabel {
        /// Label index.
        label: usize,
    },

    /// Literal handle does not belong to this assembler.
    UnknownLiteral {
        /// Literal index.
        literal: usize,
    },

    /// Label was bound more than once.
    LabelAlreadyBound {
        /// Label index.
        label: usize,
        /// Location of the first binding.
        location: usize,
    },

    /// Literal was placed more than once.
    LiteralAlreadyPlaced {
        /// Literal index.
        literal: usize,
        /// Location of the first placement.
        location: usize,
    },

    /// Referenced label was never bound.
    UnresolvedLabel {
        /// Label index.
        label: usize,
        /// Number of reference sites still waiting for the label.
        sites: usize,
    },

    /// Referenced literal was never placed.
    UnresolvedLiteral {
        /// Literal index.
        literal: usize,
        /// Number of reference sites still waiting for the literal.
        sites: usize,
    },

    /// Branch target is out of range for the encoding used at the site.
    BranchOutOfRange {
        /// Offset of the referencing instruction.
        site: usize,
        /// The actual displacement to the target.
        disp: i64,
        /// Minimum representable displacement.
        min: i64,
        /// Maximum representable displacement.
        max: i64,
    },

    /// A pending reference site no longer holds a patchable instruction.
    CorruptReferenceSite {
        /// Offset of the site.
        site: usize,
        /// The word found at the site.
        word: u32,
    },

    /// The output buffer would exceed the configured limit.
    CodeSizeLimit {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Multiple errors collected while finishing.
    Multiple {
        /// The collected errors.
        errors: Vec<EncodeError>,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnsupportedInstruction { mnemonic, xlen } => {
                write!(f, "'{}' is not available on {}", mnemonic, xlen)
            }
            EncodeError::InvalidOperands { mnemonic, detail } => {
                write!(f, "{}: invalid operand combination: {}", mnemonic, detail)
            }
            EncodeError::ImmediateOverflow {
                mnemonic,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "{}: immediate value {} out of range [{}..{}]",
                    mnemonic, value, min, max
                )
            }
            EncodeError::MisalignedImmediate {
                mnemonic,
                value,
                align,
            } => {
                write!(
                    f,
                    "{}: immediate value {} is not a multiple of {}",
                    mnemonic, value, align
                )
            }
            EncodeError::UnknownLabel { label } => {
                write!(f, "label #{} does not belong to this assembler", label)
            }
            EncodeError::UnknownLiteral { literal } => {
                write!(f, "literal #{} does not belong to this assembler", literal)
            }
            EncodeError::LabelAlreadyBound { label, location } => {
                write!(
                    f,
                    "label #{} is already bound (at offset {:#x})",
                    label, location
                )
            }
            EncodeError::LiteralAlreadyPlaced { literal, location } => {
                write!(
                    f,
                    "literal #{} is already placed (at offset {:#x})",
                    literal, location
                )
            }
            EncodeError::UnresolvedLabel { label, sites } => {
                write!(
                    f,
                    "label #{} is referenced by {} site(s) but was never bound",
                    label, sites
                )
            }
            EncodeError::UnresolvedLiteral { literal, sites } => {
                write!(
                    f,
                    "literal #{} is referenced by {} site(s) but was never placed",
                    literal, sites
                )
            }
            EncodeError::BranchOutOfRange {
                site,
                disp,
                min,
                max,
            } => {
                write!(
                    f,
                    "branch at offset {:#x} out of range (displacement={}, range=[{}..{}])",
                    site, disp, min, max
                )
            }
            EncodeError::CorruptReferenceSite { site, word } => {
                write!(
                    f,
                    "reference site at offset {:#x} holds {:#010x}, not a patchable instruction",
                    site, word
                )
            }
            EncodeError::CodeSizeLimit { limit } => {
                write!(f, "code size limit exceeded (limit: {} bytes)", limit)
            }
            EncodeError::Multiple { errors } => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Decode status for anything other than a successfully classified word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    /// No source buffer was supplied.
    InvalidBuffer,
    /// Fewer bytes are available than the instruction length requires.
    OutOfLength {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// The bit pattern does not correspond to any known instruction.
    UnknownInstruction {
        /// The raw instruction bits (zero-extended for 16-bit encodings).
        raw: u32,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidBuffer => write!(f, "invalid decode buffer"),
            DecodeError::OutOfLength { needed, available } => write!(
                f,
                "instruction needs {} bytes but only {} are available",
                needed, available
            ),
            DecodeError::UnknownInstruction { raw } => {
                write!(f, "unknown instruction {:#010x}", raw)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec;

    #[test]
    fn error_immediate_overflow_display() {
        let err = EncodeError::ImmediateOverflow {
            mnemonic: "addi".into(),
            value: 4096,
            min: -2048,
            max: 2047,
        };
        assert_eq!(
            format!("{}", err),
            "addi: immediate value 4096 out of range [-2048..2047]"
        );
    }

    #[test]
    fn error_unsupported_display() {
        let err = EncodeError::UnsupportedInstruction {
            mnemonic: "ld".into(),
            xlen: Xlen::Rv32,
        };
        assert_eq!(format!("{}", err), "'ld' is not available on RV32");
    }

    #[test]
    fn error_already_bound_display() {
        let err = EncodeError::LabelAlreadyBound {
            label: 3,
            location: 0x40,
        };
        assert_eq!(
            format!("{}", err),
            "label #3 is already bound (at offset 0x40)"
        );
    }

    #[test]
    fn error_branch_out_of_range_display() {
        let err = EncodeError::BranchOutOfRange {
            site: 0,
            disp: 8192,
            min: -4096,
            max: 4094,
        };
        assert_eq!(
            format!("{}", err),
            "branch at offset 0x0 out of range (displacement=8192, range=[-4096..4094])"
        );
    }

    #[test]
    fn error_multiple_display() {
        let err = EncodeError::Multiple {
            errors: vec![
                EncodeError::UnresolvedLabel { label: 0, sites: 1 },
                EncodeError::UnresolvedLabel { label: 1, sites: 2 },
            ],
        };
        let s = format!("{}", err);
        assert!(s.contains("label #0"));
        assert!(s.contains("label #1"));
        assert_eq!(s.lines().count(), 2);
    }

    #[test]
    fn decode_error_display() {
        assert_eq!(
            format!("{}", DecodeError::UnknownInstruction { raw: 0xFFFF_FFFF }),
            "unknown instruction 0xffffffff"
        );
        assert_eq!(
            format!(
                "{}",
                DecodeError::OutOfLength {
                    needed: 4,
                    available: 2
                }
            ),
            "instruction needs 4 bytes but only 2 are available"
        );
    }
}
