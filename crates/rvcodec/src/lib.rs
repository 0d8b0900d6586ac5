//! # rvcodec: RISC-V machine-code encoder and decoder
//!
//! `rvcodec` emits and classifies RISC-V instruction words at runtime:
//! RV32I/RV64I plus the M, A, F, D, C, Zicsr and Zifencei extensions and a
//! subset of V.
//!
//! ## Quick Start
//!
//! ```rust
//! use rvcodec::regs::*;
//! use rvcodec::{decode, Assembler, Mnemonic, Xlen};
//!
//! let mut asm = Assembler::new(Xlen::Rv64);
//! let done = asm.new_label();
//! asm.beqz(A0, done)?;
//! asm.addi(A0, A0, -1)?;
//! asm.bind(done)?;
//! asm.ret()?;
//! let code = asm.finish()?;
//!
//! let first = decode(code.bytes(), Xlen::Rv64)?;
//! assert_eq!(first.mnemonic, Mnemonic::Beq);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - **Validated emission**: every immediate and register class is checked
//!   before a byte is written; a failed call leaves the buffer untouched.
//! - **Labels and literals**: forward references are backpatched when the
//!   target is bound, after every pending site has been range-checked.
//! - **Auto-compress**: optional rewrite of eligible words to 16-bit forms.
//! - **Table-driven decoder**: typed operands with width and access tags.
//! - **`no_std` + `alloc`**: the `std` feature only adds `std::error::Error`.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
// Instruction encoding narrows and reinterprets integer widths constantly
// (i64→u32 immediates, u32→u16 halfwords) and writes dense hex literals.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unreadable_literal,
    clippy::match_same_arms,
    clippy::redundant_closure_for_method_calls,
    clippy::bool_to_int_with_if,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::needless_raw_string_hashes,
    clippy::semicolon_if_nothing_returned,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::similar_names,
    clippy::fn_params_excessive_bools,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    clippy::single_match_else,
    clippy::manual_let_else,
    clippy::unnecessary_wraps,
    clippy::unused_self,
    clippy::map_unwrap_or,
    clippy::many_single_char_names,
    clippy::redundant_else,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

extern crate alloc;

/// Public assembler API: configuration, labels, literals, `finish`.
pub mod assembler;
/// A extension emitters.
mod atomic;
/// RV32I/RV64I, M, Zicsr and Zifencei emitters and pseudo-instructions.
mod base;
/// Growable little-endian code buffer.
pub mod buffer;
/// C extension emitters and the auto-compress rewrite.
mod compressed;
mod decode_compressed;
/// The 32-bit `(mask, value)` decode table.
pub mod decode_table;
/// Decoder entry points and the decoded-instruction record.
pub mod decoder;
/// Error types.
pub mod error;
/// F and D extension emitters.
mod float;
/// Immediate shapes, pack/extract, and word builders.
pub mod format;
/// Registers, architecture width, and instruction modifiers.
pub mod ir;
/// Labels, literals, and backpatching.
pub mod label;
/// Mnemonics and extension tags.
pub mod mnemonic;
/// V extension emitters.
mod vector;

// Re-exports
pub use assembler::{Assembled, Assembler, AssemblerConfig, BranchTarget};
pub use buffer::CodeBuffer;
pub use decoder::{
    decode, Access, Attributes, DecodeIter, DecodedInstruction, DecodedOperand, Decoder,
    MAX_OPERANDS,
};
pub use error::{DecodeError, EncodeError};
pub use format::{extract, pack, ImmShape};
pub use ir::{
    csr, regs, AtomicOrdering, FenceSet, Fpr, Gpr, Lmul, RegKind, Register, RoundingMode, Sew,
    VectorMask, Vr, Vtype, Xlen,
};
pub use label::{Label, Literal, LiteralValue};
pub use mnemonic::{Extension, Mnemonic};

/// Rewrite a 32-bit word to its 16-bit equivalent, if one exists for `xlen`.
///
/// This is the same rewrite [`AssemblerConfig::auto_compress`] applies.
///
/// ```rust
/// use rvcodec::{compress, Xlen};
///
/// // addi a0, x0, 1 -> c.li a0, 1
/// assert_eq!(compress(0x0010_0513, Xlen::Rv64), Some(0x4505));
/// // addi s0, s0, 0 has no compressed form
/// assert_eq!(compress(0x0004_0413, Xlen::Rv64), None);
/// ```
pub fn compress(word: u32, xlen: Xlen) -> Option<u16> {
    compressed::try_compress(word, xlen)
}
