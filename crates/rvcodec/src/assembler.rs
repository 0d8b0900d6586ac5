//! Public assembler API: configuration, labels and literals, and the shared
//! emit path every instruction goes through.
//!
//! The per-extension instruction methods live in the `base`, `atomic`,
//! `float`, `compressed` and `vector` modules; they are all inherent
//! methods of [`Assembler`].

use alloc::string::ToString;
use alloc::vec::Vec;

use crate::buffer::CodeBuffer;
use crate::compressed;
use crate::error::EncodeError;
use crate::format::{i_type, u_type, ImmShape, OP_AUIPC};
use crate::ir::{Gpr, Xlen};
use crate::label::{split_hi_lo, Label, LabelTable, Literal, LiteralValue, SiteKind};
use crate::mnemonic::Mnemonic;

/// Encoder configuration.
///
/// # Examples
///
/// ```rust
/// use rvcodec::{Assembler, AssemblerConfig, Xlen};
///
/// let asm = Assembler::with_config(AssemblerConfig {
///     xlen: Xlen::Rv32,
///     auto_compress: true,
///     max_code_bytes: 4096,
/// });
/// assert_eq!(asm.xlen(), Xlen::Rv32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblerConfig {
    /// Target register width. Default: RV64.
    pub xlen: Xlen,
    /// Rewrite eligible instructions to their 16-bit forms. Default: off.
    pub auto_compress: bool,
    /// Maximum output size in bytes. Default: 16 MiB.
    pub max_code_bytes: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            xlen: Xlen::Rv64,
            auto_compress: false,
            max_code_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Target of a PC-relative control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTarget {
    /// A label, bound now or later.
    Label(Label),
    /// A byte displacement relative to the instruction itself.
    Offset(i32),
}

impl From<Label> for BranchTarget {
    fn from(label: Label) -> Self {
        BranchTarget::Label(label)
    }
}

impl From<i32> for BranchTarget {
    fn from(offset: i32) -> Self {
        BranchTarget::Offset(offset)
    }
}

/// Where a reference points once the label table has been consulted.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resolved {
    /// Displacement is known and already validated for the site form.
    Known(i64),
    /// Label is unbound; encode zero and record the site.
    Pending(Label),
}

/// The result of a successful [`Assembler::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[must_use]
pub struct Assembled {
    bytes: Vec<u8>,
    labels: Vec<Option<usize>>,
}

impl Assembled {
    /// The machine code.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume and return the machine code.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Byte count.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Final location of `label`, `None` if it was never bound.
    pub fn label_location(&self, label: Label) -> Option<usize> {
        self.labels.get(label.id()).copied().flatten()
    }
}

/// Instruction encoder writing into an owned [`CodeBuffer`].
///
/// Dropping an assembler whose labels or literals still have pending
/// references logs an error and, in debug builds, panics. Resolve them, or
/// let [`Assembler::finish`] report them.
///
/// # Examples
///
/// ```rust
/// use rvcodec::{Assembler, Xlen};
/// use rvcodec::regs::*;
///
/// let mut asm = Assembler::new(Xlen::Rv64);
/// let top = asm.new_label();
/// asm.bind(top)?;
/// asm.addi(A0, A0, -1)?;
/// asm.bnez(A0, top)?;
/// asm.ret()?;
/// let code = asm.finish()?;
/// assert_eq!(code.len(), 12);
/// # Ok::<(), rvcodec::EncodeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Assembler {
    config: AssemblerConfig,
    buf: CodeBuffer,
    labels: LabelTable,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::with_config(AssemblerConfig::default())
    }
}

impl Assembler {
    /// Create an assembler for `xlen` with default settings.
    pub fn new(xlen: Xlen) -> Self {
        Self::with_config(AssemblerConfig {
            xlen,
            ..AssemblerConfig::default()
        })
    }

    /// Create an assembler from a full configuration.
    pub fn with_config(config: AssemblerConfig) -> Self {
        if config.xlen == Xlen::Rv128 {
            log::debug!("RV128 requested; encoding with RV64 instruction availability");
        }
        Self {
            config,
            buf: CodeBuffer::new(),
            labels: LabelTable::default(),
        }
    }

    /// Replace the configuration.
    pub fn config(&mut self, config: AssemblerConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Enable or disable automatic compression.
    pub fn auto_compress(&mut self, enabled: bool) -> &mut Self {
        self.config.auto_compress = enabled;
        self
    }

    /// Current configuration.
    pub fn current_config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Configured register width.
    pub fn xlen(&self) -> Xlen {
        self.config.xlen
    }

    /// Width used for instruction availability and shift ranges.
    pub(crate) fn isa_xlen(&self) -> Xlen {
        match self.config.xlen {
            Xlen::Rv128 => Xlen::Rv64,
            other => other,
        }
    }

    /// Offset the next instruction will be written at.
    pub fn offset(&self) -> usize {
        self.buf.offset()
    }

    /// Bytes emitted so far, including provisional encodings.
    pub fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &CodeBuffer {
        &self.buf
    }

    // ── Raw output ───────────────────────────────────────────

    pub(crate) fn ensure_room(&self, n: usize) -> Result<(), EncodeError> {
        if self.buf.len().saturating_add(n) > self.config.max_code_bytes {
            return Err(EncodeError::CodeSizeLimit {
                limit: self.config.max_code_bytes,
            });
        }
        Ok(())
    }

    /// Append a 32-bit word exactly as given.
    pub(crate) fn put32(&mut self, word: u32) -> Result<(), EncodeError> {
        self.ensure_room(4)?;
        self.buf.emit32(word);
        Ok(())
    }

    /// Append a 16-bit word exactly as given.
    pub(crate) fn put16(&mut self, hw: u16) -> Result<(), EncodeError> {
        self.ensure_room(2)?;
        self.buf.emit16(hw);
        Ok(())
    }

    /// Append a 32-bit instruction, narrowing it when auto-compress is on
    /// and a 16-bit equivalent exists.
    pub(crate) fn emit_word(&mut self, word: u32) -> Result<(), EncodeError> {
        if self.config.auto_compress {
            if let Some(hw) = compressed::try_compress(word, self.isa_xlen()) {
                log::trace!("compressed {:#010x} -> {:#06x}", word, hw);
                return self.put16(hw);
            }
        }
        self.put32(word)
    }

    /// Append raw data bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.ensure_room(bytes.len())?;
        self.buf.emit_bytes(bytes);
        Ok(())
    }

    // ── Validation helpers ───────────────────────────────────

    /// Fail unless `m` exists at the configured width.
    pub(crate) fn require(&self, m: Mnemonic) -> Result<(), EncodeError> {
        if m.available(self.isa_xlen()) {
            Ok(())
        } else {
            Err(EncodeError::UnsupportedInstruction {
                mnemonic: m.as_str().to_string(),
                xlen: self.config.xlen,
            })
        }
    }

    /// Consult the label table for a control-transfer target.
    pub(crate) fn resolve(
        &self,
        m: Mnemonic,
        kind: SiteKind,
        shape: ImmShape,
        target: BranchTarget,
    ) -> Result<Resolved, EncodeError> {
        match target {
            BranchTarget::Offset(off) => {
                check_imm(m, shape, i64::from(off))?;
                Ok(Resolved::Known(i64::from(off)))
            }
            BranchTarget::Label(label) => match self.labels.label_location(label)? {
                Some(location) => {
                    let site = self.offset();
                    let disp = location as i64 - site as i64;
                    kind.check(site, disp)?;
                    Ok(Resolved::Known(disp))
                }
                None => Ok(Resolved::Pending(label)),
            },
        }
    }

    /// Emit a label-referencing instruction whose immediate is `build(disp)`.
    ///
    /// Known displacements go through the compressing path when `narrow`
    /// is set; pending ones are written full width with a zero offset.
    pub(crate) fn emit_pc_relative(
        &mut self,
        resolved: Resolved,
        narrow: bool,
        build: impl Fn(i64) -> u32,
    ) -> Result<(), EncodeError> {
        match resolved {
            Resolved::Known(disp) if narrow => self.emit_word(build(disp)),
            Resolved::Known(disp) => self.put32(build(disp)),
            Resolved::Pending(label) => {
                let site = self.offset();
                self.put32(build(0))?;
                self.labels.add_label_ref(label, site)
            }
        }
    }

    /// Same as [`Self::emit_pc_relative`] for 16-bit forms.
    pub(crate) fn emit_pc_relative16(
        &mut self,
        resolved: Resolved,
        build: impl Fn(i64) -> u16,
    ) -> Result<(), EncodeError> {
        match resolved {
            Resolved::Known(disp) => self.put16(build(disp)),
            Resolved::Pending(label) => {
                let site = self.offset();
                self.put16(build(0))?;
                self.labels.add_label_ref(label, site)
            }
        }
    }

    /// Emit `auipc rd, hi` followed by `lo_word(lo)`, where the pair reaches
    /// `target`.
    pub(crate) fn emit_auipc_pair(
        &mut self,
        target: AuipcTarget,
        rd: Gpr,
        lo_word: impl Fn(i64) -> u32,
    ) -> Result<(), EncodeError> {
        let site = self.offset();
        let location = match target {
            AuipcTarget::Label(label) => self.labels.label_location(label)?,
            AuipcTarget::Literal(literal) => self.labels.literal_location(literal)?,
        };
        let disp = match location {
            Some(location) => {
                let disp = location as i64 - site as i64;
                SiteKind::AuipcPair.check(site, disp)?;
                disp
            }
            None => 0,
        };
        self.ensure_room(8)?;
        let (hi, lo) = split_hi_lo(disp);
        self.buf.emit32(u_type(OP_AUIPC, rd.num(), hi));
        self.buf.emit32(lo_word(lo));
        if location.is_none() {
            match target {
                AuipcTarget::Label(label) => self.labels.add_label_ref(label, site)?,
                AuipcTarget::Literal(literal) => self.labels.add_literal_ref(literal, site)?,
            }
        }
        Ok(())
    }

    // ── Labels ───────────────────────────────────────────────

    /// Create a new unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.new_label()
    }

    /// Bind `label` to the current offset and patch every pending reference.
    ///
    /// # Errors
    ///
    /// [`EncodeError::LabelAlreadyBound`] on a second bind, or
    /// [`EncodeError::BranchOutOfRange`] if a pending reference cannot reach
    /// the current offset. Nothing is modified on error.
    pub fn bind(&mut self, label: Label) -> Result<(), EncodeError> {
        let here = self.buf.offset();
        self.labels.bind(label, here, &mut self.buf)
    }

    /// Bind `label` to an explicit offset.
    pub fn bind_at(&mut self, label: Label, location: usize) -> Result<(), EncodeError> {
        self.labels.bind(label, location, &mut self.buf)
    }

    /// Bound location of `label`, `None` while unbound.
    pub fn label_location(&self, label: Label) -> Result<Option<usize>, EncodeError> {
        self.labels.label_location(label)
    }

    // ── Literals ─────────────────────────────────────────────

    /// Create a literal holding `value`. Nothing is emitted until it is
    /// placed.
    pub fn new_literal(&mut self, value: impl Into<LiteralValue>) -> Literal {
        self.labels.new_literal(value.into())
    }

    /// Append `literal` at the current offset (aligned to its size) and
    /// patch every pending load of it. Returns the placement offset.
    pub fn place_literal(&mut self, literal: Literal) -> Result<usize, EncodeError> {
        let size = self.labels.literal_size(literal)?;
        let start = self.buf.offset();
        let aligned = start.div_ceil(size) * size;
        self.ensure_room(aligned - start + size)?;
        self.labels.place(literal, &mut self.buf)
    }

    /// Place every literal that has been referenced but not yet placed.
    pub fn place_pending_literals(&mut self) -> Result<(), EncodeError> {
        for literal in self.labels.pending_literals() {
            self.place_literal(literal)?;
        }
        Ok(())
    }

    /// Placed location of `literal`, `None` while unplaced.
    pub fn literal_location(&self, literal: Literal) -> Result<Option<usize>, EncodeError> {
        self.labels.literal_location(literal)
    }

    /// `auipc rd, hi; ld rd, lo(rd)` (RV64) or `lw` (RV32) loading `literal`.
    pub fn load_literal(&mut self, rd: Gpr, literal: Literal) -> Result<(), EncodeError> {
        let (m, funct3) = if self.isa_xlen().has_rv64() {
            (Mnemonic::Ld, 0b011)
        } else {
            (Mnemonic::Lw, 0b010)
        };
        self.require(m)?;
        self.emit_auipc_pair(AuipcTarget::Literal(literal), rd, |lo| {
            i_type(crate::format::OP_LOAD, rd.num(), funct3, rd.num(), lo)
        })
    }

    // ── Finish ───────────────────────────────────────────────

    /// Flush pending literals, check that every reference was resolved, and
    /// return the code.
    ///
    /// # Errors
    ///
    /// [`EncodeError::UnresolvedLabel`] for each label still referenced but
    /// never bound (collected into [`EncodeError::Multiple`] when there is
    /// more than one).
    pub fn finish(mut self) -> Result<Assembled, EncodeError> {
        let placed = self.place_pending_literals();
        let mut errors = self.labels.unresolved();
        self.labels.clear_pending();
        placed?;
        match errors.len() {
            0 => {}
            1 => return Err(errors.remove(0)),
            _ => return Err(EncodeError::Multiple { errors }),
        }
        log::debug!(
            "finished: {} bytes, {} labels",
            self.buf.len(),
            self.labels.label_count()
        );
        Ok(Assembled {
            labels: self.labels.locations(),
            bytes: core::mem::take(&mut self.buf).into_bytes(),
        })
    }
}

impl Drop for Assembler {
    fn drop(&mut self) {
        let unresolved = self.labels.unresolved();
        for err in &unresolved {
            log::error!("assembler dropped before finish: {}", err);
        }
        #[cfg(feature = "std")]
        debug_assert!(
            std::thread::panicking() || unresolved.is_empty(),
            "assembler dropped with {} unresolved reference target(s)",
            unresolved.len()
        );
    }
}

/// Target of an `auipc` pair.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AuipcTarget {
    Label(Label),
    Literal(Literal),
}

/// Check `value` against `shape`, reporting range before alignment.
pub(crate) fn check_imm(m: Mnemonic, shape: ImmShape, value: i64) -> Result<(), EncodeError> {
    let (min, max) = shape.range();
    if value < min || value > max {
        return Err(EncodeError::ImmediateOverflow {
            mnemonic: m.as_str().to_string(),
            value,
            min,
            max,
        });
    }
    if value % shape.align() != 0 {
        return Err(EncodeError::MisalignedImmediate {
            mnemonic: m.as_str().to_string(),
            value,
            align: shape.align(),
        });
    }
    Ok(())
}

/// Build an [`EncodeError::InvalidOperands`].
pub(crate) fn invalid(m: Mnemonic, detail: &str) -> EncodeError {
    EncodeError::InvalidOperands {
        mnemonic: m.as_str().to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::*;

    #[test]
    fn default_config() {
        let cfg = AssemblerConfig::default();
        assert_eq!(cfg.xlen, Xlen::Rv64);
        assert!(!cfg.auto_compress);
        assert_eq!(cfg.max_code_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn builder_setters() {
        let mut asm = Assembler::new(Xlen::Rv32);
        asm.auto_compress(true);
        assert!(asm.current_config().auto_compress);
        asm.config(AssemblerConfig::default());
        assert_eq!(asm.xlen(), Xlen::Rv64);
    }

    #[test]
    fn code_size_limit() {
        let mut asm = Assembler::with_config(AssemblerConfig {
            max_code_bytes: 6,
            ..AssemblerConfig::default()
        });
        asm.nop().unwrap();
        assert_eq!(asm.nop(), Err(EncodeError::CodeSizeLimit { limit: 6 }));
        assert_eq!(asm.offset(), 4);
    }

    #[test]
    fn rv128_encodes_as_rv64() {
        let mut asm = Assembler::new(Xlen::Rv128);
        asm.ld(A0, SP, 8).unwrap();
        assert_eq!(asm.offset(), 4);
    }

    #[test]
    fn finish_reports_unbound_labels() {
        let mut asm = Assembler::new(Xlen::Rv64);
        let a = asm.new_label();
        let b = asm.new_label();
        asm.j(a).unwrap();
        asm.j(b).unwrap();
        let err = asm.finish().unwrap_err();
        assert!(matches!(err, EncodeError::Multiple { ref errors } if errors.len() == 2));
    }

    #[test]
    fn finish_flushes_literals() {
        let mut asm = Assembler::new(Xlen::Rv64);
        let lit = asm.new_literal(0xDEAD_BEEF_u64);
        asm.load_literal(A0, lit).unwrap();
        asm.ret().unwrap();
        let out = asm.finish().unwrap();
        // auipc + ld + ret, padded to 16, then 8 data bytes.
        assert_eq!(out.len(), 24);
        assert_eq!(&out.bytes()[16..20], &0xDEAD_BEEF_u32.to_le_bytes());
    }

    #[test]
    fn unknown_label_handle_rejected_before_write() {
        let mut other = Assembler::new(Xlen::Rv64);
        let _ = other.new_label();
        let foreign = other.new_label();
        let mut asm = Assembler::new(Xlen::Rv64);
        assert_eq!(asm.j(foreign), Err(EncodeError::UnknownLabel { label: 1 }));
        assert_eq!(asm.offset(), 0);
    }
}
