//! Forward references: labels, literals, and backpatching.
//!
//! A reference to an unbound target is emitted with a zero offset and its
//! site recorded in the target's pending set. Binding the target classifies
//! every pending site by the instruction found there, validates the final
//! displacement against that format's reach, and only then rewrites the
//! immediates in place. A failed bind leaves the buffer and the target
//! untouched.

use alloc::collections::BTreeSet;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::buffer::CodeBuffer;
use crate::error::EncodeError;
use crate::format::{
    self, bits, extract, pack, ImmShape, C_OP_Q1, OP_AUIPC, OP_BRANCH, OP_JAL, OP_JALR, OP_IMM,
    OP_LOAD, OP_LOAD_FP,
};

/// Handle to a code location that may not be known yet.
///
/// Handles are cheap `Copy` indices into the owning assembler's label
/// table; using one with a different assembler is reported as
/// [`EncodeError::UnknownLabel`] when the index is out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub(crate) usize);

impl Label {
    /// Index of the label in its assembler.
    pub const fn id(self) -> usize {
        self.0
    }
}

/// Handle to a constant placed in the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal(pub(crate) usize);

impl Literal {
    /// Index of the literal in its assembler.
    pub const fn id(self) -> usize {
        self.0
    }
}

/// Constant payload of a [`Literal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LiteralValue {
    /// 8-byte value (integers, `f64` bit patterns).
    U64(u64),
    /// 16-byte value.
    U128(u128),
}

impl LiteralValue {
    /// Size in bytes, which is also the placement alignment.
    pub const fn size(self) -> usize {
        match self {
            LiteralValue::U64(_) => 8,
            LiteralValue::U128(_) => 16,
        }
    }

    fn write_to(self, buf: &mut CodeBuffer) {
        match self {
            LiteralValue::U64(v) => buf.emit_bytes(&v.to_le_bytes()),
            LiteralValue::U128(v) => buf.emit_bytes(&v.to_le_bytes()),
        }
    }
}

impl From<u64> for LiteralValue {
    fn from(v: u64) -> Self {
        LiteralValue::U64(v)
    }
}

impl From<u128> for LiteralValue {
    fn from(v: u128) -> Self {
        LiteralValue::U128(v)
    }
}

impl From<f64> for LiteralValue {
    fn from(v: f64) -> Self {
        LiteralValue::U64(v.to_bits())
    }
}

/// Lifecycle of a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LabelState {
    Unbound { pending: BTreeSet<usize> },
    Bound { location: usize },
}

/// Lifecycle of a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LiteralState {
    Unplaced {
        pending: BTreeSet<usize>,
        value: LiteralValue,
    },
    Placed {
        location: usize,
        value: LiteralValue,
    },
}

/// Instruction form found at a reference site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SiteKind {
    /// B-type conditional branch.
    Branch,
    /// J-type `jal`.
    Jal,
    /// `auipc` followed by an I-type instruction consuming the low 12 bits.
    AuipcPair,
    /// `c.beqz` / `c.bnez`.
    CBranch,
    /// `c.j` / `c.jal`.
    CJump,
}

impl SiteKind {
    /// Inclusive displacement range reachable from this site.
    pub(crate) const fn range(self) -> (i64, i64) {
        match self {
            SiteKind::Branch => ImmShape::B.range(),
            SiteKind::Jal => ImmShape::J.range(),
            // hi20 = (disp + 0x800) >> 12 must be a signed 20-bit value.
            SiteKind::AuipcPair => (-(1i64 << 31) - 0x800, (1i64 << 31) - 0x801),
            SiteKind::CBranch => ImmShape::Cb.range(),
            SiteKind::CJump => ImmShape::Cj.range(),
        }
    }

    const fn align(self) -> i64 {
        match self {
            SiteKind::AuipcPair => 1,
            _ => 2,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            SiteKind::Branch => "branch",
            SiteKind::Jal => "jal",
            SiteKind::AuipcPair => "auipc",
            SiteKind::CBranch => "c.beqz/c.bnez",
            SiteKind::CJump => "c.j",
        }
    }

    /// Check that `disp` is reachable from `site` with this form.
    pub(crate) fn check(self, site: usize, disp: i64) -> Result<(), EncodeError> {
        let (min, max) = self.range();
        if disp < min || disp > max {
            return Err(EncodeError::BranchOutOfRange {
                site,
                disp,
                min,
                max,
            });
        }
        if disp % self.align() != 0 {
            return Err(EncodeError::MisalignedImmediate {
                mnemonic: self.name().to_string(),
                value: disp,
                align: self.align(),
            });
        }
        Ok(())
    }
}

/// Split a PC-relative displacement into `auipc` and I-type halves.
#[inline]
pub(crate) const fn split_hi_lo(disp: i64) -> (i64, i64) {
    let hi = (disp + 0x800) >> 12;
    (hi, disp - (hi << 12))
}

/// One rewrite, computed before any byte is touched.
#[derive(Debug, Clone, Copy)]
enum Patch {
    Half(usize, u16),
    Word(usize, u32),
    Pair(usize, u32, u32),
}

impl Patch {
    fn site(self) -> usize {
        match self {
            Patch::Half(at, _) | Patch::Word(at, _) | Patch::Pair(at, _, _) => at,
        }
    }

    /// Sites were read during planning, so the writes stay in bounds.
    fn apply(self, buf: &mut CodeBuffer) -> Result<(), EncodeError> {
        let written = match self {
            Patch::Half(at, hw) => buf.write_u16_at(at, hw),
            Patch::Word(at, w) => buf.write_u32_at(at, w),
            Patch::Pair(at, hi, lo) => buf
                .write_u32_at(at, hi)
                .and_then(|()| buf.write_u32_at(at + 4, lo)),
        };
        written.ok_or(EncodeError::CorruptReferenceSite {
            site: self.site(),
            word: 0,
        })
    }
}

/// Classify the instruction at `site`.
fn classify(buf: &CodeBuffer, site: usize) -> Result<(SiteKind, u32), EncodeError> {
    let corrupt = |word: u32| EncodeError::CorruptReferenceSite { site, word };
    let first = buf.read_u16_at(site).ok_or(corrupt(0))?;
    if !format::is_full_width(first) {
        let hw = u32::from(first);
        let kind = match (bits(hw, 1, 0) as u16, bits(hw, 15, 13)) {
            (C_OP_Q1, 0b110 | 0b111) => SiteKind::CBranch,
            (C_OP_Q1, 0b101 | 0b001) => SiteKind::CJump,
            _ => return Err(corrupt(hw)),
        };
        return Ok((kind, hw));
    }
    let word = buf.read_u32_at(site).ok_or(corrupt(u32::from(first)))?;
    let kind = match bits(word, 6, 0) {
        OP_BRANCH => SiteKind::Branch,
        OP_JAL => SiteKind::Jal,
        OP_AUIPC => {
            let lo = buf.read_u32_at(site + 4).ok_or(corrupt(word))?;
            match bits(lo, 6, 0) {
                OP_JALR | OP_IMM | OP_LOAD | OP_LOAD_FP => SiteKind::AuipcPair,
                _ => return Err(corrupt(lo)),
            }
        }
        _ => return Err(corrupt(word)),
    };
    Ok((kind, word))
}

/// Compute the rewrite for one site once its target is known.
fn plan(buf: &CodeBuffer, site: usize, location: usize) -> Result<Patch, EncodeError> {
    let (kind, word) = classify(buf, site)?;
    let disp = location as i64 - site as i64;
    kind.check(site, disp)?;
    let patch = match kind {
        SiteKind::Branch => {
            Patch::Word(site, (word & !ImmShape::B.mask()) | pack(ImmShape::B, disp))
        }
        SiteKind::Jal => Patch::Word(site, (word & !ImmShape::J.mask()) | pack(ImmShape::J, disp)),
        SiteKind::CBranch => Patch::Half(
            site,
            ((word & !ImmShape::Cb.mask()) | pack(ImmShape::Cb, disp)) as u16,
        ),
        SiteKind::CJump => Patch::Half(
            site,
            ((word & !ImmShape::Cj.mask()) | pack(ImmShape::Cj, disp)) as u16,
        ),
        SiteKind::AuipcPair => {
            let (hi, lo) = split_hi_lo(disp);
            let lo_word = buf
                .read_u32_at(site + 4)
                .ok_or(EncodeError::CorruptReferenceSite { site, word })?;
            Patch::Pair(
                site,
                (word & !ImmShape::U.mask()) | pack(ImmShape::U, hi),
                (lo_word & !ImmShape::I.mask()) | pack(ImmShape::I, lo),
            )
        }
    };
    Ok(patch)
}

/// Validate every site, then rewrite them all.
fn resolve_sites(
    buf: &mut CodeBuffer,
    sites: &BTreeSet<usize>,
    location: usize,
) -> Result<(), EncodeError> {
    let patches = sites
        .iter()
        .map(|&site| plan(buf, site, location))
        .collect::<Result<Vec<_>, _>>()?;
    for patch in patches {
        log::trace!("backpatch {:?} -> {:#x}", patch, location);
        patch.apply(buf)?;
    }
    Ok(())
}

/// Arena of label and literal states owned by an assembler.
#[derive(Debug, Clone, Default)]
pub(crate) struct LabelTable {
    labels: Vec<LabelState>,
    literals: Vec<LiteralState>,
}

impl LabelTable {
    pub(crate) fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len());
        self.labels.push(LabelState::Unbound {
            pending: BTreeSet::new(),
        });
        log::trace!("new label #{}", label.0);
        label
    }

    pub(crate) fn new_literal(&mut self, value: LiteralValue) -> Literal {
        let literal = Literal(self.literals.len());
        self.literals.push(LiteralState::Unplaced {
            pending: BTreeSet::new(),
            value,
        });
        log::trace!("new literal #{} = {:?}", literal.0, value);
        literal
    }

    pub(crate) fn label_count(&self) -> usize {
        self.labels.len()
    }

    fn label_state(&self, label: Label) -> Result<&LabelState, EncodeError> {
        self.labels
            .get(label.0)
            .ok_or(EncodeError::UnknownLabel { label: label.0 })
    }

    fn literal_state(&self, literal: Literal) -> Result<&LiteralState, EncodeError> {
        self.literals
            .get(literal.0)
            .ok_or(EncodeError::UnknownLiteral { literal: literal.0 })
    }

    /// Bound location of `label`, `None` while unbound.
    pub(crate) fn label_location(&self, label: Label) -> Result<Option<usize>, EncodeError> {
        Ok(match self.label_state(label)? {
            LabelState::Bound { location } => Some(*location),
            LabelState::Unbound { .. } => None,
        })
    }

    /// Placed location of `literal`, `None` while unplaced.
    pub(crate) fn literal_location(&self, literal: Literal) -> Result<Option<usize>, EncodeError> {
        Ok(match self.literal_state(literal)? {
            LiteralState::Placed { location, .. } => Some(*location),
            LiteralState::Unplaced { .. } => None,
        })
    }

    /// Payload size of `literal`.
    pub(crate) fn literal_size(&self, literal: Literal) -> Result<usize, EncodeError> {
        Ok(match self.literal_state(literal)? {
            LiteralState::Unplaced { value, .. } | LiteralState::Placed { value, .. } => {
                value.size()
            }
        })
    }

    /// Record `site` as waiting for `label`.
    pub(crate) fn add_label_ref(&mut self, label: Label, site: usize) -> Result<(), EncodeError> {
        match self.labels.get_mut(label.0) {
            Some(LabelState::Unbound { pending }) => {
                pending.insert(site);
                log::trace!("label #{} referenced at {:#x}", label.0, site);
                Ok(())
            }
            // Callers encode bound targets directly.
            Some(LabelState::Bound { .. }) => Ok(()),
            None => Err(EncodeError::UnknownLabel { label: label.0 }),
        }
    }

    /// Record `site` as waiting for `literal`.
    pub(crate) fn add_literal_ref(
        &mut self,
        literal: Literal,
        site: usize,
    ) -> Result<(), EncodeError> {
        match self.literals.get_mut(literal.0) {
            Some(LiteralState::Unplaced { pending, .. }) => {
                pending.insert(site);
                log::trace!("literal #{} referenced at {:#x}", literal.0, site);
                Ok(())
            }
            Some(LiteralState::Placed { .. }) => Ok(()),
            None => Err(EncodeError::UnknownLiteral {
                literal: literal.0,
            }),
        }
    }

    /// Bind `label` to `location` and backpatch its pending sites.
    pub(crate) fn bind(
        &mut self,
        label: Label,
        location: usize,
        buf: &mut CodeBuffer,
    ) -> Result<(), EncodeError> {
        let pending = match self.label_state(label)? {
            LabelState::Bound { location: first } => {
                return Err(EncodeError::LabelAlreadyBound {
                    label: label.0,
                    location: *first,
                })
            }
            LabelState::Unbound { pending } => pending,
        };
        resolve_sites(buf, pending, location)?;
        log::trace!(
            "bound label #{} at {:#x} ({} site(s) patched)",
            label.0,
            location,
            pending.len()
        );
        self.labels[label.0] = LabelState::Bound { location };
        Ok(())
    }

    /// Append `literal`'s bytes at its natural alignment and backpatch its
    /// pending sites. Returns the placement offset.
    pub(crate) fn place(
        &mut self,
        literal: Literal,
        buf: &mut CodeBuffer,
    ) -> Result<usize, EncodeError> {
        let (pending, value) = match self.literal_state(literal)? {
            LiteralState::Placed { location, .. } => {
                return Err(EncodeError::LiteralAlreadyPlaced {
                    literal: literal.0,
                    location: *location,
                })
            }
            LiteralState::Unplaced { pending, value } => (pending, *value),
        };
        let align = value.size();
        let location = buf.offset().div_ceil(align) * align;
        let patches = pending
            .iter()
            .map(|&site| plan(buf, site, location))
            .collect::<Result<Vec<_>, _>>()?;
        buf.align_to(align, 0);
        value.write_to(buf);
        for patch in patches {
            patch.apply(buf)?;
        }
        log::trace!(
            "placed literal #{} at {:#x} ({} site(s) patched)",
            literal.0,
            location,
            pending.len()
        );
        self.literals[literal.0] = LiteralState::Placed { location, value };
        Ok(location)
    }

    /// Literals that have references but no placement yet.
    pub(crate) fn pending_literals(&self) -> Vec<Literal> {
        self.literals
            .iter()
            .enumerate()
            .filter_map(|(i, state)| match state {
                LiteralState::Unplaced { pending, .. } if !pending.is_empty() => Some(Literal(i)),
                _ => None,
            })
            .collect()
    }

    /// One error per target that still has unresolved sites.
    pub(crate) fn unresolved(&self) -> Vec<EncodeError> {
        let labels = self.labels.iter().enumerate().filter_map(|(i, s)| match s {
            LabelState::Unbound { pending } if !pending.is_empty() => {
                Some(EncodeError::UnresolvedLabel {
                    label: i,
                    sites: pending.len(),
                })
            }
            _ => None,
        });
        let literals = self.literals.iter().enumerate().filter_map(|(i, s)| match s {
            LiteralState::Unplaced { pending, .. } if !pending.is_empty() => {
                Some(EncodeError::UnresolvedLiteral {
                    literal: i,
                    sites: pending.len(),
                })
            }
            _ => None,
        });
        labels.chain(literals).collect()
    }

    /// Forget every pending site. Used once the owner has reported them.
    pub(crate) fn clear_pending(&mut self) {
        for state in &mut self.labels {
            if let LabelState::Unbound { pending } = state {
                pending.clear();
            }
        }
        for state in &mut self.literals {
            if let LiteralState::Unplaced { pending, .. } = state {
                pending.clear();
            }
        }
    }

    /// Bound locations of every label, `None` for unbound ones.
    pub(crate) fn locations(&self) -> Vec<Option<usize>> {
        self.labels
            .iter()
            .map(|s| match s {
                LabelState::Bound { location } => Some(*location),
                LabelState::Unbound { .. } => None,
            })
            .collect()
    }
}

/// Displacement currently encoded at a reference site.
///
/// Returns `None` when the site does not hold a label reference form.
pub fn site_displacement(bytes: &[u8], site: usize) -> Option<i64> {
    let mut buf = CodeBuffer::with_capacity(bytes.len());
    buf.emit_bytes(bytes);
    let (kind, word) = classify(&buf, site).ok()?;
    Some(match kind {
        SiteKind::Branch => extract(ImmShape::B, word),
        SiteKind::Jal => extract(ImmShape::J, word),
        SiteKind::CBranch => extract(ImmShape::Cb, word),
        SiteKind::CJump => extract(ImmShape::Cj, word),
        SiteKind::AuipcPair => {
            let hi = format::sign_extend(bits(word, 31, 12), 20);
            let lo = extract(ImmShape::I, buf.read_u32_at(site + 4)?);
            (hi << 12) + lo
        }
    })
}
