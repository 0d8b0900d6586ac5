//! Label and literal resolution through the public assembler API.

use rvcodec::label::site_displacement;
use rvcodec::regs::*;
use rvcodec::{
    decode, extract, Assembler, DecodedOperand, EncodeError, ImmShape, Mnemonic, Xlen,
};

fn word_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

// ─── Forward references ─────────────────────────────────────────────────────

#[test]
fn forward_branch_is_patched_on_bind() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let target = asm.new_label();
    asm.beq(A0, A1, target).unwrap();
    assert_eq!(extract(ImmShape::B, word_at(asm.bytes(), 0)), 0);

    asm.bind_at(target, 1024).unwrap();
    assert_eq!(extract(ImmShape::B, word_at(asm.bytes(), 0)), 1024);
    assert_eq!(asm.label_location(target).unwrap(), Some(1024));

    let insn = decode(asm.bytes(), Xlen::Rv64).unwrap();
    assert_eq!(insn.mnemonic, Mnemonic::Beq);
    assert_eq!(insn.operand(2), Some(&DecodedOperand::Imm(1024)));
}

#[test]
fn out_of_range_bind_leaves_everything_untouched() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let target = asm.new_label();
    asm.beq(A0, A1, target).unwrap();
    asm.bnez(A2, target).unwrap();
    let before = asm.bytes().to_vec();

    let err = asm.bind_at(target, 8192).unwrap_err();
    assert!(matches!(
        err,
        EncodeError::BranchOutOfRange { site: 0, disp: 8192, min: -4096, max: 4094 }
    ));
    assert_eq!(asm.bytes(), &before[..]);
    assert_eq!(asm.label_location(target).unwrap(), None);

    // The label is still open and can be bound somewhere reachable.
    asm.bind_at(target, 1024).unwrap();
    assert_eq!(extract(ImmShape::B, word_at(asm.bytes(), 0)), 1024);
    assert_eq!(extract(ImmShape::B, word_at(asm.bytes(), 4)), 1020);
}

#[test]
fn one_bad_site_blocks_every_patch() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let target = asm.new_label();
    asm.jal(RA, target).unwrap();
    asm.beq(A0, ZERO, target).unwrap();
    let before = asm.bytes().to_vec();

    // Reachable from the jal, not from the branch at offset 4.
    assert!(matches!(
        asm.bind_at(target, 8192),
        Err(EncodeError::BranchOutOfRange { site: 4, .. })
    ));
    assert_eq!(asm.bytes(), &before[..]);
    asm.bind_at(target, 2048).unwrap();
    assert_eq!(site_displacement(asm.bytes(), 0), Some(2048));
    assert_eq!(site_displacement(asm.bytes(), 4), Some(2044));
}

#[test]
fn bind_is_exactly_once() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let label = asm.new_label();
    asm.nop().unwrap();
    asm.bind(label).unwrap();
    asm.nop().unwrap();
    assert!(matches!(
        asm.bind(label),
        Err(EncodeError::LabelAlreadyBound { location: 4, .. })
    ));
    assert_eq!(asm.label_location(label).unwrap(), Some(4));
}

#[test]
fn labels_from_another_assembler_are_rejected() {
    let mut other = Assembler::new(Xlen::Rv64);
    other.new_label();
    let foreign = other.new_label();

    let mut asm = Assembler::new(Xlen::Rv64);
    assert!(matches!(asm.j(foreign), Err(EncodeError::UnknownLabel { label: 1 })));
    assert!(matches!(asm.bind(foreign), Err(EncodeError::UnknownLabel { .. })));
    assert_eq!(asm.offset(), 0);
}

// ─── Backward references ────────────────────────────────────────────────────

#[test]
fn backward_references_are_encoded_directly() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let top = asm.new_label();
    asm.bind(top).unwrap();
    asm.addi(A0, A0, -1).unwrap();
    asm.bnez(A0, top).unwrap();
    asm.j(top).unwrap();
    let code = asm.finish().unwrap();

    assert_eq!(site_displacement(code.bytes(), 4), Some(-4));
    assert_eq!(site_displacement(code.bytes(), 8), Some(-8));
    assert_eq!(code.label_location(top), Some(0));
}

#[test]
fn backward_reference_out_of_range_fails_at_emit() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let top = asm.new_label();
    asm.bind(top).unwrap();
    for _ in 0..1025 {
        asm.nop().unwrap();
    }
    let at = asm.offset();
    assert!(matches!(
        asm.beqz(A0, top),
        Err(EncodeError::BranchOutOfRange { disp: -4100, .. })
    ));
    assert_eq!(asm.offset(), at);
}

// ─── auipc pairs ────────────────────────────────────────────────────────────

#[test]
fn call_and_la_split_into_hi_lo() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let func = asm.new_label();
    let data = asm.new_label();
    asm.call(func).unwrap();
    asm.la(A0, data).unwrap();
    asm.bind_at(func, 0x1_2800).unwrap();
    asm.bind_at(data, 0x7F0).unwrap();
    let bytes = asm.bytes().to_vec();

    assert_eq!(site_displacement(&bytes, 0), Some(0x1_2800));
    assert_eq!(site_displacement(&bytes, 8), Some(0x7F0 - 8));

    // lo is sign-extended, so hi rounds up when bit 11 is set.
    let auipc = decode(&bytes[0..4], Xlen::Rv64).unwrap();
    assert_eq!(auipc.mnemonic, Mnemonic::Auipc);
    assert_eq!(auipc.operand(1), Some(&DecodedOperand::Imm(0x13)));
    let jalr = decode(&bytes[4..8], Xlen::Rv64).unwrap();
    assert_eq!(jalr.mnemonic, Mnemonic::Jalr);
    assert_eq!(jalr.operand(2), Some(&DecodedOperand::Imm(-0x800)));
}

#[test]
fn tail_uses_t1_scratch() {
    let mut asm = Assembler::new(Xlen::Rv32);
    let target = asm.new_label();
    asm.tail(target).unwrap();
    asm.bind(target).unwrap();
    let bytes = asm.finish().unwrap().into_bytes();
    assert_eq!(site_displacement(&bytes, 0), Some(8));
    let jalr = decode(&bytes[4..], Xlen::Rv32).unwrap();
    assert_eq!(jalr.operand(1).and_then(|op| op.width()), Some(32));
    assert!(matches!(
        jalr.operand(0),
        Some(DecodedOperand::Gpr { reg, .. }) if *reg == ZERO
    ));
}

// ─── Compressed sites ───────────────────────────────────────────────────────

#[test]
fn compressed_branch_has_its_own_range() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let near = asm.new_label();
    let far = asm.new_label();
    asm.c_beqz(A0, near).unwrap();
    asm.c_beqz(A1, far).unwrap();
    asm.c_j(far).unwrap();
    asm.bind_at(near, 254).unwrap();

    assert!(matches!(
        asm.bind_at(far, 258),
        Err(EncodeError::BranchOutOfRange { site: 2, min: -256, max: 254, .. })
    ));
    asm.bind_at(far, 200).unwrap();
    let code = asm.finish().unwrap();
    assert_eq!(code.len(), 6);
    assert_eq!(site_displacement(code.bytes(), 0), Some(254));
    assert_eq!(site_displacement(code.bytes(), 2), Some(198));
    assert_eq!(site_displacement(code.bytes(), 4), Some(196));
}

// ─── Literals ───────────────────────────────────────────────────────────────

#[test]
fn literal_is_placed_aligned_and_loaded() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let lit = asm.new_literal(0xDEAD_BEEF_CAFE_F00Du64);
    asm.load_literal(A0, lit).unwrap();
    asm.ret().unwrap();
    asm.nop().unwrap();
    assert_eq!(asm.literal_location(lit).unwrap(), None);

    let at = asm.place_literal(lit).unwrap();
    assert_eq!(at, 16);
    assert_eq!(asm.literal_location(lit).unwrap(), Some(16));
    let bytes = asm.finish().unwrap().into_bytes();
    assert_eq!(&bytes[16..24], &0xDEAD_BEEF_CAFE_F00Du64.to_le_bytes());
    assert_eq!(site_displacement(&bytes, 0), Some(16));

    let load = decode(&bytes[4..8], Xlen::Rv64).unwrap();
    assert_eq!(load.mnemonic, Mnemonic::Ld);
}

#[test]
fn placement_pads_to_literal_size() {
    let mut asm = Assembler::new(Xlen::Rv32);
    let wide = asm.new_literal(1u128 << 100);
    asm.load_literal(T0, wide).unwrap();
    asm.c_nop().unwrap();
    assert_eq!(asm.place_literal(wide).unwrap(), 16);
    assert_eq!(asm.offset(), 32);
    assert!(asm.bytes()[10..16].iter().all(|&b| b == 0));
    let load = decode(&asm.bytes()[4..8], Xlen::Rv32).unwrap();
    assert_eq!(load.mnemonic, Mnemonic::Lw);
}

#[test]
fn literal_placed_once() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let lit = asm.new_literal(2.5f64);
    asm.place_literal(lit).unwrap();
    assert!(matches!(
        asm.place_literal(lit),
        Err(EncodeError::LiteralAlreadyPlaced { location: 0, .. })
    ));
    // Loads after placement resolve immediately.
    asm.load_literal(A2, lit).unwrap();
    assert_eq!(site_displacement(asm.bytes(), 8), Some(-8));
}

#[test]
fn finish_places_referenced_literals() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let used = asm.new_literal(7u64);
    let unused = asm.new_literal(9u64);
    asm.load_literal(A1, used).unwrap();
    let code = asm.finish().unwrap();
    assert_eq!(code.len(), 16);
    assert_eq!(&code.bytes()[8..16], &7u64.to_le_bytes());
    let _ = unused;
}

// ─── finish ─────────────────────────────────────────────────────────────────

#[test]
fn finish_reports_unbound_labels() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let missing = asm.new_label();
    let unused = asm.new_label();
    asm.j(missing).unwrap();
    asm.beqz(A0, missing).unwrap();
    let _ = unused;
    assert!(matches!(
        asm.finish(),
        Err(EncodeError::UnresolvedLabel { label: 0, sites: 2 })
    ));
}

#[test]
fn finish_collects_several_failures() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let a = asm.new_label();
    let b = asm.new_label();
    asm.j(a).unwrap();
    asm.j(b).unwrap();
    match asm.finish() {
        Err(EncodeError::Multiple { errors }) => {
            assert_eq!(errors.len(), 2);
            assert!(errors
                .iter()
                .all(|e| matches!(e, EncodeError::UnresolvedLabel { sites: 1, .. })));
        }
        other => panic!("expected Multiple, got {other:?}"),
    }
}

#[test]
fn assembled_reports_bound_labels() {
    let mut asm = Assembler::new(Xlen::Rv32);
    let entry = asm.new_label();
    let exit = asm.new_label();
    let never = asm.new_label();
    asm.bind(entry).unwrap();
    asm.j(exit).unwrap();
    asm.nop().unwrap();
    asm.bind(exit).unwrap();
    asm.ret().unwrap();
    let code = asm.finish().unwrap();
    assert_eq!(code.label_location(entry), Some(0));
    assert_eq!(code.label_location(exit), Some(8));
    assert_eq!(code.label_location(never), None);
    assert_eq!(site_displacement(code.bytes(), 0), Some(8));
}

// ─── Dropping without finish ────────────────────────────────────────────────

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "unresolved reference")]
fn dropping_with_pending_reference_panics() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let target = asm.new_label();
    asm.beqz(A0, target).unwrap();
    drop(asm);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "unresolved reference")]
fn dropping_with_pending_literal_panics() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let lit = asm.new_literal(3u64);
    asm.load_literal(A0, lit).unwrap();
    drop(asm);
}

#[test]
fn dropping_resolved_or_unreferenced_targets_is_quiet() {
    let mut asm = Assembler::new(Xlen::Rv64);
    let bound = asm.new_label();
    let _unused = asm.new_label();
    let _unused_literal = asm.new_literal(1u64);
    asm.j(bound).unwrap();
    asm.bind(bound).unwrap();
    drop(asm);

    // A failed finish has already reported its sites.
    let mut asm = Assembler::new(Xlen::Rv64);
    let missing = asm.new_label();
    asm.j(missing).unwrap();
    assert!(asm.finish().is_err());
}
