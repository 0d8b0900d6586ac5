//! Encoder integration tests: exact words per extension, pseudo-instruction
//! equivalence, and the auto-compress policy.

use rvcodec::regs::*;
use rvcodec::{
    csr, decode, Access, Assembler, AssemblerConfig, AtomicOrdering, DecodedOperand, Decoder,
    EncodeError, FenceSet, Lmul, Mnemonic, RoundingMode, Sew, VectorMask, Vtype, Xlen,
};

// ─── Helpers ────────────────────────────────────────────────────────────────

type Emit = fn(&mut Assembler) -> Result<(), EncodeError>;

fn emit(xlen: Xlen, f: impl FnOnce(&mut Assembler) -> Result<(), EncodeError>) -> Vec<u8> {
    let mut asm = Assembler::new(xlen);
    f(&mut asm).unwrap();
    asm.finish().unwrap().into_bytes()
}

fn emit_compressed(
    xlen: Xlen,
    f: impl FnOnce(&mut Assembler) -> Result<(), EncodeError>,
) -> Vec<u8> {
    let mut asm = Assembler::new(xlen);
    asm.auto_compress(true);
    f(&mut asm).unwrap();
    asm.finish().unwrap().into_bytes()
}

fn words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn word(xlen: Xlen, f: impl FnOnce(&mut Assembler) -> Result<(), EncodeError>) -> u32 {
    let bytes = emit(xlen, f);
    assert_eq!(bytes.len(), 4, "expected a single 32-bit word");
    words(&bytes)[0]
}

// ─── Exact encodings ────────────────────────────────────────────────────────

#[test]
fn base_integer_words() {
    assert_eq!(word(Xlen::Rv64, |a| a.add(RA, SP, GP)), 0x003100B3);
    assert_eq!(word(Xlen::Rv64, |a| a.sub(A0, A1, A2)), 0x40C58533);
    assert_eq!(word(Xlen::Rv64, |a| a.addi(A0, A1, -1)), 0xFFF58513);
    assert_eq!(word(Xlen::Rv64, |a| a.lui(A0, 0x12345)), 0x12345537);
    assert_eq!(word(Xlen::Rv64, |a| a.lw(A0, SP, 8)), 0x00812503);
    assert_eq!(word(Xlen::Rv64, |a| a.sd(RA, SP, 8)), 0x00113423);
    assert_eq!(word(Xlen::Rv64, |a| a.ecall()), 0x00000073);
    assert_eq!(word(Xlen::Rv64, |a| a.ebreak()), 0x00100073);
}

#[test]
fn extension_words() {
    assert_eq!(word(Xlen::Rv64, |a| a.mul(A0, A1, A2)), 0x02C58533);
    assert_eq!(
        word(Xlen::Rv64, |a| a.lr_w(A0, A1, AtomicOrdering::Relaxed)),
        0x1005A52F
    );
    assert_eq!(
        word(Xlen::Rv64, |a| a.fadd_s(FA0, FA1, FA2, RoundingMode::Dyn)),
        0x00C5F553
    );
    assert_eq!(word(Xlen::Rv64, |a| a.csrrs(A0, csr::FFLAGS, ZERO)), 0x00102573);
    assert_eq!(word(Xlen::Rv64, |a| a.fence(FenceSet::RW, FenceSet::RW)), 0x0330000F);
    assert_eq!(word(Xlen::Rv64, |a| a.fence_i()), 0x0000100F);
    let vt = Vtype::new(Sew::E32, Lmul::M1, true, true);
    assert_eq!(word(Xlen::Rv64, |a| a.vsetvli(T0, A0, vt)), 0x0D0572D7);
    assert_eq!(
        word(Xlen::Rv64, |a| a.vadd_vv(V1, V2, V3, VectorMask::Unmasked)),
        0x022180D7
    );
}

// ─── Pseudo-instruction equivalence ─────────────────────────────────────────

#[test]
fn pseudo_branches_swap_operands() {
    let pseudo = emit(Xlen::Rv64, |a| a.bgt(A0, A1, 16));
    let base = emit(Xlen::Rv64, |a| a.blt(A1, A0, 16));
    assert_eq!(pseudo, base);

    let pseudo = emit(Xlen::Rv64, |a| a.bleu(A0, A1, -8));
    let base = emit(Xlen::Rv64, |a| a.bgeu(A1, A0, -8));
    assert_eq!(pseudo, base);

    let pseudo = emit(Xlen::Rv64, |a| a.bgtz(A0, 8));
    let base = emit(Xlen::Rv64, |a| a.blt(ZERO, A0, 8));
    assert_eq!(pseudo, base);
}

#[test]
fn pseudo_arithmetic() {
    let cases: [(Emit, Emit); 7] = [
        (|a| a.mv(A0, A1), |a| a.addi(A0, A1, 0)),
        (|a| a.not(A0, A1), |a| a.xori(A0, A1, -1)),
        (|a| a.neg(A0, A1), |a| a.sub(A0, ZERO, A1)),
        (|a| a.seqz(A0, A1), |a| a.sltiu(A0, A1, 1)),
        (|a| a.snez(A0, A1), |a| a.sltu(A0, ZERO, A1)),
        (|a| a.sext_w(A0, A1), |a| a.addiw(A0, A1, 0)),
        (|a| a.nop(), |a| a.addi(ZERO, ZERO, 0)),
    ];
    for (pseudo, base) in cases {
        assert_eq!(emit(Xlen::Rv64, pseudo), emit(Xlen::Rv64, base));
    }
}

#[test]
fn pseudo_jumps() {
    assert_eq!(emit(Xlen::Rv64, |a| a.ret()), emit(Xlen::Rv64, |a| a.jalr(ZERO, RA, 0)));
    assert_eq!(emit(Xlen::Rv64, |a| a.j(64)), emit(Xlen::Rv64, |a| a.jal(ZERO, 64)));
    assert_eq!(emit(Xlen::Rv64, |a| a.jr(T0)), emit(Xlen::Rv64, |a| a.jalr(ZERO, T0, 0)));
    assert_eq!(
        emit(Xlen::Rv64, |a| a.csrr(A0, csr::CYCLE)),
        emit(Xlen::Rv64, |a| a.csrrs(A0, csr::CYCLE, ZERO))
    );
}

// ─── Validation ─────────────────────────────────────────────────────────────

#[test]
fn failed_emit_writes_nothing() {
    let mut asm = Assembler::new(Xlen::Rv32);
    asm.nop().unwrap();
    assert!(matches!(
        asm.addi(A0, A0, 4096),
        Err(EncodeError::ImmediateOverflow { min: -2048, max: 2047, .. })
    ));
    assert!(matches!(
        asm.ld(A0, SP, 0),
        Err(EncodeError::UnsupportedInstruction { xlen: Xlen::Rv32, .. })
    ));
    assert!(matches!(asm.slli(A0, A0, 32), Err(EncodeError::ImmediateOverflow { .. })));
    assert!(asm.beq(A0, A1, 3).is_err());
    assert_eq!(asm.offset(), 4);
}

#[test]
fn code_size_limit() {
    let mut asm = Assembler::with_config(AssemblerConfig {
        max_code_bytes: 8,
        ..AssemblerConfig::default()
    });
    asm.nop().unwrap();
    asm.nop().unwrap();
    assert!(matches!(asm.nop(), Err(EncodeError::CodeSizeLimit { limit: 8 })));
    assert_eq!(asm.offset(), 8);
}

#[test]
fn li_materializes_wide_constants() {
    for value in [0i64, 1, -1, 2047, -2048, 0x12345, 0x7FFF_FFFF, -0x8000_0000] {
        let bytes = emit(Xlen::Rv32, |a| a.li(A0, value));
        assert!(bytes.len() <= 8, "li {value:#x} took {} bytes", bytes.len());
    }
    let bytes = emit(Xlen::Rv64, |a| a.li(A0, 0x1234_5678_9ABC_DEF0));
    assert!(bytes.len() <= 32);
    let decoder = Decoder::new(Xlen::Rv64);
    for (offset, insn) in decoder.iter(&bytes) {
        let insn = insn.unwrap();
        assert!(
            matches!(
                insn.operand(0),
                Some(DecodedOperand::Gpr { reg, access: Access::Write, .. }) if *reg == A0
            ),
            "instruction at {offset}"
        );
    }

    let mut asm = Assembler::new(Xlen::Rv32);
    assert!(asm.li(A0, 1 << 40).is_err());
    assert_eq!(asm.offset(), 0);
}

// ─── Auto-compress ──────────────────────────────────────────────────────────

#[test]
fn auto_compress_preserves_semantics() {
    let cases: [Emit; 14] = [
        |a| a.addi(A0, A0, 5),
        |a| a.addi(A0, ZERO, -3),
        |a| a.addi(SP, SP, -64),
        |a| a.addi(S1, SP, 16),
        |a| a.add(A0, A0, A1),
        |a| a.add(A0, ZERO, A1),
        |a| a.sub(S0, S0, A5),
        |a| a.lw(A2, A3, 12),
        |a| a.sd(RA, SP, 24),
        |a| a.ld(S0, SP, 16),
        |a| a.slli(T1, T1, 7),
        |a| a.lui(A4, 3),
        |a| a.ret(),
        |a| a.ebreak(),
    ];
    for (i, case) in cases.iter().enumerate() {
        let full = emit(Xlen::Rv64, *case);
        let small = emit_compressed(Xlen::Rv64, *case);
        assert_eq!(small.len(), 2, "case {i} did not compress");
        let f = decode(&full, Xlen::Rv64).unwrap();
        let c = decode(&small, Xlen::Rv64).unwrap();
        assert!(c.is_compressed());
        assert_eq!(c.mnemonic.expanded(), f.mnemonic, "case {i}");
        assert_eq!(c.operands(), f.operands(), "case {i}");
    }
}

#[test]
fn auto_compress_falls_back_to_full_width() {
    let cases: [Emit; 6] = [
        // immediate 0 with compact registers
        |a| a.addi(S0, S0, 0),
        // immediate out of CI range
        |a| a.addi(A0, A0, 100),
        // non-compact base register
        |a| a.lw(T0, T1, 4),
        // rd != rs1
        |a| a.sub(A0, A1, A2),
        // lui into sp
        |a| a.lui(SP, 1),
        // misaligned stack offset
        |a| a.sd(RA, SP, 4),
    ];
    for (i, case) in cases.iter().enumerate() {
        let bytes = emit_compressed(Xlen::Rv64, *case);
        assert_eq!(bytes, emit(Xlen::Rv64, *case), "case {i}");
        assert_eq!(bytes.len(), 4, "case {i}");
    }
}

#[test]
fn addi_zero_with_compact_registers_stays_full_width() {
    let bytes = emit_compressed(Xlen::Rv32, |a| a.addi(A0, A1, 0));
    assert_eq!(bytes.len(), 4);
    let insn = decode(&bytes, Xlen::Rv32).unwrap();
    assert_eq!(insn.mnemonic, Mnemonic::Addi);
    assert!(!insn.is_compressed());
}

#[test]
fn explicit_compressed_forms() {
    let bytes = emit(Xlen::Rv64, |a| {
        a.c_li(A0, 1)?;
        a.c_addi16sp(-16)?;
        a.c_sdsp(RA, 8)?;
        a.c_jr(RA)
    });
    let halves: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(halves, vec![0x4505, 0x717D, 0xE406, 0x8082]);

    let mut asm = Assembler::new(Xlen::Rv64);
    assert!(matches!(asm.c_lw(T0, A0, 0), Err(EncodeError::InvalidOperands { .. })));
    assert!(matches!(asm.c_jal(4), Err(EncodeError::UnsupportedInstruction { .. })));
    assert_eq!(asm.offset(), 0);
}
