#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rvcodec::{Assembler, Gpr, Label, Xlen};

#[derive(Debug, Arbitrary)]
enum Op {
    Addi { rd: u8, rs1: u8, imm: i16 },
    Add { rd: u8, rs1: u8, rs2: u8 },
    Lw { rd: u8, base: u8, offset: i16 },
    Sd { rs2: u8, base: u8, offset: i16 },
    Li { rd: u8, imm: i64 },
    Lui { rd: u8, imm: i32 },
    Branch { rs1: u8, label: u8 },
    Jump { label: u8 },
    Call { label: u8 },
    Bind { label: u8 },
    Literal { rd: u8, value: u64 },
}

#[derive(Debug, Arbitrary)]
struct Program {
    rv64: bool,
    auto_compress: bool,
    ops: Vec<Op>,
}

fn gpr(n: u8) -> Gpr {
    Gpr::new(n & 31)
}

fuzz_target!(|program: Program| {
    let xlen = if program.rv64 { Xlen::Rv64 } else { Xlen::Rv32 };
    let mut asm = Assembler::new(xlen);
    asm.auto_compress(program.auto_compress);
    let labels: Vec<Label> = (0..8).map(|_| asm.new_label()).collect();
    let label = |n: u8| labels[usize::from(n) % labels.len()];

    for op in program.ops {
        let before = asm.bytes().to_vec();
        let result = match op {
            Op::Addi { rd, rs1, imm } => asm.addi(gpr(rd), gpr(rs1), i32::from(imm)),
            Op::Add { rd, rs1, rs2 } => asm.add(gpr(rd), gpr(rs1), gpr(rs2)),
            Op::Lw { rd, base, offset } => asm.lw(gpr(rd), gpr(base), i32::from(offset)),
            Op::Sd { rs2, base, offset } => asm.sd(gpr(rs2), gpr(base), i32::from(offset)),
            Op::Li { rd, imm } => asm.li(gpr(rd), imm),
            Op::Lui { rd, imm } => asm.lui(gpr(rd), imm),
            Op::Branch { rs1, label: l } => asm.bnez(gpr(rs1), label(l)),
            Op::Jump { label: l } => asm.j(label(l)),
            Op::Call { label: l } => asm.call(label(l)),
            Op::Bind { label: l } => asm.bind(label(l)),
            Op::Literal { rd, value } => {
                let lit = asm.new_literal(value);
                asm.load_literal(gpr(rd), lit)
            }
        };
        // A rejected call never changes the buffer.
        if result.is_err() {
            assert_eq!(asm.bytes(), &before[..]);
        }
    }
    let _ = asm.finish();
});
