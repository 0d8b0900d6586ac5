//! Performance benchmarks for `rvcodec`.
//!
//! Measures:
//! - Single instruction encode latency
//! - Straight-line encode throughput, with and without auto-compress
//! - Label-heavy workloads (forward branches backpatched on bind)
//! - Decode throughput over mixed 16/32-bit streams
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use rvcodec::regs::*;
use rvcodec::{decode, Assembler, Decoder, RoundingMode, Xlen};

// ─── Single-Instruction Latency ──────────────────────────────────────────────

fn bench_single_instruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_instruction");

    group.bench_function("add", |b| {
        b.iter(|| {
            let mut asm = Assembler::new(Xlen::Rv64);
            asm.add(black_box(A0), black_box(A1), black_box(A2)).unwrap();
            asm.finish().unwrap()
        })
    });

    group.bench_function("li_64bit", |b| {
        b.iter(|| {
            let mut asm = Assembler::new(Xlen::Rv64);
            asm.li(A0, black_box(0x1234_5678_9ABC_DEF0)).unwrap();
            asm.finish().unwrap()
        })
    });

    group.bench_function("fmadd_d", |b| {
        b.iter(|| {
            let mut asm = Assembler::new(Xlen::Rv64);
            asm.fmadd_d(FA0, FA1, FA2, FA3, black_box(RoundingMode::Dyn))
                .unwrap();
            asm.finish().unwrap()
        })
    });

    group.bench_function("decode_add", |b| {
        let word = 0x00C58533u32.to_le_bytes();
        b.iter(|| decode(black_box(&word), Xlen::Rv64).unwrap())
    });

    group.bench_function("decode_c_lwsp", |b| {
        let half = 0x4502u16.to_le_bytes();
        b.iter(|| decode(black_box(&half), Xlen::Rv64).unwrap())
    });

    group.finish();
}

// ─── Encode Throughput ───────────────────────────────────────────────────────

/// A small function body: prologue, arithmetic and memory traffic, epilogue.
fn emit_body(asm: &mut Assembler) {
    asm.addi(SP, SP, -48).unwrap();
    asm.sd(RA, SP, 40).unwrap();
    asm.sd(S0, SP, 32).unwrap();
    asm.mv(S0, A0).unwrap();
    asm.ld(A1, S0, 8).unwrap();
    asm.add(A0, A0, A1).unwrap();
    asm.mul(A0, A0, A1).unwrap();
    asm.slli(A0, A0, 3).unwrap();
    asm.sw(A0, S0, 16).unwrap();
    asm.ld(S0, SP, 32).unwrap();
    asm.ld(RA, SP, 40).unwrap();
    asm.addi(SP, SP, 48).unwrap();
    asm.ret().unwrap();
}

fn bench_encode_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_throughput");
    const BODIES: usize = 500;

    for (name, compress) in [("full_width", false), ("auto_compress", true)] {
        let mut probe = Assembler::new(Xlen::Rv64);
        probe.auto_compress(compress);
        for _ in 0..BODIES {
            emit_body(&mut probe);
        }
        group.throughput(Throughput::Bytes(probe.offset() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut asm = Assembler::new(Xlen::Rv64);
                asm.auto_compress(compress);
                for _ in 0..BODIES {
                    emit_body(&mut asm);
                }
                asm.finish().unwrap()
            })
        });
    }

    group.finish();
}

// ─── Label-Heavy Workloads ───────────────────────────────────────────────────

fn emit_label_chain(n: usize) -> usize {
    let mut asm = Assembler::new(Xlen::Rv64);
    let labels: Vec<_> = (0..n).map(|_| asm.new_label()).collect();
    for (i, &label) in labels.iter().enumerate() {
        asm.addi(A0, A0, 1).unwrap();
        asm.bnez(A0, label).unwrap();
        if i % 2 == 1 {
            asm.bind(labels[i - 1]).unwrap();
            asm.bind(label).unwrap();
        }
    }
    if n % 2 == 1 {
        asm.bind(labels[n - 1]).unwrap();
    }
    asm.finish().unwrap().len()
}

fn bench_labels(c: &mut Criterion) {
    let mut group = c.benchmark_group("labels");

    for n in [50usize, 200, 1000] {
        group.bench_function(format!("{n}_forward_branches"), |b| {
            b.iter(|| emit_label_chain(black_box(n)))
        });
    }

    group.bench_function("literal_pool_100", |b| {
        b.iter(|| {
            let mut asm = Assembler::new(Xlen::Rv64);
            for i in 0..100u64 {
                let lit = asm.new_literal(black_box(i << 40));
                asm.load_literal(A0, lit).unwrap();
            }
            asm.finish().unwrap()
        })
    });

    group.finish();
}

// ─── Decode Throughput ───────────────────────────────────────────────────────

fn bench_decode_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_throughput");

    for (name, compress) in [("full_width", false), ("mixed_width", true)] {
        let mut asm = Assembler::new(Xlen::Rv64);
        asm.auto_compress(compress);
        for _ in 0..500 {
            emit_body(&mut asm);
        }
        let code = asm.finish().unwrap();
        let decoder = Decoder::new(Xlen::Rv64);

        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                decoder
                    .iter(black_box(code.bytes()))
                    .filter(|(_, insn)| insn.is_ok())
                    .count()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_instruction,
    bench_encode_throughput,
    bench_labels,
    bench_decode_throughput,
);

criterion_main!(benches);
