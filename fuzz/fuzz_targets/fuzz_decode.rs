#![no_main]
use libfuzzer_sys::fuzz_target;
use rvcodec::{compress, decode, Decoder, Xlen};

fuzz_target!(|data: &[u8]| {
    for xlen in [Xlen::Rv32, Xlen::Rv64] {
        let _ = decode(data, xlen);
        for (offset, insn) in Decoder::new(xlen).iter(data) {
            let Ok(insn) = insn else { continue };
            assert!(offset + usize::from(insn.len) <= data.len());
            let _ = insn.to_string();

            // A word the compressor rewrites must decode to the same thing.
            if insn.len == 4 {
                if let Some(half) = compress(insn.raw, xlen) {
                    let small = decode(&half.to_le_bytes(), xlen).unwrap();
                    assert_eq!(small.mnemonic.expanded(), insn.mnemonic);
                    assert_eq!(small.operands(), insn.operands());
                }
            }
        }
    }
});
