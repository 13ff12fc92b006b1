use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dds_recover::ecc::c1::correct_block_pair;
use dds_recover::{Dclz, DecodeOptions};

fn bench_c1_repair(c: &mut Criterion) {
    let raw = hex::decode(concat!(
        "20aaaa000024131756940729193914d820aaaa000024131720aaaa0000241317",
        "20aaaa000024131756d40729193914d820aaaa0000241317abbbe79542da976d",
    ))
    .unwrap();
    let mut pair = [0u8; 64];
    pair.copy_from_slice(&raw);

    c.bench_function("c1_single_error_pair", |b| {
        b.iter(|| correct_block_pair(black_box(&pair), &[]))
    });
}

fn bench_dclz_literals(c: &mut Criterion) {
    // A dictionary reset followed by 4 KiB of 9-bit literal codewords.
    let mut data = vec![0x01, 0x00];
    let mut bits: u64 = 0;
    let mut nbits = 0;
    for i in 0..4096u32 {
        bits |= u64::from(8 + (i & 0xFF)) << nbits;
        nbits += 9;
        while nbits >= 8 {
            data.push((bits & 0xFF) as u8);
            bits >>= 8;
            nbits -= 8;
        }
    }

    c.bench_function("dclz_literals_4k", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(4096);
            Dclz::new(black_box(&data), &DecodeOptions::new())
                .expand(&mut out)
                .unwrap();
            out
        })
    });
}

criterion_group!(benches, bench_c1_repair, bench_dclz_literals);
criterion_main!(benches);
