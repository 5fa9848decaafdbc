use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dram_ecc_sim::codec::rs::Rs;
use dram_ecc_sim::codec::Codec;
use dram_ecc_sim::layout::EccWord;

fn bench_rs_decode_no_error(c: &mut Criterion) {
    let rs = Rs::new("QPC", 8, 72, 8, 4, 0).unwrap();
    let word = EccWord::new(rs.bit_n(), rs.bit_k());

    c.bench_function("rs_decode_no_error", |bencher| {
        bencher.iter(|| black_box(&rs).decode(black_box(&word)));
    });
}

fn bench_rs_decode_double_symbol_error(c: &mut Criterion) {
    let rs = Rs::new("QPC", 8, 72, 8, 4, 0).unwrap();
    let mut word = EccWord::new(rs.bit_n(), rs.bit_k());
    word.block.write_symbol(0, 8, 0x5A);
    word.block.write_symbol(10, 8, 0xA3);

    c.bench_function("rs_decode_double_symbol_error", |bencher| {
        bencher.iter(|| black_box(&rs).decode(black_box(&word)));
    });
}

criterion_group!(benches, bench_rs_decode_no_error, bench_rs_decode_double_symbol_error);
criterion_main!(benches);
