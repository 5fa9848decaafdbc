use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dram_ecc_sim::gf::{field, GfElem};

fn bench_gf256_mul(c: &mut Criterion) {
    let f = field(8).unwrap();
    let a = GfElem::from_index(&f, 17);
    let b = GfElem::from_index(&f, 200);

    c.bench_function("gf256_mul", |bencher| {
        bencher.iter(|| black_box(&a).mul(black_box(&b)));
    });
}

fn bench_gf256_div(c: &mut Criterion) {
    let f = field(8).unwrap();
    let a = GfElem::from_index(&f, 17);
    let b = GfElem::from_index(&f, 200);

    c.bench_function("gf256_div", |bencher| {
        bencher.iter(|| black_box(&a).div(black_box(&b)));
    });
}

criterion_group!(benches, bench_gf256_mul, bench_gf256_div);
criterion_main!(benches);
