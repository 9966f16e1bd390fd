use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use math::dft::ftt::FttTables;
use math::nbtheory::root_of_unity;

fn ftt_forward(c: &mut Criterion) {
    let q: u64 = 0x1fffffffffe00001u64;
    let mut group = c.benchmark_group("ftt_forward");

    for log_n in 10..15 {
        let m: usize = 1 << (log_n + 1);
        let n: usize = 1 << log_n;
        let root: u64 = root_of_unity(m, &q).unwrap();
        let tables: FttTables<u64> = FttTables::new();
        tables.precompute(&root, m, &q).unwrap();

        let a: Vec<u64> = (0..n as u64).collect();
        let id: BenchmarkId = BenchmarkId::new("q=61bit", format!("n={}", n));
        group.bench_with_input(id, &(), |b, _| {
            b.iter(|| tables.forward(&a, &root, m, &q).unwrap())
        });
    }
    group.finish();
}

fn ftt_inverse(c: &mut Criterion) {
    let q: u64 = 0x1fffffffffe00001u64;
    let mut group = c.benchmark_group("ftt_inverse");

    for log_n in 10..15 {
        let m: usize = 1 << (log_n + 1);
        let n: usize = 1 << log_n;
        let root: u64 = root_of_unity(m, &q).unwrap();
        let tables: FttTables<u64> = FttTables::new();
        tables.precompute(&root, m, &q).unwrap();

        let a: Vec<u64> = (0..n as u64).collect();
        let id: BenchmarkId = BenchmarkId::new("q=61bit", format!("n={}", n));
        group.bench_with_input(id, &(), |b, _| {
            b.iter(|| tables.inverse(&a, &root, m, &q).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, ftt_forward, ftt_inverse);
criterion_main!(benches);
