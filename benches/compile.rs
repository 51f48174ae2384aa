#![allow(unused)]
extern crate filterc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use filterc::{
    config::CompilerConfig,
    expr::Expr,
    ir::{InternalTable, Operator},
    FilterCompiler,
};
use std::hint::black_box;

const TEMPLATE: &str = "\
typedef struct { $xy_decls } xy_vars_t;
typedef struct { $y_decls } y_vars_t;
static void init_frame (xy_vars_t *xy_vars) { $xy_code }
static void init_column (xy_vars_t *xy_vars, y_vars_t *y_vars) { $y_code }
static void calc_row (xy_vars_t *xy_vars, y_vars_t *y_vars) { $x_decls $x_code $m }
";

/// A filter mixing `terms` sine waves over x, y and r, each behind a branch.
fn waves(terms: usize) -> Expr {
    let internals = InternalTable::standard();
    let axis = |name: &str| Expr::internal(internals.lookup(name).unwrap());
    let mut sum = Expr::assign("s", Expr::float(0.0));

    for i in 0..terms {
        let source = ["x", "y", "r"][i % 3];
        let wave = Expr::op(
            Operator::Sin,
            vec![Expr::op(
                Operator::Mul,
                vec![axis(source), Expr::float(i as f32 + 1.0)],
            )],
        );
        let add = Expr::assign(
            "s",
            Expr::op(Operator::Add, vec![Expr::var("s", 1), wave]),
        );
        let guard = Expr::op(Operator::Less, vec![axis("t"), Expr::float(i as f32)]);
        sum = Expr::seq(sum, Expr::if_else(guard, add, None));
    }

    let s = || Expr::var("s", 1);
    Expr::seq(sum, Expr::tuple(vec![s(), s(), s(), Expr::float(1.0)]))
}

/// Benchmark the whole translation for growing filters, with and without optimization.
fn bench_translate(c: &mut Criterion) {
    let optimized = FilterCompiler::default();
    let plain = FilterCompiler::new(CompilerConfig::unoptimized());

    let mut group = c.benchmark_group("translate");
    for terms in [4, 16, 64] {
        let filter = waves(terms);
        group.throughput(Throughput::Elements(terms as u64));
        group.bench_with_input(BenchmarkId::new("optimized", terms), &filter, |b, filter| {
            b.iter(|| {
                let translation = optimized
                    .translate(black_box(filter), InternalTable::standard(), TEMPLATE)
                    .unwrap();
                black_box(translation)
            });
        });
        group.bench_with_input(BenchmarkId::new("unoptimized", terms), &filter, |b, filter| {
            b.iter(|| {
                let translation = plain
                    .translate(black_box(filter), InternalTable::standard(), TEMPLATE)
                    .unwrap();
                black_box(translation)
            });
        });
    }
    group.finish();
}

/// Benchmark lowering alone.
fn bench_lower(c: &mut Criterion) {
    let compiler = FilterCompiler::default();
    let filter = waves(64);

    c.bench_function("lower_64_terms", |b| {
        b.iter(|| {
            let program = compiler
                .lower(black_box(&filter), InternalTable::standard())
                .unwrap();
            black_box(program)
        });
    });
}

criterion_group!(benches, bench_translate, bench_lower);
criterion_main!(benches);
