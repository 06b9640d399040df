//! Benchmarks for the lowering pipeline.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polylower::scop::ScopDescription;
use polylower::{lower_description, LoweringConfig};

/// Triangular 3-deep nest with two statements fused at the innermost level.
const NEST: &str = r#"{
    "iterators": ["i", "j", "k"],
    "parameters": ["N"],
    "statements": [
        {
            "name": "S0",
            "domain": [[1, 1, 0, 0, 0, 0], [1, -1, 0, 0, 1, -1], [1, 0, 1, 0, 0, 0], [1, 1, -1, 0, 0, 0],
                       [1, 0, 0, 1, 0, 0], [1, 0, 0, -1, 1, -1]],
            "schedule": [[1, 0, 0, 0, 0], [0, 1, 0, 0, 0], [0, 0, 1, 0, 0], [0, 0, 0, 0, 0]]
        },
        {
            "name": "S1",
            "domain": [[1, 1, 0, 0, 0, -1], [1, -1, 0, 0, 1, -1], [1, 0, 1, 0, 0, 0], [1, 1, -1, 0, 0, 0],
                       [1, 0, 0, 1, 0, 0], [1, 0, 0, -1, 1, -1]],
            "schedule": [[1, 0, 0, 0, 0], [0, 1, 0, 0, 0], [0, 0, 1, 0, 0], [0, 0, 0, 0, 1]]
        }
    ]
}"#;

/// Benchmark scan AST generation alone.
fn bench_scan(c: &mut Criterion) {
    let description = ScopDescription::from_json(NEST).unwrap();
    let mut builder = polylower::ir::IrBuilder::new();
    let scop = description.build(&mut builder).unwrap();
    let config = LoweringConfig::default();

    c.bench_function("scan_triangular_nest", |b| {
        b.iter(|| scop.scan(black_box(&config)).unwrap())
    });
}

/// Benchmark the full pipeline from JSON to IR.
fn bench_lower(c: &mut Criterion) {
    let config = LoweringConfig::default();

    c.bench_function("lower_triangular_nest", |b| {
        b.iter(|| lower_description(black_box(NEST), &config).unwrap())
    });
}

criterion_group!(benches, bench_scan, bench_lower);
criterion_main!(benches);
