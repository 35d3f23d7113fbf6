use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use rulesplit::presets::{preset_rules, DEFAULT_PRESET};
use rulesplit::rules::{RuleEngine, RuleSpec};

const POSTCODES: [&str; 6] = [
    "EC1A 1BB", "FY10 4PL", "SO1 4QQ", "GIR 0AA", "ZZ99 9ZZ", "W1A 0AX",
];

fn bench_postcode_preset(c: &mut Criterion) {
    let engine = RuleEngine::from_specs(&preset_rules(DEFAULT_PRESET).unwrap()).unwrap();
    c.bench_function("postcode_preset_is_valid", |b| {
        b.iter(|| {
            for value in POSTCODES {
                black_box(engine.is_valid(black_box(value)));
            }
        });
    });
}

fn bench_rule_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_count");
    for count in [1usize, 4, 16] {
        let specs: Vec<RuleSpec> = (0..count)
            .map(|i| RuleSpec::reject(format!("^X{}", i)))
            .collect();
        let engine = RuleEngine::from_specs(&specs).unwrap();

        // Every rule passes, so the whole chain is evaluated
        group.bench_with_input(BenchmarkId::from_parameter(count), &engine, |b, engine| {
            b.iter(|| black_box(engine.is_valid(black_box("EC1A 1BB"))));
        });
    }
    group.finish();
}

fn bench_early_exit(c: &mut Criterion) {
    let specs: Vec<RuleSpec> = std::iter::once(RuleSpec::reject("^EC"))
        .chain((0..15).map(|i| RuleSpec::accept(format!("{}", i))))
        .collect();
    let engine = RuleEngine::from_specs(&specs).unwrap();

    c.bench_function("first_rule_rejects", |b| {
        b.iter(|| black_box(engine.is_valid(black_box("EC1A 1BB"))));
    });
}

fn bench_compile_preset(c: &mut Criterion) {
    c.bench_function("compile_postcode_preset", |b| {
        b.iter(|| {
            let specs = preset_rules(black_box(DEFAULT_PRESET)).unwrap();
            black_box(RuleEngine::from_specs(&specs).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_postcode_preset,
    bench_rule_count,
    bench_early_exit,
    bench_compile_preset
);
criterion_main!(benches);
