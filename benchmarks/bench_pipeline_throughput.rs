use std::hint::black_box;
use std::io;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rulesplit::parallel::{MemorySink, PipelineConfig, ValidationPipeline};
use rulesplit::presets::{preset_rules, DEFAULT_PRESET};
use rulesplit::{RawFields, RuleEngine};

const ROWS: usize = 50_000;
const VALUES: [&str; 5] = ["EC1A 1BB", "FY10 4PL", "SO1 4QQ", "GIR 0AA", "ZZ99 9ZZ"];

fn input() -> Vec<RawFields> {
    (0..ROWS)
        .rev()
        .map(|i| vec![i.to_string(), VALUES[i % VALUES.len()].to_string()])
        .collect()
}

fn bench_workers(c: &mut Criterion) {
    let engine = Arc::new(RuleEngine::from_specs(&preset_rules(DEFAULT_PRESET).unwrap()).unwrap());
    let rows = input();

    let mut group = c.benchmark_group("pipeline_workers");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS as u64));

    for workers in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let source: Vec<io::Result<RawFields>> = rows.iter().cloned().map(Ok).collect();
                let mut sink = MemorySink::new();
                let report = ValidationPipeline::new(
                    Arc::clone(&engine),
                    PipelineConfig::default().with_workers(workers),
                )
                .run(source, &mut sink)
                .unwrap();
                black_box(report)
            });
        });
    }
    group.finish();
}

fn bench_batch_size(c: &mut Criterion) {
    let engine = Arc::new(RuleEngine::from_specs(&preset_rules(DEFAULT_PRESET).unwrap()).unwrap());
    let rows = input();

    let mut group = c.benchmark_group("pipeline_batch_size");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS as u64));

    for batch_size in [10usize, 100, 1000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let source: Vec<io::Result<RawFields>> =
                        rows.iter().cloned().map(Ok).collect();
                    let mut sink = MemorySink::new();
                    ValidationPipeline::new(
                        Arc::clone(&engine),
                        PipelineConfig::default().with_batch_size(batch_size),
                    )
                    .run(source, &mut sink)
                    .unwrap();
                    black_box(sink.emit_count())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_workers, bench_batch_size);
criterion_main!(benches);
