//! Mapping resolution benchmarks.

use bulkmap_bench::fixtures::{customer_model, generate_customers, Scale};
use bulkmap_core::{BulkConfig, MappingResolver};
use bulkmap_proto::OperationType;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve/operation");
    let model = customer_model();
    let resolver = MappingResolver::new(&model).in_transaction(true);
    let config = BulkConfig::builder().set_output_identity(true).build().unwrap();
    let customers = generate_customers(Scale::Small.count());

    for operation in [
        OperationType::Insert,
        OperationType::InsertOrUpdate,
        OperationType::Delete,
    ] {
        group.bench_with_input(
            BenchmarkId::new("small", operation.name()),
            &operation,
            |b, &operation| {
                b.iter(|| {
                    black_box(resolver.resolve(black_box(&customers), operation, &config).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_default_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve/batch");
    let model = customer_model();
    let resolver = MappingResolver::new(&model);
    let config = BulkConfig::default();

    // Default detection reads every entity once per defaulted property.
    for scale in [Scale::Tiny, Scale::Small, Scale::Medium] {
        let customers = generate_customers(scale.count());
        group.bench_with_input(
            BenchmarkId::new("insert", scale.count()),
            &customers,
            |b, customers| {
                b.iter(|| {
                    black_box(resolver.resolve(customers, OperationType::Insert, &config).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_filtered(c: &mut Criterion) {
    let model = customer_model();
    let resolver = MappingResolver::new(&model).in_transaction(true);
    let customers = generate_customers(Scale::Small.count());
    let config = BulkConfig::builder()
        .include_properties(["Name", "Email", "Address.City"])
        .exclude_on_compare(["Email"])
        .update_by(["Email"])
        .build()
        .unwrap();

    c.bench_function("resolve/filtered_upsert", |b| {
        b.iter(|| {
            black_box(
                resolver
                    .resolve(&customers, OperationType::InsertOrUpdate, &config)
                    .unwrap(),
            );
        });
    });
}

criterion_group!(benches, bench_resolve, bench_default_detection, bench_filtered);

criterion_main!(benches);
