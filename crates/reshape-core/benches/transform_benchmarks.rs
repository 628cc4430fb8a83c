//! Benchmarks for the transform interpreter
//!
//! These benchmarks cover path resolution, array mapping with filters and
//! sorting, and expression pipelines over a larger document.
//!
//! Copyright (c) 2025 Reshape Team
//! Licensed under the Apache-2.0 license

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reshape_core::Transformer;
use serde_json::{json, Value};

fn create_test_data() -> Value {
    json!({
        "store": {
            "name": "Corner",
            "book": [
                {"category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "price": 8.95},
                {"category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "price": 12.99},
                {"category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "price": 8.99},
                {"category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "price": 22.99}
            ]
        },
        "currency": "EUR"
    })
}

fn create_large_data(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Item {}", i),
                "category": ["A", "B", "C"][i % 3],
                "price": (i as f64) * 1.5 + 10.0,
                "in_stock": i % 2 == 0
            })
        })
        .collect();

    json!({"items": items, "total_count": count})
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("paths");
    let transformer = Transformer::default();
    let data = create_test_data();

    let test_cases = vec![
        ("simple_property", "store|name"),
        ("array_index", "store|book|0|title"),
        ("search", "store|book|author=Melville|price"),
        ("parent", "store|book|0|..|..|currency"),
    ];

    for (name, path) in test_cases {
        let spec = json!({"out": {"$value": path}});
        group.bench_with_input(BenchmarkId::new("resolve", name), &spec, |b, spec| {
            b.iter(|| {
                let result = transformer.transform(black_box(&data), spec);
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("arrays");
    let transformer = Transformer::default();

    let spec = json!({
        "items": {
            "$path": "items",
            "$include": [{"equals": {"$value": "category", "$what": "A"}}],
            "$exclude": [{"equals": {"$value": "in_stock", "$what": false}}],
            "$sort": {"descending": {"$by": {"$value": "price"}}},
            "$structure": [{
                "id": {"$value": "id"},
                "label": {"$value": "name", "$expression": [{"append-array-index": {}}]},
                "price": {"$value": "price", "$constraints": [{"type": "number"}]}
            }]
        }
    });

    for size in [100usize, 1000] {
        let data = create_large_data(size);
        group.bench_with_input(BenchmarkId::new("filter_sort_map", size), &data, |b, data| {
            b.iter(|| {
                let result = transformer.transform(black_box(data), &spec);
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("expressions");
    let transformer = Transformer::default();
    let data = create_test_data();

    let spec = json!({
        "summary": {
            "$value": "store|name",
            "$expression": [
                {"append": {"$what": " / "}},
                {"append": {"$what": {"$value": "currency"}}},
                {"replace": {"$what": "Corner", "$with": "Corner Books"}}
            ]
        },
        "total": {
            "$value": "store|book|0|price",
            "$expression": [{"sum": {"$what": [
                {"$value": "store|book|1|price"},
                {"$value": "store|book|2|price"},
                {"$value": "store|book|3|price"}
            ]}}]
        }
    });

    group.bench_function("pipeline", |b| {
        b.iter(|| {
            let result = transformer.transform(black_box(&data), &spec);
            black_box(result)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_paths, bench_arrays, bench_expressions);
criterion_main!(benches);
