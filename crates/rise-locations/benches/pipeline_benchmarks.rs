//! Benchmarks for merging, filtering and serializing location responses.
//!
//! Run with: cargo bench --package rise-locations --bench pipeline_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rise_locations::{
    DuplicatePolicy, FeatureOptions, ItemsQuery, LocationResponse, RelationshipResolver,
};
use rise_protocol::queries::SortSpec;
use test_utils::{generate_page_with_included, generate_pages};

// =============================================================================
// MERGE BENCHMARKS
// =============================================================================

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for &count in &[100usize, 1_000, 5_000] {
        let pages = generate_pages(count, 100);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("pages_of_100", count), &pages, |b, pages| {
            b.iter(|| {
                LocationResponse::from_api_pages(black_box(pages.clone()), DuplicatePolicy::Reject)
            })
        });
    }

    group.finish();
}

// =============================================================================
// FILTER BENCHMARKS
// =============================================================================

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");

    let response =
        LocationResponse::from_api_pages(generate_pages(1_000, 100), DuplicatePolicy::Reject)
            .unwrap_or_else(|e| panic!("fixture failed: {}", e));

    let bbox = ItemsQuery::new().with_bbox(vec![-110.0, 30.0, -100.0, 45.0]);
    group.bench_function("bbox_1000", |b| {
        b.iter(|| bbox.run(black_box(response.clone())))
    });

    let wkt = ItemsQuery::new()
        .with_wkt("POLYGON((-110 30, -100 30, -100 45, -110 45, -110 30))")
        .with_z("0/50000");
    group.bench_function("wkt_z_1000", |b| b.iter(|| wkt.run(black_box(response.clone()))));

    let datetime = ItemsQuery::new().with_datetime("2020-01-05/2020-01-20");
    group.bench_function("datetime_interval_1000", |b| {
        b.iter(|| datetime.run(black_box(response.clone())))
    });

    group.finish();
}

// =============================================================================
// SERIALIZATION BENCHMARKS
// =============================================================================

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    let response =
        LocationResponse::from_api_pages(generate_pages(1_000, 100), DuplicatePolicy::Reject)
            .unwrap_or_else(|e| panic!("fixture failed: {}", e));

    group.bench_function("geojson_1000", |b| {
        b.iter(|| black_box(&response).to_geojson(&FeatureOptions::default()))
    });

    let sorted = FeatureOptions::new().sort_by(vec![
        SortSpec::descending("elevation"),
        SortSpec::ascending("name"),
    ]);
    group.bench_function("geojson_sorted_1000", |b| {
        b.iter(|| black_box(&response).to_geojson(&sorted))
    });

    let linked: Vec<i64> = (1..=500).collect();
    let with_included = LocationResponse::from_value(generate_page_with_included(1_000, &linked, 4))
        .unwrap_or_else(|e| panic!("fixture failed: {}", e));
    let resolver = RelationshipResolver::default();
    group.bench_function("resolve_500_of_1000", |b| {
        b.iter(|| resolver.resolve(black_box(&with_included)))
    });

    group.finish();
}

criterion_group!(benches, bench_merge, bench_filters, bench_serialize);
criterion_main!(benches);
