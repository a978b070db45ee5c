//! Performance benchmarks for chainage-lib
//!
//! Run with: cargo bench --package chainage-lib

use chainage_lib::{GeoPoint, RouteModel, TelemetryLogger, match_batch, match_point};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Generate a winding highway polyline with the specified number of vertices.
fn generate_route(num_points: usize, base_lat: f64, base_lon: f64) -> RouteModel {
    let points = (0..num_points)
        .map(|i| {
            let t = i as f64 / num_points as f64;
            GeoPoint::new(
                base_lat + t * 0.5 + (t * 40.0).sin() * 0.002,
                base_lon + t * 0.5 + (t * 25.0).cos() * 0.002,
            )
        })
        .collect();
    RouteModel::new("BR-116", points).unwrap()
}

/// Fixes scattered along the route, a few meters off the centerline
fn generate_fixes(route: &RouteModel, count: usize) -> Vec<GeoPoint> {
    let points = route.points();
    (0..count)
        .map(|i| {
            let segment = i % (points.len() - 1);
            let t = (i as f64 * 0.37).fract();
            let on_route = points[segment].lerp(&points[segment + 1], t);
            GeoPoint::new(on_route.lat + 0.00003, on_route.lon - 0.00002)
        })
        .collect()
}

fn bench_route_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_construction");

    for &size in &[100usize, 10_000] {
        let points = generate_route(size, -22.87, -45.30).points().to_vec();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &points, |b, points| {
            b.iter(|| RouteModel::new("BR-116", black_box(points.clone())).unwrap())
        });
    }

    group.finish();
}

fn bench_match_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_point");

    // Hand-digitized highways are tens to hundreds of vertices; 5k shows the linear scan cost
    for &size in &[4usize, 100, 1_000, 5_000] {
        let route = generate_route(size, -22.87, -45.30);
        let fixes = generate_fixes(&route, 64);
        group.bench_with_input(BenchmarkId::from_parameter(size), &route, |b, route| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % fixes.len();
                match_point(route, black_box(fixes[i]))
            })
        });
    }

    group.finish();
}

fn bench_match_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_batch");

    let route = generate_route(1_000, -22.87, -45.30);
    for &count in &[1_000usize, 10_000] {
        let fixes = generate_fixes(&route, count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &fixes, |b, fixes| {
            b.iter(|| match_batch(&route, black_box(fixes)))
        });
    }

    group.finish();
}

fn bench_logger_append(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let route = generate_route(100, -22.87, -45.30);
    let fixes = generate_fixes(&route, 256);

    let mut logger = TelemetryLogger::new(dir.path());
    logger.start(0).unwrap();

    let mut now_ms = 0i64;
    c.bench_function("logger_append", |b| {
        b.iter(|| {
            now_ms += 1000;
            let position = fixes[(now_ms / 1000) as usize % fixes.len()];
            let fix = match_point(&route, position);
            logger
                .append_sample(
                    now_ms,
                    position.lat,
                    position.lon,
                    &fix.route_id,
                    fix.kilometer,
                    fix.meter,
                    black_box(87.5),
                )
                .unwrap()
        })
    });

    logger.stop().unwrap();
}

criterion_group!(
    benches,
    bench_route_construction,
    bench_match_point,
    bench_match_batch,
    bench_logger_append
);
criterion_main!(benches);
