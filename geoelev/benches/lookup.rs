use std::fs::File;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use geoelev::ElevationService;

const SAMPLES: u32 = 1201;

/// Write a one-degree WGS84 tile at (lat, lng) with a simple elevation gradient.
fn create_tile(dir: &Path, lat: f64, lng: f64) {
    let data: Vec<i16> = (0..SAMPLES * SAMPLES)
        .map(|i| ((i / SAMPLES + i % SAMPLES) % 4000) as i16)
        .collect();
    let step = 1.0 / SAMPLES as f64;

    let path = dir.join(format!("tile_{}_{}.tif", lat, lng));
    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    let mut image = encoder
        .new_image::<colortype::GrayI16>(SAMPLES, SAMPLES)
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[step, step, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, lng, lat + 1.0, 0.0][..])
        .unwrap();
    image.write_data(&data).unwrap();
}

fn coords_within(lat: f64, lng: f64, n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let frac = i as f64 / n as f64;
            (lat + frac * 0.99, lng + frac * 0.99)
        })
        .collect()
}

fn bench_single_streaming(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 35.0, 138.0);
    let mut service = ElevationService::new(tmp.path(), 5).unwrap();

    // Warm the cache
    service.lookup(35.5, 138.5);

    c.bench_function("single_streaming_cached", |b| {
        b.iter(|| black_box(service.lookup(black_box(35.3606), black_box(138.7274))));
    });
}

fn bench_single_resident(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 35.0, 138.0);
    let mut service = ElevationService::builder(tmp.path())
        .resident(true)
        .build()
        .unwrap();

    c.bench_function("single_resident", |b| {
        b.iter(|| black_box(service.lookup(black_box(35.3606), black_box(138.7274))));
    });
}

fn bench_batch_same_tile(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 35.0, 138.0);
    let mut service = ElevationService::new(tmp.path(), 5).unwrap();
    let coords = coords_within(35.0, 138.0, 1000);

    c.bench_function("batch_1000_same_tile", |b| {
        b.iter(|| black_box(service.lookup_batch(black_box(&coords))));
    });
}

fn bench_batch_thrashing(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    for lng in 0..4 {
        create_tile(tmp.path(), 35.0, 138.0 + lng as f64);
    }
    // Fewer handles than tiles: every tile switch reopens a file
    let mut service = ElevationService::new(tmp.path(), 2).unwrap();
    let coords: Vec<(f64, f64)> = (0..400)
        .map(|i| (35.5, 138.5 + (i % 4) as f64))
        .collect();

    c.bench_function("batch_400_lru_thrashing", |b| {
        b.iter(|| black_box(service.lookup_batch(black_box(&coords))));
    });
}

fn bench_no_coverage(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), 35.0, 138.0);
    let mut service = ElevationService::new(tmp.path(), 5).unwrap();

    c.bench_function("single_no_coverage", |b| {
        b.iter(|| black_box(service.lookup(black_box(-10.0), black_box(20.0))));
    });
}

criterion_group!(
    benches,
    bench_single_streaming,
    bench_single_resident,
    bench_batch_same_tile,
    bench_batch_thrashing,
    bench_no_coverage,
);
criterion_main!(benches);
