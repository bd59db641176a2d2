use criterion::{black_box, criterion_group, criterion_main, Criterion};
use h5entry::prelude::*;
use ndarray::Array2;

const N: usize = 1_000_000;

fn make_data() -> Vec<f64> {
    (0..N).map(|i| i as f64).collect()
}

fn bench_write_in_place(c: &mut Criterion) {
    let data = make_data();
    let file = File::in_memory().unwrap();
    let mut ds = file.dataset("data").unwrap();
    ds.write(&data).unwrap();
    c.bench_function("write_1M_f64_in_place", |b| {
        b.iter(|| ds.write(black_box(&data)).unwrap())
    });
}

fn bench_write_recreate(c: &mut Criterion) {
    let a = make_data();
    let b_data = Array2::from_shape_vec((1000, 1000), make_data()).unwrap();
    let file = File::in_memory().unwrap();
    let mut ds = file.dataset("data").unwrap();
    c.bench_function("write_1M_f64_alternating_shape", |b| {
        b.iter(|| {
            ds.write(&a).unwrap();
            ds.write(&b_data).unwrap();
        })
    });
}

fn bench_read(c: &mut Criterion) {
    let file = File::in_memory().unwrap();
    let ds = Dataset::try_create(&file, "data", &make_data()).unwrap();
    c.bench_function("read_1M_f64", |b| b.iter(|| ds.read::<Vec<f64>>().unwrap()));
    c.bench_function("read_1M_f64_as_f32", |b| b.iter(|| ds.read::<Vec<f32>>().unwrap()));
}

fn bench_file_image(c: &mut Criterion) {
    let file = File::in_memory().unwrap();
    Dataset::create(&file, "data", &make_data());
    let bytes = file.to_bytes().unwrap();
    c.bench_function("encode_1M_f64_image", |b| b.iter(|| file.to_bytes().unwrap()));
    c.bench_function("decode_1M_f64_image", |b| {
        b.iter(|| File::from_bytes(black_box(&bytes)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_write_in_place,
    bench_write_recreate,
    bench_read,
    bench_file_image
);
criterion_main!(benches);
