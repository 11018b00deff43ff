use std::path::PathBuf;
use std::{env, fs};

use anyhow::Result;
use criterion::*;
use glob::{glob_with, MatchOptions};

use bmt_thermal::{
    bitmap::extract_bitmaps,
    bmtf::{self, PixelEncoding},
    palette::{colorize_full_range, palette},
    stats::{GlobalStats, Histogram},
    DecodedImage, TemperatureField, ThermalMetadata,
};

const WIDTH: usize = 640;
const HEIGHT: usize = 480;

fn synthetic_field() -> TemperatureField {
    let values = (0..WIDTH * HEIGHT)
        .map(|i| {
            let (x, y) = ((i % WIDTH) as f32, (i / WIDTH) as f32);
            20. + 15. * (x / 40.).sin() * (y / 30.).cos()
        })
        .collect();
    TemperatureField::from_vec(WIDTH, HEIGHT, values, ThermalMetadata::default())
        .expect("synthetic field")
}

fn fake_dual_bmp(size: usize) -> Vec<u8> {
    let mut out = vec![];
    for fill in &[0x11u8, 0x22] {
        let start = out.len();
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&(size as u32).to_le_bytes());
        out.resize(start + size, *fill);
    }
    out
}

fn get_samples(key: &'static str) -> Result<Vec<PathBuf>> {
    let base = env::var(key)?;
    let mut opts = MatchOptions::new();
    opts.case_sensitive = false;
    let samples: Vec<_> = glob_with(&format!("{}/**/*.bmt", base), opts)?
        .into_iter()
        .take(5)
        .map(|r| Result::Ok(r?))
        .collect::<Result<_>>()?;
    Ok(samples)
}

fn decoding(c: &mut Criterion) {
    let field = synthetic_field();
    let float = bmtf::encode(&field, PixelEncoding::Float32, None).expect("encode");
    let scaled = bmtf::encode(&field, PixelEncoding::ScaledU16, None).expect("encode");
    let dual = fake_dual_bmp(WIDTH * HEIGHT * 3 + 54);

    c.bench_function("bmtf_f32_decode", |b| {
        b.iter(|| bmtf::decode(black_box(&float)).unwrap())
    });
    c.bench_function("bmtf_u16_decode", |b| {
        b.iter(|| bmtf::decode(black_box(&scaled)).unwrap())
    });
    c.bench_function("dual_bmp_extract", |b| {
        b.iter(|| extract_bitmaps(black_box(&dual)).count())
    });

    // Optional: real exports under $BMT_SAMPLES
    if let Ok(samples) = get_samples("BMT_SAMPLES") {
        let bytes: Vec<_> = samples.iter().filter_map(|p| fs::read(p).ok()).collect();
        c.bench_function("sample_decode", |b| {
            b.iter(|| {
                for buf in bytes.iter() {
                    let _ = DecodedImage::decode(buf);
                }
            })
        });
    }
}

fn analysis(c: &mut Criterion) {
    let field = synthetic_field();
    let iron = palette("iron").expect("iron");

    c.bench_function("colorize_iron", |b| {
        b.iter(|| colorize_full_range(black_box(&field), iron))
    });
    c.bench_function("global_stats", |b| {
        b.iter(|| GlobalStats::compute(black_box(&field)))
    });
    c.bench_function("histogram", |b| {
        b.iter(|| Histogram::compute(black_box(&field), None))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = decoding, analysis
}

criterion_main!(benches);
