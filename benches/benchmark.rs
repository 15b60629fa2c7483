use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use sstv_core::decoder::decode_batch;
use sstv_core::effects::{build_chain, normalize_peak, Effect, EffectParams, NoiseType};
use sstv_core::encoder::encode;
use sstv_core::modes::{resolve, SAMPLE_RATE};

fn gradient_image(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = ((x + y) % 256) as u8;
            img.put_pixel(x, y, Rgb([v, 255 - v, v / 2]));
        }
    }
    img
}

fn encode_bench() -> Vec<f32> {
    let mode = resolve("MartinM1", (320, 256)).unwrap();
    let img = gradient_image(320, 256);
    encode(&img, &mode, SAMPLE_RATE)
}

fn decode_bench(audio: &[f32]) -> usize {
    let mode = resolve("MartinM1", (320, 256)).unwrap();
    decode_batch(audio, &mode, SAMPLE_RATE).unwrap().len()
}

fn effects_chain_bench(audio: &[f32]) -> Vec<f32> {
    let mut params = EffectParams::default();
    params.enabled = [true; 13];
    params.noise_type = NoiseType::Pink;
    let mut chain = build_chain();
    let mut buf = audio.to_vec();
    for effect in chain.iter_mut() {
        effect.process_batch(&mut buf, SAMPLE_RATE, &params);
    }
    normalize_peak(&mut buf);
    buf
}

fn criterion_benchmark(c: &mut Criterion) {
    let audio = encode_bench();

    c.bench_function("encode_martin_m1_320x256", |b| b.iter(|| encode_bench()));
    c.bench_function("decode_batch_martin_m1_320x256", |b| {
        b.iter(|| decode_bench(black_box(&audio)))
    });
    c.bench_function("effects_chain_all_enabled", |b| {
        b.iter(|| effects_chain_bench(black_box(&audio)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
