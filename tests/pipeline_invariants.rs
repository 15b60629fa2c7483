//! Black-box invariants for the effects pipeline and its live-update
//! channel (spec.md §8): identity when disabled, chunk/whole equivalence,
//! and the live-toggle scenario.

use sstv_core::effects::EffectId;
use sstv_core::modes::SAMPLE_RATE;
use sstv_core::pipeline::Pipeline;

#[test]
fn pipeline_identity_when_all_effects_disabled_batch() {
    let (mut pipeline, _sender) = Pipeline::new(SAMPLE_RATE);
    let mut audio = vec![0.3, -0.2, 0.5, -0.9, 0.1, 0.0, 0.75, -0.75];
    let original = audio.clone();
    pipeline.process_batch(&mut audio);
    assert_eq!(audio, original);
}

#[test]
fn pipeline_identity_when_all_effects_disabled_chunked_matches_whole() {
    let (mut whole_pipeline, _s1) = Pipeline::new(SAMPLE_RATE);
    let mut whole: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.001).sin() * 0.5).collect();
    whole_pipeline.process_chunk(&mut whole);

    let (mut chunked_pipeline, _s2) = Pipeline::new(SAMPLE_RATE);
    let mut source: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.001).sin() * 0.5).collect();
    for chunk in source.chunks_mut(317) {
        chunked_pipeline.process_chunk(chunk);
    }
    assert_eq!(whole, source);
}

#[test]
fn parameter_update_is_visible_to_the_next_drain() {
    let (mut pipeline, sender) = Pipeline::new(SAMPLE_RATE);
    sender
        .update(sstv_core::effects::EffectParam::NoiseAmount(0.42))
        .unwrap();
    pipeline.drain_updates();
    assert_eq!(pipeline.params().noise_amount, 0.42);
}

#[test]
fn scenario_5_live_toggle_noise_has_zero_effect_before_and_nonzero_after() {
    let (mut clean, _clean_sender) = Pipeline::new(SAMPLE_RATE);
    let (mut effected, effected_sender) = Pipeline::new(SAMPLE_RATE);

    let source: Vec<f32> = (0..20_000).map(|i| (i as f32 * 0.01).sin() * 0.4).collect();
    let chunk_size = 1024;
    let toggle_after_chunks = 5;

    let mut diffs = Vec::new();
    for (i, chunk) in source.chunks(chunk_size).enumerate() {
        if i == toggle_after_chunks {
            effected_sender.set_enabled(EffectId::Noise, true).unwrap();
        }
        let mut a = chunk.to_vec();
        let mut b = chunk.to_vec();
        clean.process_chunk(&mut a);
        effected.process_chunk(&mut b);
        let diff: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
        diffs.push(diff);
    }

    for diff in &diffs[..toggle_after_chunks] {
        assert_eq!(*diff, 0.0, "effected output diverged before the toggle took effect");
    }
    for diff in &diffs[toggle_after_chunks..] {
        assert!(*diff > 0.0, "effected output matched clean output after enabling noise");
    }
}
