//! distortion, harmonic, and bitcrush: waveshaping and quantization effects.

use std::f64::consts::TAU;

use super::{Effect, EffectId, EffectParams};

/// Drive-then-soft-clip waveshaper, dry/wet mixed by `drive`:
/// `(1-drive)*in + drive*tanh(in*(1+10*drive)/t)*t`, `t = 0.1 + 0.9*clip`.
pub struct Distortion;

impl Distortion {
    pub fn new() -> Self {
        Self
    }

    fn render(&mut self, chunk: &mut [f32], enabled: bool, p: &EffectParams) {
        if !enabled {
            return;
        }
        let drive = p.distortion_drive;
        let gain = 1.0 + drive * 10.0;
        let threshold = 0.1 + p.distortion_clip * 0.9;
        for s in chunk.iter_mut() {
            let driven = *s * gain;
            let clipped = (driven / threshold).tanh() * threshold;
            *s = *s * (1.0 - drive) + clipped * drive;
        }
    }
}

impl Effect for Distortion {
    fn id(&self) -> EffectId {
        EffectId::Distortion
    }

    fn process_batch(&mut self, audio: &mut [f32], _sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Distortion);
        self.render(audio, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], _sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Distortion);
        self.render(chunk, enabled, params);
    }
}

/// Ring-modulates the input against `harmonic_count` sine carriers at
/// 1800*(h+1) Hz (h = 1..=count), each mixed in at `amount/(h+1)`. The
/// carrier phase is a running time offset so it stays continuous across
/// chunks.
pub struct Harmonic {
    time: f64,
}

impl Harmonic {
    pub fn new() -> Self {
        Self { time: 0.0 }
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        if !enabled {
            return;
        }
        let amount = p.harmonic_amount as f64;
        let count = p.harmonic_count as i32;
        let dt = 1.0 / sample_rate as f64;
        for s in chunk.iter_mut() {
            let x = *s as f64;
            let mut acc = x;
            for h in 1..=count {
                let carrier_freq = 1800.0 * (h as f64 + 1.0);
                let carrier = (TAU * carrier_freq * self.time).sin();
                acc += x * carrier * (amount / (h as f64 + 1.0));
            }
            *s = acc as f32;
            self.time += dt;
        }
    }
}

impl Effect for Harmonic {
    fn id(&self) -> EffectId {
        EffectId::Harmonic
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.time = 0.0;
        let enabled = params.enabled(EffectId::Harmonic);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Harmonic);
        self.render(chunk, sample_rate, enabled, params);
    }
}

/// Sample-and-hold rate reduction followed by amplitude quantization to
/// `bitcrush_bits` levels.
pub struct Bitcrush {
    held: f32,
    phase: f64,
}

impl Bitcrush {
    pub fn new() -> Self {
        Self {
            held: 0.0,
            phase: 1.0,
        }
    }

    fn reset_state(&mut self) {
        self.held = 0.0;
        self.phase = 1.0;
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        if !enabled {
            return;
        }
        let step = (p.bitcrush_rate as f64 / sample_rate as f64).clamp(0.0, 1.0);
        let half_levels = (1u32 << p.bitcrush_bits.clamp(1, 16).min(16)) as f32 / 2.0;
        for s in chunk.iter_mut() {
            self.phase += step;
            if self.phase >= 1.0 {
                self.phase %= 1.0;
                self.held = *s;
            }
            *s = (self.held * half_levels).round() / half_levels;
        }
    }
}

impl Effect for Bitcrush {
    fn id(&self) -> EffectId {
        EffectId::Bitcrush
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::Bitcrush);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Bitcrush);
        self.render(chunk, sample_rate, enabled, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectParam;

    #[test]
    fn distortion_disabled_is_identity() {
        let mut fx = Distortion::new();
        let params = EffectParams::default();
        let mut audio = vec![0.1, 0.5, -0.9];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn distortion_full_drive_settles_near_the_soft_knee_threshold() {
        let mut fx = Distortion::new();
        let mut params = EffectParams::default();
        params.apply(EffectParam::Enabled(EffectId::Distortion, true));
        params.apply(EffectParam::DistortionDrive(1.0));
        params.apply(EffectParam::DistortionClip(0.4));
        let mut audio = vec![1.0f32; 100];
        fx.process_batch(&mut audio, 44_100, &params);
        // drive = 1.0 mixes in 100% wet signal, which saturates to +-threshold.
        let threshold = 0.1 + 0.4 * 0.9;
        assert!(audio.iter().all(|&s| (s.abs() - threshold).abs() < 1e-3));
    }

    #[test]
    fn harmonic_disabled_is_identity() {
        let mut fx = Harmonic::new();
        let params = EffectParams::default();
        let mut audio = vec![0.2, -0.4, 0.6];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn harmonic_enabled_changes_signal() {
        let mut fx = Harmonic::new();
        let mut params = EffectParams::default();
        params.apply(EffectParam::Enabled(EffectId::Harmonic, true));
        params.apply(EffectParam::HarmonicAmount(0.5));
        params.apply(EffectParam::HarmonicCount(3));
        let mut audio = vec![0.4f32; 2000];
        fx.process_batch(&mut audio, 44_100, &params);
        assert!(audio.iter().any(|&s| (s - 0.4).abs() > 1e-6));
    }

    #[test]
    fn bitcrush_disabled_is_identity() {
        let mut fx = Bitcrush::new();
        let params = EffectParams::default();
        let mut audio = vec![0.123, -0.456, 0.789];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn bitcrush_quantizes_to_discrete_levels() {
        let mut fx = Bitcrush::new();
        let mut params = EffectParams::default();
        params.apply(EffectParam::Enabled(EffectId::Bitcrush, true));
        params.apply(EffectParam::BitcrushBits(2));
        params.apply(EffectParam::BitcrushRate(44_100.0));
        let mut audio = vec![0.37f32; 10];
        fx.process_batch(&mut audio, 44_100, &params);
        let half_levels = 2.0f32;
        for &s in &audio {
            let scaled = s * half_levels;
            assert!((scaled - scaled.round()).abs() < 1e-4);
        }
    }
}
