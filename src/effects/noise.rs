//! noise: additive mixing of white, pink, gaussian, or crackle noise.

use std::f32::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{Effect, EffectId, EffectParams, NoiseType};

/// 16-octave Voss-McCartney pink noise generator.
struct VossMcCartney {
    rows: [f32; 16],
    counter: u64,
}

impl VossMcCartney {
    fn new() -> Self {
        Self {
            rows: [0.0; 16],
            counter: 0,
        }
    }

    fn next(&mut self, rng: &mut SmallRng) -> f32 {
        self.counter = self.counter.wrapping_add(1);
        let idx = self.counter.trailing_zeros() as usize;
        if idx < self.rows.len() {
            self.rows[idx] = rng.gen_range(-1.0..=1.0);
        }
        self.rows.iter().sum::<f32>() / self.rows.len() as f32
    }
}

/// Box-Muller normal sample, standard deviation `std`.
fn gaussian(rng: &mut SmallRng, std: f32) -> f32 {
    let u1: f32 = rng.gen_range(1e-6..1.0);
    let u2: f32 = rng.gen_range(0.0..1.0);
    let mag = (-2.0 * u1.ln()).sqrt();
    mag * (TAU * u2).cos() * std
}

pub struct Noise {
    voss: VossMcCartney,
    impulse_level: f32,
    rng: SmallRng,
}

impl Noise {
    pub fn new() -> Self {
        Self {
            voss: VossMcCartney::new(),
            impulse_level: 0.0,
            rng: SmallRng::from_entropy(),
        }
    }

    fn reset_state(&mut self) {
        self.voss = VossMcCartney::new();
        self.impulse_level = 0.0;
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        if !enabled {
            return;
        }
        let amount = p.noise_amount;
        match p.noise_type {
            NoiseType::White => {
                for s in chunk.iter_mut() {
                    *s += self.rng.gen_range(-1.0..=1.0) * amount;
                }
            }
            NoiseType::Pink => {
                for s in chunk.iter_mut() {
                    *s += self.voss.next(&mut self.rng) * amount;
                }
            }
            NoiseType::Gaussian => {
                for s in chunk.iter_mut() {
                    let g = gaussian(&mut self.rng, 0.3).clamp(-1.0, 1.0);
                    *s += g * amount;
                }
            }
            NoiseType::Crackle => {
                // ~50 exponentially-decaying impulses per second, tau ~5ms,
                // plus low-amplitude uniform hiss.
                let spawn_prob = 50.0 / sample_rate as f64;
                let decay = (-1.0 / (0.005 * sample_rate as f64)).exp() as f32;
                for s in chunk.iter_mut() {
                    if self.rng.gen::<f64>() < spawn_prob {
                        self.impulse_level = self.rng.gen_range(-1.0..=1.0);
                    }
                    let hiss = self.rng.gen_range(-1.0..=1.0) * 0.05;
                    *s += (self.impulse_level + hiss) * amount;
                    self.impulse_level *= decay;
                }
            }
        }
    }
}

impl Effect for Noise {
    fn id(&self) -> EffectId {
        EffectId::Noise
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::Noise);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Noise);
        self.render(chunk, sample_rate, enabled, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectParam;

    #[test]
    fn disabled_is_identity() {
        let mut fx = Noise::new();
        let params = EffectParams::default();
        let mut audio = vec![0.0f32; 1000];
        fx.process_batch(&mut audio, 44_100, &params);
        assert!(audio.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn white_noise_enabled_perturbs_silence() {
        let mut fx = Noise::new();
        let mut params = EffectParams::default();
        params.apply(EffectParam::Enabled(EffectId::Noise, true));
        params.apply(EffectParam::NoiseAmount(0.5));
        let mut audio = vec![0.0f32; 1000];
        fx.process_batch(&mut audio, 44_100, &params);
        assert!(audio.iter().any(|&s| s != 0.0));
        assert!(audio.iter().all(|&s| s.abs() <= 0.5 + 1e-6));
    }
}
