//! phasemod and ampmod: LFO-driven modulation effects.
//!
//! Both keep a running time offset rather than a bare sample counter so the
//! LFO phase stays well-defined (and bounded by wrapping through `sin`)
//! across an arbitrary number of chunks.

use std::f64::consts::TAU;

use rand::Rng;

use super::{Effect, EffectId, EffectParams};

const RING_LEN: usize = 4096;

struct MovingAverage {
    buf: [f32; 100],
    pos: usize,
    sum: f32,
    filled: usize,
}

impl MovingAverage {
    fn new() -> Self {
        Self {
            buf: [0.0; 100],
            pos: 0,
            sum: 0.0,
            filled: 0,
        }
    }

    fn push(&mut self, x: f32) -> f32 {
        if self.filled < self.buf.len() {
            self.sum += x;
            self.buf[self.pos] = x;
            self.filled += 1;
        } else {
            self.sum += x - self.buf[self.pos];
            self.buf[self.pos] = x;
        }
        self.pos = (self.pos + 1) % self.buf.len();
        self.sum / self.filled as f32
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Time-varying integer delay of up to `10ms * depth`, driven by a
/// rate-Hz sine LFO mixed with smoothed uniform jitter.
pub struct PhaseMod {
    ring: [f32; RING_LEN],
    write: usize,
    filled: usize,
    time: f64,
    jitter_avg: MovingAverage,
    rng: rand::rngs::SmallRng,
}

impl PhaseMod {
    pub fn new() -> Self {
        Self {
            ring: [0.0; RING_LEN],
            write: 0,
            filled: 0,
            time: 0.0,
            jitter_avg: MovingAverage::new(),
            rng: rand::SeedableRng::from_entropy(),
        }
    }

    fn reset_state(&mut self) {
        self.ring = [0.0; RING_LEN];
        self.write = 0;
        self.filled = 0;
        self.time = 0.0;
        self.jitter_avg.reset();
    }

    fn push(&mut self, s: f32) {
        self.ring[self.write] = s;
        self.write = (self.write + 1) % RING_LEN;
        self.filled = (self.filled + 1).min(RING_LEN);
    }

    fn read_delayed(&self, shift: usize) -> f32 {
        if shift >= self.filled {
            return 0.0;
        }
        let idx = (self.write + RING_LEN - 1 - shift) % RING_LEN;
        self.ring[idx]
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        let dt = 1.0 / sample_rate as f64;
        let max_shift = ((0.010 * p.phasemod_depth as f64 * sample_rate as f64).round() as i64)
            .clamp(0, RING_LEN as i64 - 1);
        for sample in chunk.iter_mut() {
            let input = *sample;
            self.push(input);

            if enabled {
                let lfo = (TAU * p.phasemod_rate as f64 * self.time).sin();
                let raw_jitter: f32 = self.rng.gen_range(-1.0..=1.0);
                let jitter = self.jitter_avg.push(raw_jitter) as f64;
                let combined = lfo * 0.5 + jitter * 0.5;
                let shift = (((combined + 1.0) * 0.5) * max_shift as f64).round() as i64;
                let shift = shift.clamp(0, RING_LEN as i64 - 1) as usize;
                *sample = self.read_delayed(shift);
            }
            self.time += dt;
        }
    }
}

impl Effect for PhaseMod {
    fn id(&self) -> EffectId {
        EffectId::PhaseMod
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::PhaseMod);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::PhaseMod);
        self.render(chunk, sample_rate, enabled, params);
    }
}

/// Tremolo-like amplitude modulation with three stacked LFO partials.
pub struct AmpMod {
    time: f64,
}

impl AmpMod {
    pub fn new() -> Self {
        Self { time: 0.0 }
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        let dt = 1.0 / sample_rate as f64;
        let f = p.ampmod_rate as f64;
        let depth = p.ampmod_depth as f64;
        for sample in chunk.iter_mut() {
            if enabled {
                let env = 1.0
                    + depth
                        * (0.5 * (TAU * f * self.time).sin()
                            + 0.3 * (TAU * 1.618 * f * self.time).sin()
                            + 0.2 * (TAU * 0.5 * f * self.time).sin());
                *sample = (*sample as f64 * env) as f32;
            }
            self.time += dt;
        }
    }
}

impl Effect for AmpMod {
    fn id(&self) -> EffectId {
        EffectId::AmpMod
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.time = 0.0;
        let enabled = params.enabled(EffectId::AmpMod);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::AmpMod);
        self.render(chunk, sample_rate, enabled, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phasemod_disabled_is_identity() {
        let mut fx = PhaseMod::new();
        let mut params = EffectParams::default();
        params.enabled[0] = false;
        let mut audio = vec![0.1, 0.2, -0.3, 0.4];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn ampmod_disabled_is_identity() {
        let mut fx = AmpMod::new();
        let params = EffectParams::default();
        let mut audio = vec![0.1, 0.2, -0.3, 0.4];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn ampmod_enabled_changes_signal() {
        let mut fx = AmpMod::new();
        let mut params = EffectParams::default();
        params.apply(super::super::EffectParam::Enabled(EffectId::AmpMod, true));
        let mut audio = vec![1.0f32; 2000];
        fx.process_batch(&mut audio, 44_100, &params);
        assert!(audio.iter().any(|&s| (s - 1.0).abs() > 1e-6));
    }
}
