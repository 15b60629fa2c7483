//! syncwobble, syncdropout, and scanline: effects that target the sync
//! pulses and line structure rather than the pixel-carrying scan segments.

use std::f64::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{Effect, EffectId, EffectParams};

/// Shallow amplitude wobble on the whole signal, same LFO+jitter shape as
/// `ampmod` but fixed at the spec's 0.15 scale and 0.7/0.3 mix.
pub struct SyncWobble {
    time: f64,
    rng: SmallRng,
}

impl SyncWobble {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            rng: SmallRng::from_entropy(),
        }
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        let dt = 1.0 / sample_rate as f64;
        for sample in chunk.iter_mut() {
            if enabled {
                let lfo = (TAU * p.syncwobble_freq as f64 * self.time).sin();
                let jitter: f64 = self.rng.gen_range(-1.0..=1.0);
                let env = 1.0 + p.syncwobble_amount as f64 * 0.15 * (0.7 * lfo + 0.3 * jitter);
                *sample = (*sample as f64 * env) as f32;
            }
            self.time += dt;
        }
    }
}

impl Effect for SyncWobble {
    fn id(&self) -> EffectId {
        EffectId::SyncWobble
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.time = 0.0;
        let enabled = params.enabled(EffectId::SyncWobble);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::SyncWobble);
        self.render(chunk, sample_rate, enabled, params);
    }
}

#[derive(Clone, Copy)]
enum DropoutState {
    Idle,
    Active { pos: usize, len: usize },
}

/// Randomly mutes short stretches of audio, ramping in and out so the
/// dropout itself doesn't introduce a click.
pub struct SyncDropout {
    rng: SmallRng,
    window_pos: usize,
    state: DropoutState,
}

impl SyncDropout {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            window_pos: 0,
            state: DropoutState::Idle,
        }
    }

    fn reset_state(&mut self) {
        self.window_pos = 0;
        self.state = DropoutState::Idle;
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        let window_len = (0.05 * sample_rate as f64).round() as usize;
        let mut i = 0;
        while i < chunk.len() {
            match self.state {
                DropoutState::Idle => {
                    if self.window_pos == 0
                        && enabled
                        && self.rng.gen::<f32>() < p.syncdropout_prob * 0.05
                    {
                        let dur = ((p.syncdropout_duration as f64 / 1000.0)
                            * sample_rate as f64)
                            .round() as usize;
                        self.state = DropoutState::Active {
                            pos: 0,
                            len: dur.max(4),
                        };
                        continue;
                    }
                    let take = (window_len - self.window_pos).min(chunk.len() - i);
                    i += take;
                    self.window_pos += take;
                    if self.window_pos >= window_len {
                        self.window_pos = 0;
                    }
                }
                DropoutState::Active { pos, len } => {
                    let take = (len - pos).min(chunk.len() - i);
                    let quarter = (len / 4).max(1);
                    for k in 0..take {
                        let t = pos + k;
                        let gain = if t < quarter {
                            1.0 - 0.9 * (t as f32 / quarter as f32)
                        } else if t >= len - quarter {
                            0.1 + 0.9 * ((t - (len - quarter)) as f32 / quarter as f32)
                        } else {
                            0.1
                        };
                        chunk[i + k] *= gain;
                    }
                    i += take;
                    let new_pos = pos + take;
                    self.state = if new_pos >= len {
                        DropoutState::Idle
                    } else {
                        DropoutState::Active { pos: new_pos, len }
                    };
                }
            }
        }
    }
}

impl Effect for SyncDropout {
    fn id(&self) -> EffectId {
        EffectId::SyncDropout
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::SyncDropout);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::SyncDropout);
        self.render(chunk, sample_rate, enabled, params);
    }
}

#[derive(Clone, Copy)]
enum Corruption {
    None,
    PhaseInvert,
    Spike(f64),
    Silence,
    NoiseBurst,
}

/// Picks a random corruption for each ~50ms band of audio: phase
/// inversion, an 1800-2200 Hz spike, near-silence, or a noise burst.
pub struct Scanline {
    rng: SmallRng,
    band_pos: usize,
    corruption: Corruption,
    spike_phase: f64,
}

impl Scanline {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            band_pos: 0,
            corruption: Corruption::None,
            spike_phase: 0.0,
        }
    }

    fn reset_state(&mut self) {
        self.band_pos = 0;
        self.corruption = Corruption::None;
        self.spike_phase = 0.0;
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        let band_len = (0.05 * sample_rate as f64).round() as usize;
        let mut i = 0;
        while i < chunk.len() {
            if self.band_pos == 0 {
                self.corruption = if enabled && self.rng.gen::<f32>() < p.scanline_freq {
                    match self.rng.gen_range(0..4) {
                        0 => Corruption::PhaseInvert,
                        1 => Corruption::Spike(1800.0 + self.rng.gen::<f64>() * 400.0),
                        2 => Corruption::Silence,
                        _ => Corruption::NoiseBurst,
                    }
                } else {
                    Corruption::None
                };
            }
            let take = (band_len - self.band_pos).min(chunk.len() - i);
            let intensity = p.scanline_intensity;
            for k in 0..take {
                let s = &mut chunk[i + k];
                match self.corruption {
                    Corruption::None => {}
                    Corruption::PhaseInvert => *s *= -intensity,
                    Corruption::Spike(freq) => {
                        self.spike_phase += TAU * freq / sample_rate as f64;
                        *s += self.spike_phase.sin() as f32 * intensity;
                    }
                    Corruption::Silence => *s *= 1.0 - intensity,
                    Corruption::NoiseBurst => {
                        *s += (self.rng.gen::<f32>() * 2.0 - 1.0) * intensity
                    }
                }
            }
            i += take;
            self.band_pos += take;
            if self.band_pos >= band_len {
                self.band_pos = 0;
            }
        }
    }
}

impl Effect for Scanline {
    fn id(&self) -> EffectId {
        EffectId::Scanline
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::Scanline);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Scanline);
        self.render(chunk, sample_rate, enabled, params);
    }
}
