//! freqshift and bandpass: frequency-domain effects.

use std::f64::consts::PI;

use super::{Effect, EffectId, EffectParams};

const HILBERT_TAPS: usize = 31;
const HILBERT_CENTER: usize = HILBERT_TAPS / 2;

/// Windowed-sinc approximation of the ideal Hilbert kernel
/// `h[n] = 2/(pi*n)` for odd `n`, `0` for even `n`.
fn hilbert_coeffs() -> [f32; HILBERT_TAPS] {
    let mut c = [0.0f32; HILBERT_TAPS];
    for k in 0..HILBERT_TAPS {
        let n = k as i32 - HILBERT_CENTER as i32;
        if n % 2 != 0 {
            let window = 0.54 - 0.46 * (2.0 * PI * k as f64 / (HILBERT_TAPS - 1) as f64).cos();
            c[k] = (2.0 / (PI * n as f64) * window) as f32;
        }
    }
    c
}

/// Single-sideband frequency shift via an FIR Hilbert transformer feeding
/// a complex-exponential mixer. Shifts every frequency in the signal by a
/// constant `freqshift_hz`, unlike a pitch shift which scales frequencies.
pub struct FreqShift {
    coeffs: [f32; HILBERT_TAPS],
    ring: [f32; HILBERT_TAPS],
    pos: usize,
    phase: f64,
}

impl FreqShift {
    pub fn new() -> Self {
        Self {
            coeffs: hilbert_coeffs(),
            ring: [0.0; HILBERT_TAPS],
            pos: 0,
            phase: 0.0,
        }
    }

    fn reset_state(&mut self) {
        self.ring = [0.0; HILBERT_TAPS];
        self.pos = 0;
        self.phase = 0.0;
    }

    fn push(&mut self, x: f32) {
        self.ring[self.pos] = x;
        self.pos = (self.pos + 1) % HILBERT_TAPS;
    }

    fn tap(&self, k: usize) -> f32 {
        self.ring[(self.pos + HILBERT_TAPS - 1 - k) % HILBERT_TAPS]
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        let dt = 2.0 * PI * p.freqshift_hz as f64 / sample_rate as f64;
        for sample in chunk.iter_mut() {
            let input = *sample;
            self.push(input);

            if enabled && p.freqshift_hz != 0.0 {
                let mut quad = 0.0f32;
                for k in 0..HILBERT_TAPS {
                    quad += self.coeffs[k] * self.tap(k);
                }
                let real = self.tap(HILBERT_CENTER);
                let (s, c) = self.phase.sin_cos();
                *sample = real * c as f32 - quad * s as f32;
            }
            self.phase += dt;
        }
    }
}

impl Effect for FreqShift {
    fn id(&self) -> EffectId {
        EffectId::FreqShift
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::FreqShift);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::FreqShift);
        self.render(chunk, sample_rate, enabled, params);
    }
}

/// Direct-form-II-transposed biquad section.
#[derive(Clone, Copy, Default)]
pub(crate) struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub(crate) fn bandpass(center_hz: f64, q: f64, sample_rate: u32) -> Self {
        let w0 = 2.0 * PI * center_hz / sample_rate as f64;
        let alpha = w0.sin() / (2.0 * q);
        let (sin_w0, cos_w0) = (w0.sin(), w0.cos());
        let b0 = alpha;
        let b1 = 0.0;
        let b2 = -alpha;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;
        let _ = sin_w0;
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub(crate) fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub(crate) fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Two cascaded RBJ bandpass biquads, approximating a 4th-order
/// Butterworth bandpass. Coefficients are recomputed only when
/// `bandpass_low`/`bandpass_high` change between chunks, not per sample.
pub struct Bandpass {
    stage1: Biquad,
    stage2: Biquad,
    low: f32,
    high: f32,
    sample_rate: u32,
}

impl Bandpass {
    pub fn new() -> Self {
        Self {
            stage1: Biquad::default(),
            stage2: Biquad::default(),
            low: -1.0,
            high: -1.0,
            sample_rate: 0,
        }
    }

    fn reset_state(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
        self.low = -1.0;
        self.high = -1.0;
    }

    fn ensure_coeffs(&mut self, sample_rate: u32, p: &EffectParams) {
        if self.low == p.bandpass_low && self.high == p.bandpass_high && self.sample_rate == sample_rate {
            return;
        }
        let low = p.bandpass_low.max(1.0) as f64;
        let high = p.bandpass_high.max(low as f32 + 1.0) as f64;
        let center = (low * high).sqrt();
        let q = (center / (high - low)).max(0.1);
        self.stage1 = Biquad::bandpass(center, q, sample_rate);
        self.stage2 = Biquad::bandpass(center, q, sample_rate);
        self.low = p.bandpass_low;
        self.high = p.bandpass_high;
        self.sample_rate = sample_rate;
    }

    fn render(&mut self, chunk: &mut [f32], sample_rate: u32, enabled: bool, p: &EffectParams) {
        if !enabled {
            return;
        }
        self.ensure_coeffs(sample_rate, p);
        for s in chunk.iter_mut() {
            let y = self.stage2.process(self.stage1.process(*s as f64));
            *s = y as f32;
        }
    }
}

impl Effect for Bandpass {
    fn id(&self) -> EffectId {
        EffectId::Bandpass
    }

    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams) {
        self.reset_state();
        let enabled = params.enabled(EffectId::Bandpass);
        self.render(audio, sample_rate, enabled, params);
    }

    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams) {
        let enabled = params.enabled(EffectId::Bandpass);
        self.render(chunk, sample_rate, enabled, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectParam;

    #[test]
    fn freqshift_disabled_is_identity() {
        let mut fx = FreqShift::new();
        let params = EffectParams::default();
        let mut audio = vec![0.1, 0.2, -0.3, 0.4];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn freqshift_zero_hz_is_near_identity() {
        let mut fx = FreqShift::new();
        let mut params = EffectParams::default();
        params.apply(EffectParam::Enabled(EffectId::FreqShift, true));
        params.apply(EffectParam::FreqShiftHz(0.0));
        let mut audio = vec![0.1, 0.2, -0.3, 0.4];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn bandpass_disabled_is_identity() {
        let mut fx = Bandpass::new();
        let params = EffectParams::default();
        let mut audio = vec![0.1, 0.2, -0.3, 0.4];
        let original = audio.clone();
        fx.process_batch(&mut audio, 44_100, &params);
        assert_eq!(audio, original);
    }

    #[test]
    fn bandpass_attenuates_out_of_band_tone() {
        let mut fx = Bandpass::new();
        let mut params = EffectParams::default();
        params.apply(EffectParam::Enabled(EffectId::Bandpass, true));
        params.apply(EffectParam::BandpassLow(1000.0));
        params.apply(EffectParam::BandpassHigh(1200.0));
        let sr = 44_100u32;
        let n = 4410;
        let mut low_tone: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 50.0 * i as f64 / sr as f64).sin() as f32)
            .collect();
        fx.process_batch(&mut low_tone, sr, &params);
        let settled = &low_tone[n / 2..];
        let rms: f32 = (settled.iter().map(|s| s * s).sum::<f32>() / settled.len() as f32).sqrt();
        assert!(rms < 0.3);
    }
}
