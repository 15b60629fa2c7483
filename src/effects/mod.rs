//! Effects (C4): a fixed catalogue of audio effects, each supporting batch
//! and chunked-with-live-params processing.
//!
//! Per the design notes, the parameter space is a tagged variant rather than
//! a `(String, String)` pair: this gives the update channel a concrete
//! payload size and removes string comparisons from the audio callback.

pub mod distortion;
pub mod frequency;
pub mod modulation;
pub mod noise;
pub mod sync;
pub mod time;

use distortion::{Bitcrush, Distortion, Harmonic};
use frequency::{Bandpass, FreqShift};
use modulation::{AmpMod, PhaseMod};
use noise::Noise;
use sync::{Scanline, SyncDropout, SyncWobble};
use time::{Delay, TimeStretch};

/// Identifies one of the thirteen effects. The order of this enum's
/// variants is the fixed processing order (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectId {
    PhaseMod,
    AmpMod,
    SyncWobble,
    SyncDropout,
    Scanline,
    Noise,
    Distortion,
    Harmonic,
    Bitcrush,
    FreqShift,
    Bandpass,
    Delay,
    TimeStretch,
}

pub const EFFECT_ORDER: [EffectId; 13] = [
    EffectId::PhaseMod,
    EffectId::AmpMod,
    EffectId::SyncWobble,
    EffectId::SyncDropout,
    EffectId::Scanline,
    EffectId::Noise,
    EffectId::Distortion,
    EffectId::Harmonic,
    EffectId::Bitcrush,
    EffectId::FreqShift,
    EffectId::Bandpass,
    EffectId::Delay,
    EffectId::TimeStretch,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseType {
    White,
    Pink,
    Gaussian,
    Crackle,
}

/// A single parameter update, as enqueued on the SPSC channel by
/// [`crate::pipeline::Pipeline::update_param`] and drained by the audio
/// callback into a live [`EffectParams`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectParam {
    Enabled(EffectId, bool),
    PhaseModDepth(f32),
    PhaseModRate(f32),
    AmpModDepth(f32),
    AmpModRate(f32),
    SyncWobbleAmount(f32),
    SyncWobbleFreq(f32),
    SyncDropoutProb(f32),
    SyncDropoutDuration(f32),
    ScanlineFreq(f32),
    ScanlineIntensity(f32),
    NoiseAmount(f32),
    NoiseType(NoiseType),
    DistortionDrive(f32),
    DistortionClip(f32),
    HarmonicAmount(f32),
    HarmonicCount(u8),
    BitcrushBits(u8),
    BitcrushRate(f32),
    FreqShiftHz(f32),
    BandpassLow(f32),
    BandpassHigh(f32),
    DelayTime(f32),
    DelayFeedback(f32),
    DelayMix(f32),
    TimeStretchRate(f32),
}

/// The pipeline's live parameter snapshot, owned and mutated only by the
/// audio-callback thread after it drains the update channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    pub enabled: [bool; 13],
    pub phasemod_depth: f32,
    pub phasemod_rate: f32,
    pub ampmod_depth: f32,
    pub ampmod_rate: f32,
    pub syncwobble_amount: f32,
    pub syncwobble_freq: f32,
    pub syncdropout_prob: f32,
    pub syncdropout_duration: f32,
    pub scanline_freq: f32,
    pub scanline_intensity: f32,
    pub noise_amount: f32,
    pub noise_type: NoiseType,
    pub distortion_drive: f32,
    pub distortion_clip: f32,
    pub harmonic_amount: f32,
    pub harmonic_count: u8,
    pub bitcrush_bits: u8,
    pub bitcrush_rate: f32,
    pub freqshift_hz: f32,
    pub bandpass_low: f32,
    pub bandpass_high: f32,
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub timestretch_rate: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        EffectParams {
            enabled: [false; 13],
            phasemod_depth: 0.3,
            phasemod_rate: 3.0,
            ampmod_depth: 0.3,
            ampmod_rate: 5.0,
            syncwobble_amount: 0.3,
            syncwobble_freq: 2.0,
            syncdropout_prob: 0.2,
            syncdropout_duration: 5.0,
            scanline_freq: 0.2,
            scanline_intensity: 0.5,
            noise_amount: 0.1,
            noise_type: NoiseType::White,
            distortion_drive: 0.3,
            distortion_clip: 0.5,
            harmonic_amount: 0.2,
            harmonic_count: 2,
            bitcrush_bits: 8,
            bitcrush_rate: 22_050.0,
            freqshift_hz: 0.0,
            bandpass_low: 1000.0,
            bandpass_high: 2500.0,
            delay_time: 50.0,
            delay_feedback: 0.3,
            delay_mix: 0.3,
            timestretch_rate: 1.0,
        }
    }
}

impl EffectParams {
    fn idx(id: EffectId) -> usize {
        EFFECT_ORDER.iter().position(|e| *e == id).unwrap()
    }

    pub fn enabled(&self, id: EffectId) -> bool {
        self.enabled[Self::idx(id)]
    }

    /// Apply one drained parameter update to the live snapshot. Clamping to
    /// the declared parameter domains happens at the pipeline's ingestion
    /// boundary (`Pipeline::update_param`), not here: by the time a value
    /// reaches this snapshot it is already in-range.
    pub fn apply(&mut self, param: EffectParam) {
        match param {
            EffectParam::Enabled(id, v) => self.enabled[Self::idx(id)] = v,
            EffectParam::PhaseModDepth(v) => self.phasemod_depth = v,
            EffectParam::PhaseModRate(v) => self.phasemod_rate = v,
            EffectParam::AmpModDepth(v) => self.ampmod_depth = v,
            EffectParam::AmpModRate(v) => self.ampmod_rate = v,
            EffectParam::SyncWobbleAmount(v) => self.syncwobble_amount = v,
            EffectParam::SyncWobbleFreq(v) => self.syncwobble_freq = v,
            EffectParam::SyncDropoutProb(v) => self.syncdropout_prob = v,
            EffectParam::SyncDropoutDuration(v) => self.syncdropout_duration = v,
            EffectParam::ScanlineFreq(v) => self.scanline_freq = v,
            EffectParam::ScanlineIntensity(v) => self.scanline_intensity = v,
            EffectParam::NoiseAmount(v) => self.noise_amount = v,
            EffectParam::NoiseType(v) => self.noise_type = v,
            EffectParam::DistortionDrive(v) => self.distortion_drive = v,
            EffectParam::DistortionClip(v) => self.distortion_clip = v,
            EffectParam::HarmonicAmount(v) => self.harmonic_amount = v,
            EffectParam::HarmonicCount(v) => self.harmonic_count = v,
            EffectParam::BitcrushBits(v) => self.bitcrush_bits = v,
            EffectParam::BitcrushRate(v) => self.bitcrush_rate = v,
            EffectParam::FreqShiftHz(v) => self.freqshift_hz = v,
            EffectParam::BandpassLow(v) => self.bandpass_low = v,
            EffectParam::BandpassHigh(v) => self.bandpass_high = v,
            EffectParam::DelayTime(v) => self.delay_time = v,
            EffectParam::DelayFeedback(v) => self.delay_feedback = v,
            EffectParam::DelayMix(v) => self.delay_mix = v,
            EffectParam::TimeStretchRate(v) => self.timestretch_rate = v,
        }
    }
}

/// Common entry points every effect supports: a batch pass for the offline
/// clean-reference decode, and a chunked pass for the real-time callback.
pub trait Effect: Send {
    fn id(&self) -> EffectId;

    /// Process a full buffer in one shot with parameters frozen at their
    /// values in `params`. Resets internal state first so batch runs are
    /// independent of any prior chunked playback.
    fn process_batch(&mut self, audio: &mut [f32], sample_rate: u32, params: &EffectParams);

    /// Process one chunk, carrying state over from the previous call.
    fn process_chunk(&mut self, chunk: &mut [f32], sample_rate: u32, params: &EffectParams);
}

/// Instantiates one boxed effect per catalogue entry, in the fixed order.
pub fn build_chain() -> Vec<Box<dyn Effect>> {
    vec![
        Box::new(PhaseMod::new()),
        Box::new(AmpMod::new()),
        Box::new(SyncWobble::new()),
        Box::new(SyncDropout::new()),
        Box::new(Scanline::new()),
        Box::new(Noise::new()),
        Box::new(Distortion::new()),
        Box::new(Harmonic::new()),
        Box::new(Bitcrush::new()),
        Box::new(FreqShift::new()),
        Box::new(Bandpass::new()),
        Box::new(Delay::new()),
        Box::new(TimeStretch::new()),
    ]
}

/// Normalizes `audio` in place by its peak if the peak exceeds unity.
pub fn normalize_peak(audio: &mut [f32]) {
    let peak = audio.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 1.0 {
        for s in audio.iter_mut() {
            *s /= peak;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_order_matches_all_variants_exactly_once() {
        assert_eq!(EFFECT_ORDER.len(), 13);
        for id in EFFECT_ORDER {
            assert_eq!(EffectParams::idx(id), EFFECT_ORDER.iter().position(|e| *e == id).unwrap());
        }
    }

    #[test]
    fn default_params_have_every_effect_disabled() {
        let p = EffectParams::default();
        assert!(EFFECT_ORDER.iter().all(|id| !p.enabled(*id)));
    }

    #[test]
    fn apply_updates_only_the_targeted_field() {
        let mut p = EffectParams::default();
        p.apply(EffectParam::Enabled(EffectId::Noise, true));
        assert!(p.enabled(EffectId::Noise));
        assert!(!p.enabled(EffectId::Bandpass));
    }
}
