//! Effects Pipeline (C5): runs the fixed effect chain over a buffer, and
//! exposes a lock-free channel the control thread uses to push live
//! parameter updates into the audio-callback thread.
//!
//! The channel is `thingbuf`'s bounded MPSC, the same crate and `try_recv`
//! drain pattern the teacher uses for its setting listener.

use thingbuf::mpsc::blocking::{channel, Receiver, Sender};

use crate::effects::{build_chain, normalize_peak, Effect, EffectId, EffectParam, EffectParams};
use crate::error::{Result, SstvError};

const UPDATE_QUEUE_CAPACITY: usize = 256;

fn param_domain(param: &EffectParam) -> Option<(&'static str, &'static str, f32, f32, f32)> {
    use EffectParam::*;
    match *param {
        PhaseModDepth(v) => Some(("phasemod", "depth", v, 0.0, 1.0)),
        PhaseModRate(v) => Some(("phasemod", "rate", v, 0.5, 20.0)),
        AmpModDepth(v) => Some(("ampmod", "depth", v, 0.0, 1.0)),
        AmpModRate(v) => Some(("ampmod", "rate", v, 1.0, 25.0)),
        SyncWobbleAmount(v) => Some(("syncwobble", "amount", v, 0.0, 1.0)),
        SyncWobbleFreq(v) => Some(("syncwobble", "freq", v, 0.5, 20.0)),
        SyncDropoutProb(v) => Some(("syncdropout", "prob", v, 0.0, 1.0)),
        SyncDropoutDuration(v) => Some(("syncdropout", "duration", v, 1.0, 20.0)),
        ScanlineFreq(v) => Some(("scanline", "freq", v, 0.0, 1.0)),
        ScanlineIntensity(v) => Some(("scanline", "intensity", v, 0.0, 1.0)),
        NoiseAmount(v) => Some(("noise", "amount", v, 0.0, 1.0)),
        DistortionDrive(v) => Some(("distortion", "drive", v, 0.0, 1.0)),
        DistortionClip(v) => Some(("distortion", "clip", v, 0.0, 1.0)),
        HarmonicAmount(v) => Some(("harmonic", "amount", v, 0.0, 1.0)),
        BitcrushRate(v) => Some(("bitcrush", "rate", v, 1_000.0, 44_100.0)),
        FreqShiftHz(v) => Some(("freqshift", "hz", v, -500.0, 500.0)),
        BandpassLow(v) => Some(("bandpass", "low", v, 100.0, 2_000.0)),
        BandpassHigh(v) => Some(("bandpass", "high", v, 1_000.0, 10_000.0)),
        DelayTime(v) => Some(("delay", "time", v, 3.0, 500.0)),
        DelayFeedback(v) => Some(("delay", "feedback", v, 0.0, 0.9)),
        DelayMix(v) => Some(("delay", "mix", v, 0.0, 1.0)),
        TimeStretchRate(v) => Some(("timestretch", "rate", v, 0.1, 4.0)),
        Enabled(..) | NoiseType(..) | HarmonicCount(..) | BitcrushBits(..) => None,
    }
}

/// Owns the fixed effect chain and the receiving half of the parameter
/// channel. Lives on the audio-callback thread.
pub struct Pipeline {
    chain: Vec<Box<dyn Effect>>,
    params: EffectParams,
    receiver: Receiver<EffectParam>,
    sample_rate: u32,
}

impl Pipeline {
    /// Builds the chain and its update channel. Returns the pipeline (owned
    /// by the audio callback) and a [`ParamSender`] the control thread
    /// clones freely to push updates.
    pub fn new(sample_rate: u32) -> (Self, ParamSender) {
        let (sender, receiver) = channel(UPDATE_QUEUE_CAPACITY);
        (
            Self {
                chain: build_chain(),
                params: EffectParams::default(),
                receiver,
                sample_rate,
            },
            ParamSender { sender },
        )
    }

    /// Drains all pending updates into the live snapshot. Non-blocking:
    /// `try_recv` never waits, so this is safe to call from the audio
    /// callback.
    pub fn drain_updates(&mut self) {
        while let Ok(update) = self.receiver.try_recv() {
            self.params.apply(update);
        }
    }

    /// Runs the chain over `chunk` in the fixed order, carrying effect
    /// state across calls. Called once per audio-callback invocation.
    pub fn process_chunk(&mut self, chunk: &mut [f32]) {
        self.drain_updates();
        for effect in self.chain.iter_mut() {
            effect.process_chunk(chunk, self.sample_rate, &self.params);
        }
        normalize_peak(chunk);
    }

    /// Runs the chain over a full buffer with parameters frozen at their
    /// current values, then normalizes by peak. Used for the clean-reference
    /// decode path and for non-interactive encode/effect CLI invocations.
    pub fn process_batch(&mut self, audio: &mut [f32]) {
        for effect in self.chain.iter_mut() {
            effect.process_batch(audio, self.sample_rate, &self.params);
        }
        normalize_peak(audio);
    }

    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    /// Overwrites the live snapshot outright, used to seed a freshly
    /// created pipeline with a caller-supplied starting configuration
    /// before the first chunk ever plays.
    pub fn seed_params(&mut self, params: EffectParams) {
        self.params = params;
    }

    pub fn set_enabled(&mut self, id: EffectId, enabled: bool) {
        self.params.apply(EffectParam::Enabled(id, enabled));
    }
}

/// The control-thread handle for pushing parameter updates. Cheap to
/// clone; every clone shares the same bounded queue.
#[derive(Clone)]
pub struct ParamSender {
    sender: Sender<EffectParam>,
}

impl ParamSender {
    /// Validates the parameter's declared domain (spec.md §3) before
    /// enqueueing, returning [`SstvError::ParamOutOfRange`] rather than
    /// letting an out-of-range value reach the audio thread.
    pub fn update(&self, param: EffectParam) -> Result<()> {
        if let Some((effect, name, value, lo, hi)) = param_domain(&param) {
            if !(lo..=hi).contains(&value) {
                return Err(SstvError::ParamOutOfRange {
                    effect,
                    param: name,
                    value,
                });
            }
        }
        self.sender
            .send(param)
            .map_err(|_| SstvError::InternalDsp("parameter channel closed".into()))
    }

    pub fn set_enabled(&self, id: EffectId, enabled: bool) -> Result<()> {
        self.sender
            .send(EffectParam::Enabled(id, enabled))
            .map_err(|_| SstvError::InternalDsp("parameter channel closed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_reaches_pipeline_after_drain() {
        let (mut pipeline, sender) = Pipeline::new(44_100);
        sender.update(EffectParam::NoiseAmount(0.7)).unwrap();
        pipeline.drain_updates();
        assert_eq!(pipeline.params().noise_amount, 0.7);
    }

    #[test]
    fn out_of_range_param_is_rejected() {
        let (_pipeline, sender) = Pipeline::new(44_100);
        let err = sender.update(EffectParam::PhaseModDepth(5.0)).unwrap_err();
        assert!(matches!(err, SstvError::ParamOutOfRange { .. }));
    }

    #[test]
    fn disabled_chain_is_near_identity_after_normalize() {
        let (mut pipeline, _sender) = Pipeline::new(44_100);
        let mut audio = vec![0.2f32; 1000];
        pipeline.process_batch(&mut audio);
        assert!(audio.iter().all(|&s| (s - 0.2).abs() < 1e-6));
    }

    #[test]
    fn enabling_an_effect_changes_chunk_output() {
        let (mut pipeline, _sender) = Pipeline::new(44_100);
        pipeline.set_enabled(EffectId::AmpMod, true);
        let mut chunk = vec![1.0f32; 2000];
        pipeline.process_chunk(&mut chunk);
        assert!(chunk.iter().any(|&s| (s - 1.0).abs() > 1e-6));
    }
}
