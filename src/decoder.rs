//! Streaming Decoder (C7): recovers pixel rows from FM-modulated SSTV
//! audio, either incrementally from the player's ring buffer or in one
//! batch pass over a full recording.
//!
//! Demodulation is instantaneous frequency: the derivative of the unwrapped
//! phase of the signal's analytic form, scaled by `sample_rate / 2*pi`. The
//! streaming path gets its analytic signal from the same FIR Hilbert
//! transformer used by the `freqshift` effect (see
//! [`crate::effects::frequency`]); the batch path instead builds it with a
//! full-signal FFT, which is exact rather than an approximation bounded by
//! the FIR's tap count, at the cost of needing the whole recording in hand.

use std::f64::consts::PI;

use realfft::RealFftPlanner;

use crate::effects::frequency::Biquad;
use crate::encoder::freq_to_pixel;
use crate::error::Result;
use crate::modes::{line_layout, ModeDescriptor, Segment};
use crate::player::RingBuffer;

/// One fully reassembled scanline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub line_index: usize,
    /// Pixel rows in the mode's channel order (see [`crate::modes::ChannelOrder`]).
    pub channels: [Vec<u8>; 3],
}

const HILBERT_TAPS: usize = 31;
const HILBERT_CENTER: usize = HILBERT_TAPS / 2;

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

/// FIR-based running analytic signal plus phase unwrapping, carried across
/// calls so a streaming decoder can compute instantaneous frequency one
/// sample at a time.
struct AnalyticTracker {
    coeffs: [f32; HILBERT_TAPS],
    ring: [f32; HILBERT_TAPS],
    pos: usize,
    prev_phase: f64,
    primed: bool,
}

impl AnalyticTracker {
    fn new() -> Self {
        Self {
            coeffs: hilbert_coeffs(),
            ring: [0.0; HILBERT_TAPS],
            pos: 0,
            prev_phase: 0.0,
            primed: false,
        }
    }

    fn tap(&self, k: usize) -> f32 {
        self.ring[(self.pos + HILBERT_TAPS - 1 - k) % HILBERT_TAPS]
    }

    /// Pushes one real sample and returns the instantaneous frequency in Hz.
    fn push(&mut self, x: f32, sample_rate: u32) -> f64 {
        self.ring[self.pos] = x;
        self.pos = (self.pos + 1) % HILBERT_TAPS;

        let mut quad = 0.0f32;
        for k in 0..HILBERT_TAPS {
            quad += self.coeffs[k] * self.tap(k);
        }
        let real = self.tap(HILBERT_CENTER);
        let phase = (quad as f64).atan2(real as f64);

        if !self.primed {
            self.primed = true;
            self.prev_phase = phase;
            return 1500.0; // first sample: report the black-level tone rather than a spurious jump.
        }

        let mut delta = phase - self.prev_phase;
        while delta > PI {
            delta -= 2.0 * PI;
        }
        while delta < -PI {
            delta += 2.0 * PI;
        }
        self.prev_phase = phase;
        delta * sample_rate as f64 / (2.0 * PI)
    }
}

/// Accumulates instantaneous-frequency samples into a mode's segment
/// layout, turning them into pixel rows one line at a time.
struct LineAssembler {
    mode: ModeDescriptor,
    sample_rate: u32,
    layout: Vec<Segment>,
    buf: Vec<f64>,
    line_index: usize,
}

impl LineAssembler {
    fn new(mode: ModeDescriptor, sample_rate: u32) -> Self {
        let layout = line_layout(&mode);
        Self {
            mode,
            sample_rate,
            layout,
            buf: Vec::new(),
            line_index: 0,
        }
    }

    fn target_len(&self) -> usize {
        self.mode.line_samples(self.sample_rate)
    }

    /// Feeds one instantaneous-frequency sample; returns a completed line
    /// when enough samples for it have accumulated.
    fn feed(&mut self, freq_hz: f64) -> Option<DecodedLine> {
        self.buf.push(freq_hz);
        if self.buf.len() < self.target_len() {
            return None;
        }
        let line = self.build_line();
        self.buf.clear();
        Some(line)
    }

    fn build_line(&mut self) -> DecodedLine {
        let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut pos = 0usize;
        for seg in &self.layout {
            match seg {
                Segment::Sync => pos += self.mode.sync_samples(self.sample_rate),
                Segment::Gap => pos += self.mode.gap_samples(self.sample_rate),
                Segment::Scan(ch) => {
                    let n = self.mode.scan_samples(*ch, self.sample_rate);
                    let slice = &self.buf[pos..(pos + n).min(self.buf.len())];
                    channels[*ch] = slice
                        .iter()
                        .map(|&f| freq_to_pixel(f))
                        .collect();
                    pos += n;
                }
            }
        }
        let line = DecodedLine {
            line_index: self.line_index,
            channels,
        };
        self.line_index += 1;
        line
    }
}

/// Streaming decoder: polls a [`RingBuffer`] and emits whatever full lines
/// have become available since the last poll. Designed to run on its own
/// thread, independent of the audio callback.
pub struct StreamingDecoder {
    bandpass1: Biquad,
    bandpass2: Biquad,
    analytic: AnalyticTracker,
    assembler: LineAssembler,
    sample_rate: u32,
    consumed: u64,
    scratch: Vec<f32>,
}

impl StreamingDecoder {
    pub fn new(mode: ModeDescriptor, sample_rate: u32) -> Self {
        let center = (SYNC_BAND.0 * SYNC_BAND.1).sqrt();
        let q = center / (SYNC_BAND.1 - SYNC_BAND.0);
        Self {
            bandpass1: Biquad::bandpass(center, q, sample_rate),
            bandpass2: Biquad::bandpass(center, q, sample_rate),
            analytic: AnalyticTracker::new(),
            assembler: LineAssembler::new(mode, sample_rate),
            sample_rate,
            consumed: 0,
            scratch: Vec::new(),
        }
    }

    /// Reads whatever the ring buffer has accumulated since the last call
    /// and returns any lines that became complete as a result. Never
    /// blocks: if the ring buffer hasn't advanced, returns an empty vec.
    pub fn poll(&mut self, ring: &RingBuffer) -> Vec<DecodedLine> {
        ring.copy_latest(&mut self.scratch);
        let cursor = ring.processed_cursor();
        let total_held = self.scratch.len() as u64;
        let dropped = cursor.saturating_sub(total_held);
        let new_from = self.consumed.saturating_sub(dropped);
        let mut out = Vec::new();
        if new_from >= total_held {
            self.consumed = cursor;
            return out;
        }
        for &sample in &self.scratch[new_from as usize..] {
            let filtered = self.bandpass2.process(self.bandpass1.process(sample as f64)) as f32;
            let freq = self.analytic.push(filtered, self.sample_rate);
            if let Some(line) = self.assembler.feed(freq) {
                out.push(line);
            }
        }
        self.consumed = cursor;
        out
    }
}

/// 1200-2300 Hz covers sync, black, and white tones with margin.
const SYNC_BAND: (f64, f64) = (1000.0, 2500.0);

/// Zero-phase (forward-backward) Butterworth-style bandpass over a full
/// buffer: filters forward, reverses, filters again, reverses back. The
/// double pass squares the magnitude response but cancels phase distortion,
/// unlike the streaming path's single causal pass.
fn zero_phase_bandpass(audio: &[f32], sample_rate: u32) -> Vec<f32> {
    let center = (SYNC_BAND.0 * SYNC_BAND.1).sqrt();
    let q = center / (SYNC_BAND.1 - SYNC_BAND.0);

    let mut pass = |input: &[f32]| -> Vec<f32> {
        let mut s1 = Biquad::bandpass(center, q, sample_rate);
        let mut s2 = Biquad::bandpass(center, q, sample_rate);
        input
            .iter()
            .map(|&x| s2.process(s1.process(x as f64)) as f32)
            .collect()
    };

    let forward = pass(audio);
    let mut reversed = forward;
    reversed.reverse();
    let mut backward = pass(&reversed);
    backward.reverse();
    backward
}

/// Builds the analytic signal of a whole buffer via a single FFT round
/// trip: FFT, double the positive-frequency bins, zero the negative ones,
/// inverse FFT.
fn analytic_signal_fft(audio: &[f32]) -> Vec<num_complex::Complex<f32>> {
    use num_complex::Complex32;

    let n = audio.len().max(1);
    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut input = audio.to_vec();
    input.resize(n, 0.0);
    let mut spectrum = fft.make_output_vec();
    fft.process(&mut input, &mut spectrum).expect("fft forward");

    // Reconstruct the full complex spectrum from the real-input half
    // spectrum, doubling positive frequencies for the analytic signal and
    // zeroing negative ones.
    let mut full = vec![Complex32::new(0.0, 0.0); n];
    full[0] = spectrum[0];
    let nyquist = n / 2;
    for k in 1..spectrum.len().saturating_sub(1).min(nyquist) {
        full[k] = spectrum[k] * 2.0;
    }
    if n % 2 == 0 && nyquist < spectrum.len() {
        full[nyquist] = spectrum[nyquist];
    }

    let mut c_planner = rustfft::FftPlanner::<f32>::new();
    let ifft = c_planner.plan_fft_inverse(n);
    ifft.process(&mut full);
    for c in full.iter_mut() {
        *c /= n as f32;
    }
    full
}

fn instantaneous_freq_from_analytic(analytic: &[num_complex::Complex<f32>], sample_rate: u32) -> Vec<f64> {
    let mut out = Vec::with_capacity(analytic.len());
    let mut prev_phase = 0.0f64;
    for (i, z) in analytic.iter().enumerate() {
        let phase = (z.im as f64).atan2(z.re as f64);
        if i == 0 {
            out.push(1500.0);
            prev_phase = phase;
            continue;
        }
        let mut delta = phase - prev_phase;
        while delta > PI {
            delta -= 2.0 * PI;
        }
        while delta < -PI {
            delta += 2.0 * PI;
        }
        prev_phase = phase;
        out.push(delta * sample_rate as f64 / (2.0 * PI));
    }
    out
}

/// Clean-reference batch decode: filters and demodulates the whole buffer
/// at once, then slices it into lines. Used for the "decode" CLI/test path
/// where the full recording is already in memory.
pub fn decode_batch(audio: &[f32], mode: &ModeDescriptor, sample_rate: u32) -> Result<Vec<DecodedLine>> {
    let filtered = zero_phase_bandpass(audio, sample_rate);
    let analytic = analytic_signal_fft(&filtered);
    let freqs = instantaneous_freq_from_analytic(&analytic, sample_rate);

    let mut assembler = LineAssembler::new(mode.clone(), sample_rate);
    let mut lines = Vec::new();
    for freq in freqs {
        if let Some(line) = assembler.feed(freq) {
            lines.push(line);
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use crate::modes::resolve;
    use image::{Rgb, RgbImage};

    #[test]
    fn batch_roundtrip_recovers_approximate_gray_line() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([128, 128, 128]));
        let audio = encode(&img, &mode, 44_100);
        let lines = decode_batch(&audio, &mode, 44_100).unwrap();
        assert_eq!(lines.len(), 256);
        let first = &lines[0];
        let mean = first.channels[0].iter().map(|&p| p as f64).sum::<f64>()
            / first.channels[0].len() as f64;
        assert!((mean - 128.0).abs() < 40.0);
    }

    #[test]
    fn streaming_decoder_emits_lines_as_ring_buffer_fills() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([200, 50, 90]));
        let audio = encode(&img, &mode, 44_100);

        let ring = RingBuffer::new(audio.len() + 1024);
        let mut decoder = StreamingDecoder::new(mode, 44_100);

        let mut total_lines = 0usize;
        for chunk in audio.chunks(4096) {
            ring.push_slice(chunk);
            total_lines += decoder.poll(&ring).len();
        }
        assert!(total_lines >= 250);
    }

    #[test]
    fn decoded_line_indices_strictly_increase_from_zero() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([60, 150, 200]));
        let audio = encode(&img, &mode, 44_100);

        let ring = RingBuffer::new(audio.len() + 1024);
        let mut decoder = StreamingDecoder::new(mode, 44_100);

        let mut indices = Vec::new();
        for chunk in audio.chunks(2048) {
            ring.push_slice(chunk);
            indices.extend(decoder.poll(&ring).into_iter().map(|l| l.line_index));
        }
        for pair in indices.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
        assert_eq!(indices.first().copied(), Some(0));
    }

    /// Scenario 6: pausing mid-transmission (no new samples pushed to the
    /// ring for a while, as happens while `Player::pause` holds the stream)
    /// must not lose or duplicate lines once pushing resumes, and the
    /// decoded rows must match an uninterrupted run byte for byte.
    #[test]
    fn scenario_6_pause_resume_yields_identical_lines_to_an_uninterrupted_run() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([30, 200, 120]));
        let audio = encode(&img, &mode, 44_100);

        let uninterrupted_ring = RingBuffer::new(audio.len() + 1024);
        let mut uninterrupted_decoder = StreamingDecoder::new(mode.clone(), 44_100);
        let mut uninterrupted_lines = Vec::new();
        for chunk in audio.chunks(4096) {
            uninterrupted_ring.push_slice(chunk);
            uninterrupted_lines.extend(uninterrupted_decoder.poll(&uninterrupted_ring));
        }

        let paused_ring = RingBuffer::new(audio.len() + 1024);
        let mut paused_decoder = StreamingDecoder::new(mode, 44_100);
        let mut paused_lines = Vec::new();
        let pause_before_chunk = 10;
        let extra_idle_polls = 50;
        for (i, chunk) in audio.chunks(4096).enumerate() {
            if i == pause_before_chunk {
                for _ in 0..extra_idle_polls {
                    paused_lines.extend(paused_decoder.poll(&paused_ring));
                }
            }
            paused_ring.push_slice(chunk);
            paused_lines.extend(paused_decoder.poll(&paused_ring));
        }

        assert_eq!(paused_lines.len(), 256);
        assert_eq!(paused_lines, uninterrupted_lines);
    }
}
