//! SSTV Encoder (C3): synthesize phase-continuous FM audio from a fitted
//! image and a mode descriptor.

use std::f64::consts::TAU;

use image::RgbImage;

use crate::modes::{line_layout, ChannelOrder, ModeDescriptor, Segment, BLACK_HZ, SYNC_HZ};

/// Maps an 8-bit pixel intensity to its instantaneous frequency in Hz.
#[inline]
pub fn pixel_to_freq(value: u8) -> f64 {
    1500.0 + (value as f64 / 255.0) * 800.0
}

/// Maps an instantaneous frequency in Hz back to an 8-bit pixel intensity.
#[inline]
pub fn freq_to_pixel(freq_hz: f64) -> u8 {
    (((freq_hz - 1500.0) / 800.0).clamp(0.0, 1.0) * 255.0).round() as u8
}

fn rgb_to_ycrcb(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    let cr = ((rf - y) * 0.713 + 128.0).clamp(0.0, 255.0);
    let cb = ((bf - y) * 0.564 + 128.0).clamp(0.0, 255.0);
    (y.clamp(0.0, 255.0) as u8, cr as u8, cb as u8)
}

/// Row of three channel-sample arrays, in transmission order.
fn channel_rows(image: &RgbImage, y: u32, order: ChannelOrder) -> [Vec<u8>; 3] {
    let width = image.width();
    let mut rows = [
        Vec::with_capacity(width as usize),
        Vec::with_capacity(width as usize),
        Vec::with_capacity(width as usize),
    ];
    for x in 0..width {
        let p = image.get_pixel(x, y);
        let (r, g, b) = (p[0], p[1], p[2]);
        let triplet = match order {
            ChannelOrder::Gbr => (g, b, r),
            ChannelOrder::Rgb => (r, g, b),
            ChannelOrder::YCrCb => rgb_to_ycrcb(r, g, b),
        };
        rows[0].push(triplet.0);
        rows[1].push(triplet.1);
        rows[2].push(triplet.2);
    }
    rows
}

/// Running phase accumulator carried across the whole encode pass.
struct Phase(f64);

impl Phase {
    fn tone(&mut self, audio: &mut Vec<f32>, freq_hz: f64, n_samples: usize, sample_rate: u32) {
        let step = TAU * freq_hz / sample_rate as f64;
        for _ in 0..n_samples {
            self.0 += step;
            audio.push(self.0.sin() as f32);
        }
        self.0 %= TAU;
    }

    /// Sweeps through `pixels` resampled to `n_samples`, nearest-equally-
    /// spaced with linear interpolation between pixel positions.
    fn scan(&mut self, audio: &mut Vec<f32>, pixels: &[u8], n_samples: usize, sample_rate: u32) {
        let w = pixels.len();
        for n in 0..n_samples {
            let pos = if n_samples > 1 {
                n as f64 * (w - 1) as f64 / (n_samples - 1) as f64
            } else {
                0.0
            };
            let idx0 = pos.floor() as usize;
            let idx1 = (idx0 + 1).min(w - 1);
            let frac = pos - idx0 as f64;
            let v0 = pixels[idx0] as f64;
            let v1 = pixels[idx1] as f64;
            let value = v0 + (v1 - v0) * frac;
            let freq = 1500.0 + (value / 255.0) * 800.0;
            self.0 += TAU * freq / sample_rate as f64;
            audio.push(self.0.sin() as f32);
        }
        self.0 %= TAU;
    }
}

/// Encode a fitted image into phase-continuous FM audio.
///
/// `image` must already be `mode.width` x `mode.height` (apply
/// [`crate::image_fit::fit_image`] first). Encoding itself is total; the
/// only failure mode for mode resolution lives in [`crate::modes::resolve`].
pub fn encode(image: &RgbImage, mode: &ModeDescriptor, sample_rate: u32) -> Vec<f32> {
    let mut audio = Vec::with_capacity(mode.audio_len(sample_rate));
    let mut phase = Phase(0.0);

    phase.tone(&mut audio, SYNC_HZ, mode.header_samples(sample_rate), sample_rate);

    let layout = line_layout(mode);
    for y in 0..mode.height {
        let rows = channel_rows(image, y, mode.channel_order);
        for seg in &layout {
            match seg {
                Segment::Sync => phase.tone(&mut audio, SYNC_HZ, mode.sync_samples(sample_rate), sample_rate),
                Segment::Gap => phase.tone(&mut audio, BLACK_HZ, mode.gap_samples(sample_rate), sample_rate),
                Segment::Scan(ch) => {
                    phase.scan(&mut audio, &rows[*ch], mode.scan_samples(*ch, sample_rate), sample_rate)
                }
            }
        }
    }

    debug_assert_eq!(audio.len(), mode.audio_len(sample_rate));
    audio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::resolve;
    use image::Rgb;

    #[test]
    fn encoded_length_matches_invariant() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([0, 0, 0]));
        let audio = encode(&img, &mode, 44_100);
        assert_eq!(audio.len(), mode.audio_len(44_100));
    }

    #[test]
    fn every_sample_is_in_range() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([128, 64, 200]));
        let audio = encode(&img, &mode, 44_100);
        assert!(audio.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn phase_is_continuous_no_clicks() {
        let mode = resolve("MartinM1", (320, 256)).unwrap();
        let img = RgbImage::from_pixel(320, 256, Rgb([255, 0, 255]));
        let audio = encode(&img, &mode, 44_100);
        let max_step = 2.0 * (std::f64::consts::PI * 2300.0 / 44100.0).sin();
        for w in audio.windows(2) {
            assert!((w[1] - w[0]).abs() as f64 <= max_step + 1e-6);
        }
    }
}
