//! Orchestrator (C8): wires the mode catalogue, image fitter, encoder,
//! effects pipeline, player, and decoder into the three operations an
//! external caller (the CLI, or a test) actually wants: encode an image to
//! audio, decode a recording back to pixels, or transmit live with a
//! decoder following along.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use image::RgbImage;
use tracing::{info, trace};

use crate::config::TransmitSettings;
use crate::decoder::{self, DecodedLine, StreamingDecoder};
use crate::encoder;
use crate::error::Result;
use crate::image_fit::fit_image;
use crate::modes::{self, ModeDescriptor};
use crate::pipeline::ParamSender;
use crate::player::{Player, PlayerStatus, RingBuffer};

/// Resolved mode catalogue, for a CLI `--help`-style listing.
pub fn known_modes() -> Vec<ModeDescriptor> {
    modes::known_modes()
}

/// Fits `image` into `mode_name`'s frame and encodes it to audio. Does not
/// open an audio device; this is the pure encode-only path.
pub fn encode_only(
    image: &RgbImage,
    mode_name: &str,
    native_dims: Option<(u32, u32)>,
) -> Result<(Vec<f32>, ModeDescriptor)> {
    let dims = native_dims.unwrap_or((image.width(), image.height()));
    let mode = modes::resolve(mode_name, dims)?;
    info!(mode = mode.name, width = mode.width, height = mode.height, "resolved mode");

    let (fitted, _crop) = fit_image(image, mode.width, mode.height);
    trace!("image fitted to mode frame");

    let audio = encoder::encode(&fitted, &mode, modes::SAMPLE_RATE);
    info!(samples = audio.len(), "encoded audio");
    Ok((audio, mode))
}

/// Clean-reference decode of a full recording already in memory.
pub fn decode_only(audio: &[f32], mode_name: &str, native_dims: (u32, u32)) -> Result<Vec<DecodedLine>> {
    let mode = modes::resolve(mode_name, native_dims)?;
    decoder::decode_batch(audio, &mode, modes::SAMPLE_RATE)
}

/// A live transmission: an open output stream playing `audio` through the
/// effects pipeline, with a decoder thread following the ring buffer and
/// handing completed effected lines back over `lines()`. Once the whole
/// recording has played out, a second pass decodes the untouched clean
/// audio in batch and hands those reference lines back over
/// `clean_lines()` (§6's `on_effected_line`/`on_clean_line` pair).
pub struct TransmissionHandle {
    player: Player,
    decoder_handle: Option<JoinHandle<()>>,
    completion_handle: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    lines_rx: Receiver<DecodedLine>,
    clean_lines_rx: Receiver<DecodedLine>,
    ring: Arc<RingBuffer>,
    total_samples: u64,
}

impl TransmissionHandle {
    pub fn pause(&self) -> Result<()> {
        self.player.pause()
    }

    pub fn resume(&self) -> Result<()> {
        self.player.resume()
    }

    pub fn param_sender(&self) -> ParamSender {
        self.player.param_sender()
    }

    /// Decoded lines, emitted as the background decoder thread assembles
    /// them from the shared ring buffer (`on_effected_line`).
    pub fn lines(&self) -> &Receiver<DecodedLine> {
        &self.lines_rx
    }

    /// Clean-reference lines, emitted once as a single batch after the
    /// transmission finishes playing, decoded from the pre-effects audio
    /// (`on_clean_line`). Empty until playback completes.
    pub fn clean_lines(&self) -> &Receiver<DecodedLine> {
        &self.clean_lines_rx
    }

    /// Player status: progress, completion, and trapped device errors
    /// (§7's `InternalDSPError` path — the audio callback never panics,
    /// it reports and the caller decides whether to stop).
    pub fn status(&self) -> &Receiver<PlayerStatus> {
        self.player.status()
    }

    /// Playback progress as a percentage (0..=100), derived from the ring
    /// buffer's processed cursor against the total sample count.
    pub fn progress(&self) -> u8 {
        if self.total_samples == 0 {
            return 100;
        }
        let played = self.ring.processed_cursor().min(self.total_samples);
        ((played * 100) / self.total_samples) as u8
    }

    /// A short human-readable summary of `progress()`, for a UI status bar.
    pub fn status_text(&self) -> String {
        let progress = self.progress();
        if progress >= 100 {
            "finished".to_string()
        } else {
            format!("transmitting ({progress}%)")
        }
    }

    /// Stops playback and joins the decoder and completion threads.
    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.decoder_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.completion_handle.take() {
            let _ = handle.join();
        }
        self.player.stop();
    }
}

/// Encodes `image` and starts a real-time transmission of it, with effects
/// live-tunable through the returned handle's [`ParamSender`].
pub fn transmit(image: &RgbImage, settings: &TransmitSettings) -> Result<TransmissionHandle> {
    let (audio, mode) = encode_only(image, &settings.mode_name, settings.native_dims)?;
    let audio = Arc::new(audio);
    let total_samples = audio.len() as u64;
    let clean_audio = audio.clone();
    let clean_mode = mode.clone();

    info!("opening output stream");
    let player = Player::start(
        audio,
        settings.sample_rate,
        settings.ring_capacity,
        settings.initial_params,
    )?;
    let ring = player.ring();

    let stop_flag = Arc::new(AtomicBool::new(false));
    let decoder_stop = stop_flag.clone();
    let sample_rate = settings.sample_rate;
    let (lines_tx, lines_rx): (Sender<DecodedLine>, Receiver<DecodedLine>) = crossbeam_channel::unbounded();
    let (clean_tx, clean_lines_rx): (Sender<DecodedLine>, Receiver<DecodedLine>) = crossbeam_channel::unbounded();

    let decoder_ring = ring.clone();
    let decoder_handle = std::thread::spawn(move || {
        let mut decoder = StreamingDecoder::new(mode, sample_rate);
        while !decoder_stop.load(Ordering::Acquire) {
            for line in decoder.poll(&decoder_ring) {
                trace!(line = line.line_index, "decoded effected line");
                if lines_tx.send(line).is_err() {
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    });

    let completion_ring = ring.clone();
    let completion_stop = stop_flag.clone();
    let completion_handle = std::thread::spawn(move || {
        while !completion_stop.load(Ordering::Acquire) {
            if completion_ring.processed_cursor() >= total_samples {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        if completion_stop.load(Ordering::Acquire) {
            return;
        }
        info!("transmission finished; running clean-reference decode");
        match decoder::decode_batch(&clean_audio, &clean_mode, sample_rate) {
            Ok(lines) => {
                for line in lines {
                    if clean_tx.send(line).is_err() {
                        return;
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "clean-reference decode failed"),
        }
    });

    Ok(TransmissionHandle {
        player,
        decoder_handle: Some(decoder_handle),
        completion_handle: Some(completion_handle),
        stop_flag,
        lines_rx,
        clean_lines_rx,
        ring,
        total_samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_only_produces_expected_length() {
        let img = RgbImage::from_pixel(320, 256, Rgb([10, 20, 30]));
        let (audio, mode) = encode_only(&img, "MartinM1", None).unwrap();
        assert_eq!(audio.len(), mode.audio_len(modes::SAMPLE_RATE));
    }

    #[test]
    fn decode_only_recovers_the_right_number_of_lines() {
        let img = RgbImage::from_pixel(320, 256, Rgb([80, 80, 80]));
        let (audio, _mode) = encode_only(&img, "MartinM1", None).unwrap();
        let lines = decode_only(&audio, "MartinM1", (320, 256)).unwrap();
        assert_eq!(lines.len(), 256);
    }

    #[test]
    fn unknown_mode_is_rejected_before_any_audio_work() {
        let img = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let err = encode_only(&img, "NotAMode", None).unwrap_err();
        assert!(matches!(err, crate::error::SstvError::UnknownMode { .. }));
    }
}
