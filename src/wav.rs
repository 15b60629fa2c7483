//! WAV file writing: 16-bit PCM mono at a fixed sample rate.
//!
//! Grounded on the teacher's `write.rs`, generalized from `Wave`'s
//! multi-channel sample store to a bare `&[f32]` mono buffer and narrowed
//! to the one format this crate's optional file I/O (§6) actually needs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write32<W: Write>(writer: &mut W, x: u32) -> std::io::Result<()> {
    writer.write_all(&x.to_le_bytes())
}

fn write16<W: Write>(writer: &mut W, x: u16) -> std::io::Result<()> {
    writer.write_all(&x.to_le_bytes())
}

fn write_header<W: Write>(writer: &mut W, data_len: usize, sample_rate: u32) -> std::io::Result<()> {
    writer.write_all(b"RIFF")?;
    write32(writer, data_len as u32 + 36)?;
    writer.write_all(b"WAVE")?;
    writer.write_all(b"fmt ")?;
    write32(writer, 16)?;
    write16(writer, 1)?; // WAVE_FORMAT_PCM
    write16(writer, 1)?; // mono
    write32(writer, sample_rate)?;
    write32(writer, sample_rate * 2)?; // byte rate: sample_rate * channels * bytes_per_sample
    write16(writer, 2)?; // block align
    write16(writer, 16)?; // bits per sample
    writer.write_all(b"data")?;
    write32(writer, data_len as u32)
}

/// Maps one float sample to a clamped 16-bit PCM value, per spec.md §6:
/// `round(sample * 32767)` clamped to `i16`'s range.
fn quantize(sample: f32) -> i16 {
    let scaled = (sample as f64 * 32767.0).round();
    scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Writes `audio` as a 16-bit PCM mono WAV stream.
pub fn write_wav16<W: Write>(writer: &mut W, audio: &[f32], sample_rate: u32) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    write_header(&mut writer, audio.len() * 2, sample_rate)?;
    for &sample in audio {
        write16(&mut writer, quantize(sample) as u16)?;
    }
    writer.flush()
}

/// Writes `audio` to a 16-bit PCM mono WAV file at `path`.
pub fn save_wav16<P: AsRef<Path>>(path: P, audio: &[f32], sample_rate: u32) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    write_wav16(&mut file, audio, sample_rate)
}
