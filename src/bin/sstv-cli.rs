//! Command-line front end for `sstv_core`: encode an image to a WAV file,
//! batch-decode a WAV file back to line statistics, or transmit an image
//! live on the default output device.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sstv_core::{error::Result, orchestrator};
use tracing::info;

#[derive(Parser)]
#[command(name = "sstv-cli", about = "Encode, decode, and transmit SSTV images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode an image into an SSTV WAV file.
    Encode {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value = "MartinM1")]
        mode: String,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Decode an SSTV WAV file and print per-line mean intensity.
    Decode {
        #[arg(long)]
        wav: PathBuf,
        #[arg(long, default_value = "MartinM1")]
        mode: String,
        #[arg(long, default_value_t = 320)]
        width: u32,
        #[arg(long, default_value_t = 256)]
        height: u32,
    },
    /// Transmit an image live on the default output device, no effects.
    Transmit {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value = "MartinM1")]
        mode: String,
    },
    /// List known modes and their frame dimensions.
    Modes,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Encode { image, mode, width, height, out } => {
            let img = image::open(&image)?.into_rgb8();
            let native_dims = match (width, height) {
                (Some(w), Some(h)) => Some((w, h)),
                _ => None,
            };
            let (audio, resolved) = orchestrator::encode_only(&img, &mode, native_dims)?;
            info!(mode = resolved.name, samples = audio.len(), "encoded");
            sstv_core::wav::save_wav16(&out, &audio, sstv_core::modes::SAMPLE_RATE)
                .map_err(|e| sstv_core::error::SstvError::InternalDsp(e.to_string()))?;
            println!("wrote {} samples to {}", audio.len(), out.display());
        }
        Command::Decode { wav, mode, width, height } => {
            let samples = read_wav16(&wav)?;
            let lines = orchestrator::decode_only(&samples, &mode, (width, height))?;
            for line in &lines {
                let mean = line.channels[0].iter().map(|&p| p as f64).sum::<f64>()
                    / line.channels[0].len().max(1) as f64;
                println!("line {:>4}: mean={:.1}", line.line_index, mean);
            }
        }
        Command::Transmit { image, mode } => {
            let img = image::open(&image)?.into_rgb8();
            let mut settings = sstv_core::config::TransmitSettings::default();
            settings.mode_name = mode;
            let handle = orchestrator::transmit(&img, &settings)?;
            info!("transmitting; press Ctrl+C to stop");
            loop {
                match handle.status().recv() {
                    Ok(sstv_core::player::PlayerStatus::Finished) => break,
                    Ok(sstv_core::player::PlayerStatus::Error(e)) => {
                        eprintln!("stream error: {e}");
                        break;
                    }
                    Ok(sstv_core::player::PlayerStatus::Progress { .. }) => {}
                    Err(_) => break,
                }
            }
            handle.stop();
        }
        Command::Modes => {
            for mode in orchestrator::known_modes() {
                println!("{:<12} {}x{}", mode.name, mode.width, mode.height);
            }
        }
    }

    Ok(())
}

/// Reads a 16-bit PCM mono WAV file's samples back to `f32`. Minimal
/// reader covering exactly what this crate's own `wav::save_wav16` writes;
/// not a general-purpose WAV parser.
fn read_wav16(path: &PathBuf) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)
        .map_err(|e| sstv_core::error::SstvError::InternalDsp(e.to_string()))?;
    if bytes.len() < 44 {
        return Err(sstv_core::error::SstvError::InternalDsp(
            "file too short to be a WAV".into(),
        ));
    }
    let data = &bytes[44..];
    let mut samples = Vec::with_capacity(data.len() / 2);
    for chunk in data.chunks_exact(2) {
        let v = i16::from_le_bytes([chunk[0], chunk[1]]);
        samples.push(v as f32 / 32767.0);
    }
    Ok(samples)
}
