//! Crate-wide error taxonomy (SPEC_FULL.md §7).

use thiserror::Error;

/// Errors surfaced across the public API boundary.
///
/// Errors prior to starting the audio device are returned synchronously;
/// errors during playback are reported through [`crate::orchestrator::TransmissionHandle::on_error`]
/// instead of propagating here.
#[derive(Debug, Error)]
pub enum SstvError {
    #[error("unknown SSTV mode: {name}")]
    UnknownMode { name: String },

    #[error("failed to decode source image")]
    ImageDecode(#[from] image::ImageError),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("parameter {effect}.{param} = {value} is out of range")]
    ParamOutOfRange {
        effect: &'static str,
        param: &'static str,
        value: f32,
    },

    #[error("internal DSP error: {0}")]
    InternalDsp(String),
}

impl From<cpal::DefaultStreamConfigError> for SstvError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        SstvError::AudioDevice(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for SstvError {
    fn from(e: cpal::BuildStreamError) -> Self {
        SstvError::AudioDevice(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for SstvError {
    fn from(e: cpal::PlayStreamError) -> Self {
        SstvError::AudioDevice(e.to_string())
    }
}

impl From<cpal::PauseStreamError> for SstvError {
    fn from(e: cpal::PauseStreamError) -> Self {
        SstvError::AudioDevice(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SstvError>;
