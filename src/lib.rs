//! Real-time SSTV transceiver core: encode an image to phase-continuous FM
//! audio, run it through a live-tunable effects pipeline, play it through
//! an output device, and decode it back to pixels as it plays.
//!
//! See [`orchestrator`] for the three entry points most callers want:
//! [`orchestrator::encode_only`], [`orchestrator::decode_only`], and
//! [`orchestrator::transmit`].

pub mod config;
pub mod decoder;
pub mod effects;
pub mod encoder;
pub mod error;
pub mod image_fit;
pub mod modes;
pub mod orchestrator;
pub mod pipeline;
pub mod player;
pub mod wav;

pub use error::{Result, SstvError};
