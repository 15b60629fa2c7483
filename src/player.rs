//! Real-Time Audio Player (C6): opens a cpal output stream, feeds it
//! pre-encoded SSTV audio through the live effects pipeline, and mirrors the
//! post-effect samples into a shared ring buffer the decoder thread reads.
//!
//! Grounded on the teacher's `examples/beep.rs`/`examples/live_adsr.rs`
//! device-selection and `build_output_stream` pattern, generalized from a
//! synth source to a pre-encoded buffer and extended with the ring buffer
//! and parameter channel this spec requires.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::effects::EffectParams;
use crate::error::{Result, SstvError};
use crate::pipeline::{ParamSender, Pipeline};

/// Events the callback thread reports back to the control thread. Sent
/// with `try_send` so a full queue never blocks the audio callback.
#[derive(Debug, Clone)]
pub enum PlayerStatus {
    Progress { frames_played: u64 },
    Finished,
    Error(String),
}

/// Ring buffer written by the audio callback and read by the decoder.
/// `cursor` is the processed cursor (§3): the total number of samples
/// ever written, used by a reader to detect how much new data is
/// available without holding the lock.
pub struct RingBuffer {
    data: Mutex<VecDeque<f32>>,
    cursor: AtomicU64,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(VecDeque::with_capacity(capacity)),
            cursor: AtomicU64::new(0),
            capacity,
        }
    }

    pub(crate) fn push_slice(&self, samples: &[f32]) {
        let mut data = self.data.lock().expect("ring buffer mutex poisoned");
        for &s in samples {
            if data.len() >= self.capacity {
                data.pop_front();
            }
            data.push_back(s);
        }
        drop(data);
        self.cursor.fetch_add(samples.len() as u64, Ordering::Release);
    }

    /// Total samples ever written. Monotonic; never decreases.
    pub fn processed_cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Copies everything currently held into `out`, oldest first.
    pub fn copy_latest(&self, out: &mut Vec<f32>) {
        let data = self.data.lock().expect("ring buffer mutex poisoned");
        out.clear();
        out.extend(data.iter().copied());
    }
}

/// Owns the open cpal stream and the handles the control thread uses to
/// drive it. Dropping the player stops playback and closes the stream.
pub struct Player {
    stream: cpal::Stream,
    param_sender: ParamSender,
    ring: Arc<RingBuffer>,
    status_rx: Receiver<PlayerStatus>,
}

impl Player {
    /// Opens the default output device at `sample_rate` and starts playing
    /// `audio` immediately, applying live effects as it goes. Returns the
    /// player and a shared ring buffer the decoder can be pointed at.
    pub fn start(
        audio: Arc<Vec<f32>>,
        sample_rate: u32,
        ring_capacity: usize,
        initial_params: EffectParams,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SstvError::AudioDevice("no default output device".into()))?;
        let supported = device.default_output_config()?;
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: supported.config().buffer_size,
        };

        let (mut pipeline, param_sender) = Pipeline::new(sample_rate);
        pipeline.seed_params(initial_params);
        let ring = Arc::new(RingBuffer::new(ring_capacity));
        let ring_cb = ring.clone();
        let (status_tx, status_rx): (Sender<PlayerStatus>, Receiver<PlayerStatus>) =
            crossbeam_channel::bounded(64);

        let mut read_pos = 0usize;
        let err_tx = status_tx.clone();
        let err_fn = move |err| {
            let _ = err_tx.try_send(PlayerStatus::Error(err.to_string()));
        };

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let available = audio.len().saturating_sub(read_pos);
                let take = available.min(data.len());
                data[..take].copy_from_slice(&audio[read_pos..read_pos + take]);
                for sample in data[take..].iter_mut() {
                    *sample = 0.0;
                }
                read_pos += take;

                pipeline.process_chunk(data);
                ring_cb.push_slice(data);

                let _ = status_tx.try_send(PlayerStatus::Progress {
                    frames_played: read_pos as u64,
                });
                if take < data.len() {
                    let _ = status_tx.try_send(PlayerStatus::Finished);
                }
            },
            err_fn,
            None,
        )?;
        stream.play()?;

        Ok(Self {
            stream,
            param_sender,
            ring,
            status_rx,
        })
    }

    pub fn pause(&self) -> Result<()> {
        self.stream.pause()?;
        tracing::info!("playback paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        self.stream.play()?;
        tracing::info!("playback resumed");
        Ok(())
    }

    /// Stops playback and releases the output device.
    pub fn stop(self) {
        tracing::info!("playback stopped");
        drop(self);
    }

    pub fn param_sender(&self) -> ParamSender {
        self.param_sender.clone()
    }

    pub fn ring(&self) -> Arc<RingBuffer> {
        self.ring.clone()
    }

    pub fn status(&self) -> &Receiver<PlayerStatus> {
        &self.status_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_tracks_processed_cursor() {
        let ring = RingBuffer::new(16);
        ring.push_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(ring.processed_cursor(), 3);
        let mut out = Vec::new();
        ring.copy_latest(&mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn ring_buffer_drops_oldest_past_capacity() {
        let ring = RingBuffer::new(4);
        ring.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(ring.processed_cursor(), 6);
        let mut out = Vec::new();
        ring.copy_latest(&mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn processed_cursor_never_decreases_across_pushes() {
        let ring = RingBuffer::new(8);
        let mut last = 0u64;
        for batch in [&[1.0, 2.0][..], &[][..], &[3.0][..], &[4.0, 5.0, 6.0][..]] {
            ring.push_slice(batch);
            let cursor = ring.processed_cursor();
            assert!(cursor >= last);
            last = cursor;
        }
    }

    #[test]
    fn a_reader_never_sees_more_samples_held_than_the_processed_cursor() {
        let ring = RingBuffer::new(100);
        ring.push_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut out = Vec::new();
        ring.copy_latest(&mut out);
        assert!(out.len() as u64 <= ring.processed_cursor());
    }
}
