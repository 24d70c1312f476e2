//! cpal-backed [`AudioSink`] implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::warn;

use super::{AudioSink, SinkError};

/// State shared with the stream callback.
struct Shared {
    /// Interleaved stereo i16 ring. The callback replays it in a loop
    /// without consuming; stale audio keeps playing until overwritten.
    ring: Mutex<Vec<i16>>,
    /// Play cursor in frames.
    play_frame: AtomicUsize,
}

impl Shared {
    /// Lock the ring, shrugging off poisoning once (a panicking callback
    /// thread must not wedge the mixer).
    fn ring(&self) -> MutexGuard<'_, Vec<i16>> {
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An [`AudioSink`] over the default cpal output device.
///
/// Emulates a hardware looping buffer: the output callback reads the shared
/// ring at the play cursor, and the reported write cursor leads the play
/// cursor by a fixed safety margin (default 10 ms).
pub struct CpalSink {
    shared: Option<Arc<Shared>>,
    /// Held only to keep the output stream alive; dropping it stops playback.
    _stream: Option<cpal::Stream>,
    ring_frames: usize,
    buffer_bytes: usize,
    write_lead_frames: usize,
    /// Override for the default 10 ms write-cursor lead, in frames.
    lead_override: Option<usize>,
}

impl CpalSink {
    pub fn new() -> Self {
        CpalSink {
            shared: None,
            _stream: None,
            ring_frames: 0,
            buffer_bytes: 0,
            write_lead_frames: 0,
            lead_override: None,
        }
    }

    /// Set the write-cursor lead ahead of the play cursor, in frames.
    pub fn with_write_lead(mut self, frames: usize) -> Self {
        self.lead_override = Some(frames);
        self
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CpalSink {
    fn start(&mut self, sample_rate: u32, buffer_bytes: usize) -> Result<(), SinkError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(SinkError::NoDevice)?;

        let ring_frames = buffer_bytes / 4;
        let shared = Arc::new(Shared {
            ring: Mutex::new(vec![0i16; ring_frames * 2]),
            play_frame: AtomicUsize::new(0),
        });

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let cb_shared = Arc::clone(&shared);
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let ring = cb_shared.ring();
                    let frames = out.len() / 2;
                    let mut pos = cb_shared.play_frame.load(Ordering::Relaxed);
                    for f in 0..frames {
                        out[f * 2] = ring[pos * 2] as f32 / 32768.0;
                        out[f * 2 + 1] = ring[pos * 2 + 1] as f32 / 32768.0;
                        pos += 1;
                        if pos == ring_frames {
                            pos = 0;
                        }
                    }
                    cb_shared.play_frame.store(pos, Ordering::Relaxed);
                },
                |err| warn!("output stream error: {err}"),
                None,
            )
            .map_err(|e| SinkError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| SinkError::Stream(e.to_string()))?;

        self.write_lead_frames = self
            .lead_override
            .unwrap_or((sample_rate / 100) as usize)
            .min(ring_frames.saturating_sub(1));
        self.ring_frames = ring_frames;
        self.buffer_bytes = ring_frames * 4;
        self.shared = Some(shared);
        self._stream = Some(stream);
        Ok(())
    }

    fn cursors(&mut self) -> Result<(usize, usize), SinkError> {
        let shared = self.shared.as_ref().ok_or(SinkError::NotStarted)?;
        let play = shared.play_frame.load(Ordering::Relaxed);
        let write = (play + self.write_lead_frames) % self.ring_frames;
        Ok((play * 4, write * 4))
    }

    fn write(&mut self, offset_bytes: usize, data: &[i16]) -> Result<(), SinkError> {
        let shared = self.shared.as_ref().ok_or(SinkError::NotStarted)?;
        debug_assert!(offset_bytes <= self.buffer_bytes);
        debug_assert_eq!(offset_bytes % 4, 0);
        if data.is_empty() {
            return Ok(());
        }
        let mut ring = shared.ring();
        let total = ring.len();
        let start = (offset_bytes / 2) % total;
        let head = (total - start).min(data.len());
        ring[start..start + head].copy_from_slice(&data[..head]);
        if head < data.len() {
            let tail = data.len() - head;
            ring[..tail].copy_from_slice(&data[head..]);
        }
        Ok(())
    }
}
