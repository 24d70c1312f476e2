//! Audio output capability.
//!
//! [`AudioSink`] is the contract [`Engine`](crate::engine::Engine) drives:
//! a looping stereo 16-bit ring the sink plays continuously, with a play
//! cursor (what the hardware is reading) and a write cursor (the earliest
//! position it is safe to write). [`CpalSink`] implements it on top of a
//! cpal output stream.

mod sink;

pub use sink::CpalSink;

use thiserror::Error;

/// Failures acquiring or driving an audio sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no default audio output device")]
    NoDevice,
    #[error("sink not started")]
    NotStarted,
    #[error("unsupported output configuration: {0}")]
    UnsupportedConfig(String),
    #[error("output stream error: {0}")]
    Stream(String),
}

/// A looping stereo 16-bit PCM ring with play/write cursors.
///
/// The sink starts playback at `start` and never stops it until dropped;
/// writes land at absolute byte offsets into the ring, wrapping internally.
/// A frame is 4 bytes (two little-endian i16 channels).
pub trait AudioSink {
    /// Open the device and start looping playback over a silent ring of
    /// `buffer_bytes` bytes.
    fn start(&mut self, sample_rate: u32, buffer_bytes: usize) -> Result<(), SinkError>;

    /// Current `(play, write)` cursors, both in bytes within
    /// `[0, buffer_bytes)`. The write cursor leads the play cursor by the
    /// device's safety margin.
    fn cursors(&mut self) -> Result<(usize, usize), SinkError>;

    /// Copy `data` (interleaved stereo i16) into the ring at
    /// `offset_bytes`, wrapping as needed. Implementations recover from a
    /// transient loss of the buffer by retrying once.
    fn write(&mut self, offset_bytes: usize, data: &[i16]) -> Result<(), SinkError>;
}
