//! Incremental audio mixing core.
//!
//! `premix` combines many simultaneously scheduled sample playbacks into a
//! single stereo 16-bit stream, remixing as little as possible when the
//! schedule changes: callers can ask for small slices of output at arbitrary
//! offsets into the near future while continuously adding playbacks, and the
//! engine only pays a re-mix cost when playbacks are *ended* early.
//!
//! Three layers, leaves first:
//!
//! - [`synth`] renders ADSR-enveloped, shape-morphing tones into mono float
//!   buffers that work as playback sources.
//! - [`mix::Mixer`] owns the active-playback table and a ring of pre-mixed
//!   stereo audio indexed by global sample time.
//! - [`engine::Engine`] pumps a `Mixer` into an [`io::AudioSink`], tracking
//!   the sink's play/write cursors.

pub mod engine;
pub mod io;
pub mod mix;
pub mod synth;

/// Global sample time: one tick per output frame at [`OUTPUT_RATE`].
pub type Tick = u64;

/// Fixed output sample rate for the mix core, in frames per second.
pub const OUTPUT_RATE: u32 = 44_100;

pub use engine::Engine;
pub use io::{AudioSink, CpalSink, SinkError};
pub use mix::{Channels, Fade, GroupId, Mixer, Playback, Source};
pub use synth::{synth, synth_add, Adsr, Waveform};
