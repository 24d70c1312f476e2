//! The orchestrator that pumps a [`Mixer`] into an [`AudioSink`].
//!
//! [`Engine`] owns both: per step it reads the sink's cursors to find out
//! how much time has passed, advances the mixer's clock, extracts freshly
//! pre-mixed audio into a staging buffer, and writes it into the sink's
//! ring just ahead of the write cursor.

use crate::io::{AudioSink, SinkError};
use crate::mix::Mixer;
use crate::{Tick, OUTPUT_RATE};

/// Requests above this many frames get a short pre-step first, so fresh
/// audio reaches the sink before the long mix runs.
const PRESTEP_THRESHOLD: usize = 1200;
const PRESTEP_FRAMES: usize = 800;

/// Drives a [`Mixer`] against an audio sink.
///
/// A process is expected to run at most one `Engine` at a time; this is a
/// contract, not something the type enforces.
pub struct Engine<'a, S: AudioSink> {
    mixer: Mixer<'a>,
    sink: S,
    /// Engine clock in global ticks; tracks the sink's write cursor.
    time: Tick,
    /// Write cursor position at the previous step, in frames.
    prev_write: usize,
    /// Extra margin ahead of the sink's write cursor, in frames.
    write_offset: usize,
    /// Sink ring length in frames.
    ring_frames: usize,
    /// Staging buffer for the largest single extract.
    staging: Vec<i16>,
}

impl<'a, S: AudioSink> Engine<'a, S> {
    /// Start `sink` over a ring of `buffer_bytes` bytes and prime the first
    /// `time_offset` seconds of headroom past the write cursor.
    ///
    /// `premix_capacity` bounds both the mixer's look-ahead and the largest
    /// single `step`.
    pub fn new(
        premix_capacity: usize,
        time_offset: f32,
        buffer_bytes: usize,
        mut sink: S,
    ) -> Result<Self, SinkError> {
        sink.start(OUTPUT_RATE, buffer_bytes)?;
        let (_, write) = sink.cursors()?;
        let mut engine = Engine {
            mixer: Mixer::new(premix_capacity),
            sink,
            time: 0,
            prev_write: write / 4,
            write_offset: (time_offset * OUTPUT_RATE as f32) as usize,
            ring_frames: buffer_bytes / 4,
            staging: vec![0; premix_capacity * 2],
        };
        engine.step(1)?;
        Ok(engine)
    }

    /// Engine clock, in global ticks.
    pub fn time(&self) -> Tick {
        self.time
    }

    /// The driven mixer, for scheduling playbacks.
    pub fn mixer(&self) -> &Mixer<'a> {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer<'a> {
        &mut self.mixer
    }

    /// The driven sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Advance the clock by however far the sink has played since the last
    /// step, then mix up to `frames` new frames and hand them to the sink.
    /// Returns the engine time after the step.
    ///
    /// Failures reading or writing the sink propagate without corrupting
    /// the clock; the next successful step picks up where this one left
    /// off.
    pub fn step(&mut self, frames: usize) -> Result<Tick, SinkError> {
        if frames > PRESTEP_THRESHOLD {
            self.step_raw(PRESTEP_FRAMES)?;
        }
        self.step_raw(frames)
    }

    fn step_raw(&mut self, frames: usize) -> Result<Tick, SinkError> {
        let (play, write) = self.cursor_frames()?;

        // How much sound time passed since we last looked.
        let advance = self.distance(self.prev_write, write);
        self.time += advance as u64;
        self.mixer.advance_to(self.time);
        self.prev_write = write;

        // Room between our write position and the play cursor coming around.
        let available = self
            .distance(write, play)
            .saturating_sub(self.write_offset);
        let frames = frames.min(available);

        let len = self.mixer.mix(&mut self.staging, self.time, frames);

        // The cursors kept moving while we mixed; whatever they passed is
        // too late to write.
        let (_, write) = self.cursor_frames()?;
        let stale = self.distance(self.prev_write, write);
        if stale < len {
            let dest = (write + self.write_offset + stale) % self.ring_frames;
            self.sink
                .write(dest * 4, &self.staging[stale * 2..len * 2])?;
        }

        Ok(self.time)
    }

    fn cursor_frames(&mut self) -> Result<(usize, usize), SinkError> {
        let (play, write) = self.sink.cursors()?;
        debug_assert!(write / 4 < self.ring_frames);
        Ok((play / 4, write / 4))
    }

    /// Ring distance travelled going forward from `early` to `late`.
    fn distance(&self, early: usize, late: usize) -> usize {
        if early > late {
            late + self.ring_frames - early
        } else {
            late - early
        }
    }
}
